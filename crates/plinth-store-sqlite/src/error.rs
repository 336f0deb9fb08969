//! Error type for `plinth-store-sqlite`.

use plinth_core::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] plinth_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("{table} record not found: {id}")]
  NotFound { table: &'static str, id: uuid::Uuid },

  #[error("{table}: unique constraint violated ({detail})")]
  UniqueViolation { table: &'static str, detail: String },

  #[error("invalid {what}: {name:?}")]
  InvalidName { what: &'static str, name: String },

  #[error("{table} has no field {field:?}")]
  UnknownField { table: &'static str, field: String },

  #[error("unsupported filter value for {field:?}: {reason}")]
  UnsupportedFilter { field: String, reason: &'static str },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Error::Core(e) => e.kind(),
      Error::NotFound { .. } => ErrorKind::NotFound,
      Error::UniqueViolation { .. } => ErrorKind::UniqueViolation,
      Error::InvalidName { .. }
      | Error::UnknownField { .. }
      | Error::UnsupportedFilter { .. } => ErrorKind::Validation,
      Error::Database(_) | Error::Json(_) | Error::Uuid(_) | Error::DateParse(_) => {
        ErrorKind::Other
      }
    }
  }
}

/// Re-tag unique and primary-key constraint failures so callers can tell
/// them apart from other database errors.
pub(crate) fn classify_write(table: &'static str, e: tokio_rusqlite::Error) -> Error {
  if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(failure, detail)) = &e
    && (failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
      || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
  {
    return Error::UniqueViolation {
      table,
      detail: detail.clone().unwrap_or_else(|| failure.to_string()),
    };
  }
  Error::Database(e)
}
