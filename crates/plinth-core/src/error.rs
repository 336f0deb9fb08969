//! Error types for `plinth-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{table} record not found: {id}")]
  NotFound { table: &'static str, id: Uuid },

  #[error("unique constraint violated: {0}")]
  UniqueViolation(String),

  #[error("validation error: {0}")]
  Validation(String),

  #[error("invalid identifier: {0}")]
  InvalidId(#[from] uuid::Error),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The coarse failure classes a caller of a [`RecordStore`] needs to tell
/// apart. Everything a backend cannot place in one of the first three is
/// [`ErrorKind::Other`].
///
/// [`RecordStore`]: crate::store::RecordStore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  UniqueViolation,
  Validation,
  Other,
}

/// Implemented by every error type a store can return.
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Error::NotFound { .. } => ErrorKind::NotFound,
      Error::UniqueViolation(_) => ErrorKind::UniqueViolation,
      Error::Validation(_) | Error::InvalidId(_) => ErrorKind::Validation,
      Error::Serialization(_) => ErrorKind::Other,
    }
  }
}
