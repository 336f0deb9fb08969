//! Model and schema traits.
//!
//! A [`Model`] is any serde-serialisable struct that should live inside a
//! [`Record`]. Exposing a model over HTTP additionally requires three schema
//! types, tied together by [`Schemas`]:
//!
//! | Schema | Purpose |
//! |--------|---------|
//! | [`Schemas::Create`] | request body of `POST`, turned into a new model |
//! | [`Schemas::Put`] | request body of `PUT`, applied onto an existing model |
//! | [`Schemas::Response`] | what `GET` and `POST` return |

use serde::{Serialize, de::DeserializeOwned};

use crate::record::Record;

/// A persistable model.
///
/// The model must serialise to a JSON object; its keys are the field names
/// accepted by store lookups and batch updates.
pub trait Model: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
  /// Storage table name. Must be a plain identifier (`[A-Za-z_][A-Za-z0-9_]*`).
  const TABLE: &'static str;

  /// Fields whose values must be unique across every record of the model,
  /// deleted records included.
  const UNIQUE_FIELDS: &'static [&'static str] = &[];

  /// Called when the record is soft-deleted, before it is saved.
  fn on_soft_delete(&mut self) {}
}

/// Body of a create request.
pub trait CreateSchema<M>: DeserializeOwned + Send + 'static {
  fn validate(&self) -> Result<(), String> { Ok(()) }

  fn into_model(self) -> M;
}

/// Body of an update request.
pub trait UpdateSchema<M>: DeserializeOwned + Send + 'static {
  fn validate(&self) -> Result<(), String> { Ok(()) }

  fn apply(self, model: &mut M);
}

/// Serialised view of a record.
pub trait ResponseSchema<M>: Serialize + Send + 'static {
  fn from_record(record: &Record<M>) -> Self;
}

/// The three schemas a model needs to be served by the CRUD controller.
pub trait Schemas: Model {
  type Create: CreateSchema<Self>;
  type Put: UpdateSchema<Self>;
  type Response: ResponseSchema<Self>;
}

/// Whether `s` can be used verbatim as a table or field name.
pub fn is_identifier(s: &str) -> bool {
  let mut chars = s.chars();
  match chars.next() {
    Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
    _ => return false,
  }
  chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
  use super::is_identifier;

  #[test]
  fn identifiers() {
    assert!(is_identifier("widgets"));
    assert!(is_identifier("_private_2"));
    assert!(!is_identifier(""));
    assert!(!is_identifier("2fast"));
    assert!(!is_identifier("drop table"));
    assert!(!is_identifier("name'--"));
  }
}
