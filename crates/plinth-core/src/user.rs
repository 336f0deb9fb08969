//! The user model.
//!
//! Users are ordinary records: they carry the same audit envelope and are
//! soft-deleted like everything else. Deleting a user also deactivates it.

use serde::{Deserialize, Serialize};

use crate::{
  model::Model,
  record::{Principal, Record, UserId},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  /// Login identifier; unique across all users.
  pub email:         String,
  #[serde(default)]
  pub name:          String,
  /// Argon2 PHC string.
  pub password_hash: String,
  pub is_active:     bool,
  #[serde(default)]
  pub is_staff:      bool,
  #[serde(default)]
  pub is_superuser:  bool,
}

impl Model for User {
  const TABLE: &'static str = "users";
  const UNIQUE_FIELDS: &'static [&'static str] = &["email"];

  fn on_soft_delete(&mut self) { self.is_active = false; }
}

impl Principal {
  pub fn from_user(record: &Record<User>) -> Self {
    Self {
      id:        UserId(record.id),
      tenant_id: record.tenant_id,
      email:     record.data.email.clone(),
    }
  }
}

/// Lower-case the domain part of an e-mail address and trim whitespace.
/// The local part is left alone.
pub fn normalize_email(email: &str) -> String {
  let email = email.trim();
  match email.rsplit_once('@') {
    Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
    None => email.to_owned(),
  }
}
