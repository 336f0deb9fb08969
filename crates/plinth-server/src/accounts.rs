//! Account provisioning.

use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use plinth_core::{
  Actor, Classify, ErrorKind, Record, RecordStore, TenantId,
  user::{User, normalize_email},
};
use rand_core::OsRng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccountError {
  #[error("users must have an email address")]
  EmptyEmail,
  #[error("a user with email {0:?} already exists")]
  AlreadyExists(String),
  #[error("argon2 error: {0}")]
  Hash(String),
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Produce an argon2 PHC string for `password` with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, AccountError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| AccountError::Hash(e.to_string()))
}

/// Create an active, unprivileged user.
pub async fn create_user<S: RecordStore>(
  store: &S,
  email: &str,
  password: &str,
  tenant_id: Option<TenantId>,
) -> Result<Record<User>, AccountError> {
  create_account(store, email, password, tenant_id, false).await
}

/// Create an active user with staff and superuser rights.
pub async fn create_superuser<S: RecordStore>(
  store: &S,
  email: &str,
  password: &str,
  tenant_id: Option<TenantId>,
) -> Result<Record<User>, AccountError> {
  create_account(store, email, password, tenant_id, true).await
}

async fn create_account<S: RecordStore>(
  store: &S,
  email: &str,
  password: &str,
  tenant_id: Option<TenantId>,
  superuser: bool,
) -> Result<Record<User>, AccountError> {
  let email = normalize_email(email);
  if email.is_empty() {
    return Err(AccountError::EmptyEmail);
  }

  let user = User {
    email:         email.clone(),
    name:          String::new(),
    password_hash: hash_password(password)?,
    is_active:     true,
    is_staff:      superuser,
    is_superuser:  superuser,
  };

  let mut record = Record::new(user).with_tenant(tenant_id);
  store.save(&mut record, Actor::None).await.map_err(|e| match e.kind() {
    ErrorKind::UniqueViolation => AccountError::AlreadyExists(email.clone()),
    _ => AccountError::Store(Box::new(e)),
  })?;

  tracing::info!(%email, id = %record.id, superuser, "created user");
  Ok(record)
}
