//! HTTP Basic authentication against the `users` table.
//!
//! The middleware resolves `email:password` to an active user and places the
//! matching [`Principal`] in the request extensions, where
//! [`plinth_api::Caller`] picks it up.

use std::sync::LazyLock;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, header},
  middleware::Next,
  response::{IntoResponse, Response},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use plinth_core::{
  Principal, Record, RecordQuery, RecordStore,
  user::{User, normalize_email},
};

use crate::{AppState, accounts::hash_password, error::Error};

/// Hash verified when no usable account matches, so unknown and known
/// e-mails cost the same argon2 work.
static DUMMY_HASH: LazyLock<Option<String>> =
  LazyLock::new(|| hash_password("plinth-dummy-password").ok());

fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .map(|hash| Argon2::default().verify_password(password.as_bytes(), &hash).is_ok())
    .unwrap_or(false)
}

fn burn_verify(password: &str) {
  if let Some(dummy) = DUMMY_HASH.as_deref() {
    verify_password(password, dummy);
  }
}

/// Split a `Basic` authorization header into e-mail and password.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
  let header_val = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let encoded = header_val.strip_prefix("Basic ")?;

  let decoded = B64.decode(encoded.trim()).ok()?;
  let creds   = String::from_utf8(decoded).ok()?;
  let (email, password) = creds.split_once(':')?;
  Some((email.to_owned(), password.to_owned()))
}

/// Verify the request's credentials and return the caller they identify.
pub async fn authenticate<S>(headers: &HeaderMap, state: &AppState<S>) -> Result<Principal, Error>
where
  S: RecordStore,
{
  let unauthorized = || Error::Unauthorized { realm: state.config.realm.clone() };

  let (email, password) = basic_credentials(headers).ok_or_else(unauthorized)?;

  let query = RecordQuery::new().field("email", normalize_email(&email)).limit(1);
  let users: Vec<Record<User>> = state
    .store
    .list(&query)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  let Some(user) = users.into_iter().next() else {
    burn_verify(&password);
    tracing::debug!(%email, "authentication failed: unknown user");
    return Err(unauthorized());
  };
  if !user.data.is_active {
    burn_verify(&password);
    tracing::debug!(%email, "authentication failed: inactive user");
    return Err(unauthorized());
  }

  if !verify_password(&password, &user.data.password_hash) {
    return Err(unauthorized());
  }

  Ok(Principal::from_user(&user))
}

/// Middleware guarding the CRUD controllers.
pub async fn require_auth<S>(
  State(state): State<AppState<S>>,
  mut req: Request,
  next: Next,
) -> Response
where
  S: RecordStore + 'static,
{
  match authenticate(req.headers(), &state).await {
    Ok(principal) => {
      req.extensions_mut().insert(principal);
      next.run(req).await
    }
    Err(e) => e.into_response(),
  }
}
