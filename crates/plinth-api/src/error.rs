//! API error types and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use plinth_core::{Classify, ErrorKind};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Translate a store error by its [`ErrorKind`]. Anything unclassified
  /// becomes a 500.
  pub fn from_store<E>(e: E) -> Self
  where
    E: std::error::Error + Classify + Send + Sync + 'static,
  {
    match e.kind() {
      ErrorKind::NotFound => ApiError::NotFound(e.to_string()),
      ErrorKind::UniqueViolation | ErrorKind::Validation => ApiError::BadRequest(e.to_string()),
      ErrorKind::Other => ApiError::Store(Box::new(e)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_owned()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

/// A controller that cannot be mounted. Raised at startup, never per request.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("controller name must not be empty")]
  EmptyName,

  #[error("invalid controller prefix {prefix:?}: {reason}")]
  InvalidPrefix { prefix: String, reason: &'static str },

  #[error("prefix {0:?} is already mounted")]
  DuplicatePrefix(String),

  #[error("cannot prepare storage for {name}: {source}")]
  Store {
    name:   String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}
