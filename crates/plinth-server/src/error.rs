//! Error types and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Missing or rejected credentials. Carries the realm for the challenge.
  #[error("unauthorized")]
  Unauthorized { realm: String },
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized { realm } => {
        let mut res =
          (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response();
        let challenge = HeaderValue::from_str(&format!("Basic realm=\"{realm}\""))
          .unwrap_or_else(|_| HeaderValue::from_static("Basic"));
        res.headers_mut().insert(header::WWW_AUTHENTICATE, challenge);
        res
      }
      Error::Store(e) => {
        tracing::error!(error = %e, "store failure during authentication");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() })))
          .into_response()
      }
    }
  }
}
