//! The authenticated-caller extractor.

use axum::{extract::FromRequestParts, http::request::Parts};
use plinth_core::Principal;

use crate::error::ApiError;

/// The principal the hosting server authenticated for this request.
///
/// Reads the [`Principal`] an authentication layer inserted into the request
/// extensions; rejects with 401 when there is none.
#[derive(Debug, Clone)]
pub struct Caller(pub Principal);

impl<S> FromRequestParts<S> for Caller
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<Principal>()
      .cloned()
      .map(Caller)
      .ok_or(ApiError::Unauthorized)
  }
}
