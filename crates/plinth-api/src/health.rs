//! Unauthenticated health probes.

use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

pub async fn healthy() -> Json<Value> { Json(json!({ "status": "healthy" })) }

/// `GET {prefix}` and `GET {prefix}/health_check/`.
pub fn routes(prefix: &str) -> Router {
  let prefix = prefix.trim_end_matches('/');
  let root = if prefix.is_empty() { "/" } else { prefix };
  Router::new()
    .route(root, get(healthy))
    .route(&format!("{prefix}/health_check/"), get(healthy))
}
