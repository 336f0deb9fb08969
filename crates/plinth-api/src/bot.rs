//! Handlers for the bot endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `{prefix}/bot/` | Health probe |
//! | `POST` | `{prefix}/bot/conversation` | `?user_id=..&conversation_id=..` |
//!
//! These routes do not require authentication.

use std::sync::Arc;

use axum::{
  Json, Router,
  extract::{Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::{get, post},
};
use plinth_core::conversation::ConversationLog;
use serde::Deserialize;
use serde_json::json;

use crate::health::healthy;

/// Build the bot routes under `prefix` (e.g. `/api`).
pub fn routes<L>(prefix: &str, log: Arc<L>) -> Router
where
  L: ConversationLog + 'static,
{
  let prefix = prefix.trim_end_matches('/');
  Router::new()
    .route(&format!("{prefix}/bot/"), get(healthy))
    .route(&format!("{prefix}/bot/conversation"), post(create_conversation::<L>))
    .with_state(log)
}

#[derive(Debug, Deserialize)]
pub struct ConversationParams {
  pub user_id:         String,
  pub conversation_id: String,
}

/// `POST /bot/conversation?user_id=..&conversation_id=..`
pub async fn create_conversation<L>(
  State(log): State<Arc<L>>,
  Query(params): Query<ConversationParams>,
) -> Response
where
  L: ConversationLog,
{
  match log
    .record_conversation(params.user_id, params.conversation_id)
    .await
  {
    Ok(conversation) => Json(conversation).into_response(),
    Err(e) => {
      tracing::error!(error = %e, "failed to record conversation");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "status": "error", "message": e.to_string() })),
      )
        .into_response()
    }
  }
}
