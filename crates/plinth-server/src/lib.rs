//! HTTP server for Plinth.
//!
//! Wires the generic CRUD controllers, the bot and health routes, HTTP Basic
//! authentication and request logging into one axum [`Router`].

pub mod accounts;
pub mod auth;
pub mod error;
pub mod timing;
pub mod widget;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, middleware};
use plinth_api::{ConfigError, ControllerConfig, ControllerSet, bot, health};
use plinth_core::{RecordStore, conversation::ConversationLog, user::User};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use widget::Widget;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `PLINTH_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  /// Realm advertised in the `WWW-Authenticate` challenge.
  #[serde(default = "default_realm")]
  pub realm:      String,
  #[serde(default = "default_api_prefix")]
  pub api_prefix: String,
}

fn default_realm() -> String { "plinth".to_owned() }

fn default_api_prefix() -> String { "/api".to_owned() }

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through the middleware.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self { Self { store: self.store.clone(), config: self.config.clone() } }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the application router. Prepares storage for every served model, so
/// configuration errors surface here rather than on the first request.
pub async fn router<S>(state: AppState<S>) -> Result<Router, ConfigError>
where
  S: RecordStore + ConversationLog + 'static,
{
  let prefix = state.config.api_prefix.trim_end_matches('/').to_owned();

  state
    .store
    .ensure_model::<User>()
    .await
    .map_err(|e| ConfigError::Store { name: "User".to_owned(), source: Box::new(e) })?;

  let controllers = ControllerSet::new(state.store.clone())
    .mount::<Widget>(ControllerConfig::new("Widget", format!("{prefix}/widget")))
    .await?
    .into_router()
    .layer(middleware::from_fn_with_state(state.clone(), auth::require_auth::<S>));

  Ok(
    Router::new()
      .merge(controllers)
      .merge(health::routes(&prefix))
      .merge(bot::routes(&prefix, state.store.clone()))
      .layer(middleware::from_fn(timing::log_request))
      .layer(TraceLayer::new_for_http()),
  )
}

#[cfg(test)]
mod tests;
