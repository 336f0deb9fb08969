//! Startup-time assembly of CRUD controllers into one router.

use std::sync::Arc;

use axum::Router;
use plinth_core::{RecordStore, Schemas};

use crate::{ConfigError, controller::{ControllerConfig, routes}};

/// The controllers an application serves, collected at startup.
///
/// Mounting validates the configuration and prepares the model's storage, so
/// every misconfiguration surfaces before the server accepts a request.
pub struct ControllerSet<S> {
  store:   Arc<S>,
  mounted: Vec<ControllerConfig>,
  router:  Router,
}

impl<S> ControllerSet<S>
where
  S: RecordStore + 'static,
{
  pub fn new(store: Arc<S>) -> Self {
    Self { store, mounted: Vec::new(), router: Router::new() }
  }

  /// Serve `M` under `config.prefix`.
  pub async fn mount<M: Schemas>(mut self, config: ControllerConfig) -> Result<Self, ConfigError> {
    config.validate()?;
    if self.mounted.iter().any(|c| c.prefix == config.prefix) {
      return Err(ConfigError::DuplicatePrefix(config.prefix));
    }

    self.store.ensure_model::<M>().await.map_err(|e| ConfigError::Store {
      name:   config.name.clone(),
      source: Box::new(e),
    })?;

    tracing::info!(
      name = %config.name,
      prefix = %config.prefix,
      table = M::TABLE,
      "mounted CRUD controller"
    );
    self.router = self.router.merge(routes::<S, M>(self.store.clone(), &config));
    self.mounted.push(config);
    Ok(self)
  }

  /// The configurations mounted so far, in mount order.
  pub fn mounted(&self) -> &[ControllerConfig] { &self.mounted }

  pub fn into_router(self) -> Router { self.router }
}
