//! JSON REST API for Plinth.
//!
//! The centrepiece is the generic CRUD controller: given a model implementing
//! [`plinth_core::Schemas`] and a [`ControllerConfig`], [`ControllerSet`]
//! mounts create/list/get/update/delete endpoints backed by any
//! [`plinth_core::RecordStore`].
//!
//! Authentication is the caller's responsibility: the hosting server must
//! place the authenticated [`plinth_core::Principal`] in the request
//! extensions. See [`Caller`].
//!
//! # Mounting
//!
//! ```rust,ignore
//! let api = ControllerSet::new(store.clone())
//!   .mount::<Widget>(ControllerConfig::new("Widget", "/api/widget"))
//!   .await?
//!   .into_router();
//! ```

pub mod bot;
pub mod caller;
pub mod controller;
pub mod controllers;
pub mod error;
pub mod health;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use caller::Caller;
pub use controller::{ControllerConfig, Success};
pub use controllers::ControllerSet;
pub use error::{ApiError, ConfigError};
