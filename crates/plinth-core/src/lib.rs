//! Core types and trait definitions for Plinth.
//!
//! Plinth persists arbitrary models inside an audit envelope with
//! soft-delete bookkeeping and tenant scoping. This crate is free of HTTP and
//! database dependencies; storage backends and the controller factory build
//! on the traits defined here.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
#![allow(async_fn_in_trait)]

pub mod conversation;
pub mod error;
pub mod model;
pub mod record;
pub mod store;
pub mod user;

pub use error::{Classify, Error, ErrorKind, Result};
pub use model::{CreateSchema, Model, ResponseSchema, Schemas, UpdateSchema};
pub use record::{Actor, Principal, Record, TenantId, UserId};
pub use store::{RecordQuery, RecordStore};
