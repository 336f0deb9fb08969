//! The generic CRUD controller.
//!
//! | Method   | Path            | Success | Failure |
//! |----------|-----------------|---------|---------|
//! | `POST`   | `{prefix}`      | 200 + created record | 400 on invalid body or unique clash |
//! | `GET`    | `{prefix}`      | 200 + records created by the caller | |
//! | `GET`    | `{prefix}/{id}` | 200 + record | 404 absent or deleted, 403 other tenant |
//! | `PUT`    | `{prefix}/{id}` | 200 + `{"msg":"success"}` | 400 / 404 / 403 |
//! | `DELETE` | `{prefix}/{id}` | 200 + `{"msg":"success"}` (soft delete) | 404 / 403 |
//!
//! Every route requires a [`Caller`]. Listing is scoped to the caller as
//! creator, while single-record routes are scoped to the caller's tenant.

use std::sync::Arc;

use axum::{
  Json, Router,
  extract::{
    Path, State,
    rejection::{JsonRejection, PathRejection},
  },
  routing::get,
};
use plinth_core::{
  Actor, Classify, CreateSchema, ErrorKind, Principal, Record, RecordQuery, RecordStore,
  ResponseSchema, Schemas, UpdateSchema,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{Caller, error::{ApiError, ConfigError}};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Where and under which name a model is served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
  /// Human-readable entity name, used in messages and logs.
  pub name:   String,
  /// Absolute route prefix, e.g. `/api/widget`.
  pub prefix: String,
}

impl ControllerConfig {
  pub fn new(name: impl Into<String>, prefix: impl Into<String>) -> Self {
    Self { name: name.into(), prefix: prefix.into() }
  }

  /// Reject configurations the router could not serve.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.name.trim().is_empty() {
      return Err(ConfigError::EmptyName);
    }
    let invalid = |reason| ConfigError::InvalidPrefix { prefix: self.prefix.clone(), reason };
    if !self.prefix.starts_with('/') {
      return Err(invalid("must start with '/'"));
    }
    if self.prefix.len() > 1 && self.prefix.ends_with('/') {
      return Err(invalid("must not end with '/'"));
    }
    if self.prefix.contains(['{', '}', '*']) {
      return Err(invalid("must not contain route parameters"));
    }
    Ok(())
  }

  fn item_path(&self) -> String { format!("{}/{{id}}", self.prefix.trim_end_matches('/')) }
}

/// Generic success marker returned by update and delete.
#[derive(Debug, Clone, Serialize)]
pub struct Success {
  pub msg: &'static str,
}

impl Default for Success {
  fn default() -> Self { Self { msg: "success" } }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Shared state of one mounted controller.
pub struct CrudState<S> {
  pub store: Arc<S>,
  pub name:  Arc<str>,
}

impl<S> Clone for CrudState<S> {
  fn clone(&self) -> Self { Self { store: self.store.clone(), name: self.name.clone() } }
}

/// Build the five routes for `M`. `config` must already be validated.
pub(crate) fn routes<S, M>(store: Arc<S>, config: &ControllerConfig) -> Router
where
  S: RecordStore + 'static,
  M: Schemas,
{
  let state = CrudState { store, name: Arc::from(config.name.as_str()) };

  Router::new()
    .route(&config.prefix, get(list::<S, M>).post(create::<S, M>))
    .route(
      &config.item_path(),
      get(get_one::<S, M>).put(update::<S, M>).delete(delete_one::<S, M>),
    )
    .with_state(state)
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn bad_body(e: JsonRejection) -> ApiError { ApiError::BadRequest(e.body_text()) }

fn bad_path(e: PathRejection) -> ApiError { ApiError::BadRequest(e.body_text()) }

/// Map a failed write, naming the entity on a uniqueness clash.
fn write_error<E>(name: &str, e: E) -> ApiError
where
  E: std::error::Error + Classify + Send + Sync + 'static,
{
  if e.kind() == ErrorKind::UniqueViolation {
    tracing::debug!(entity = name, error = %e, "unique constraint rejected write");
    ApiError::BadRequest(format!("{name} already exists"))
  } else {
    ApiError::from_store(e)
  }
}

async fn fetch<S, M>(state: &CrudState<S>, id: Uuid) -> Result<Record<M>, ApiError>
where
  S: RecordStore,
  M: Schemas,
{
  state.store.get::<M>(id).await.map_err(|e| match e.kind() {
    ErrorKind::NotFound => ApiError::NotFound(format!("{} {id} not found", state.name)),
    _ => ApiError::from_store(e),
  })
}

/// Single-record access is limited to the record's tenant.
fn authorize<M>(record: &Record<M>, caller: &Principal, action: &str) -> Result<(), ApiError> {
  if record.tenant_id != caller.tenant_id {
    return Err(ApiError::Forbidden(format!(
      "You don't have permission to {action} this object."
    )));
  }
  Ok(())
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST {prefix}`
pub async fn create<S, M>(
  State(state): State<CrudState<S>>,
  Caller(caller): Caller,
  body: Result<Json<M::Create>, JsonRejection>,
) -> Result<Json<M::Response>, ApiError>
where
  S: RecordStore,
  M: Schemas,
{
  let Json(body) = body.map_err(bad_body)?;
  body.validate().map_err(ApiError::BadRequest)?;

  let mut record = Record::new(body.into_model()).with_tenant(caller.tenant_id);
  state
    .store
    .save(&mut record, Actor::from(&caller))
    .await
    .map_err(|e| write_error(&state.name, e))?;

  tracing::info!(entity = %state.name, id = %record.id, user = %caller.id, "record created");
  Ok(Json(M::Response::from_record(&record)))
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET {prefix}` — every live record the caller created.
pub async fn list<S, M>(
  State(state): State<CrudState<S>>,
  Caller(caller): Caller,
) -> Result<Json<Vec<M::Response>>, ApiError>
where
  S: RecordStore,
  M: Schemas,
{
  let query = RecordQuery::new().created_by(caller.id);
  let records = state
    .store
    .list::<M>(&query)
    .await
    .map_err(ApiError::from_store)?;

  Ok(Json(records.iter().map(M::Response::from_record).collect()))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET {prefix}/{id}`
pub async fn get_one<S, M>(
  State(state): State<CrudState<S>>,
  Caller(caller): Caller,
  path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<M::Response>, ApiError>
where
  S: RecordStore,
  M: Schemas,
{
  let Path(id) = path.map_err(bad_path)?;
  let record = fetch::<S, M>(&state, id).await?;
  authorize(&record, &caller, "get")?;

  Ok(Json(M::Response::from_record(&record)))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PUT {prefix}/{id}`
pub async fn update<S, M>(
  State(state): State<CrudState<S>>,
  Caller(caller): Caller,
  path: Result<Path<Uuid>, PathRejection>,
  body: Result<Json<M::Put>, JsonRejection>,
) -> Result<Json<Success>, ApiError>
where
  S: RecordStore,
  M: Schemas,
{
  let Path(id) = path.map_err(bad_path)?;
  let Json(body) = body.map_err(bad_body)?;
  body.validate().map_err(ApiError::BadRequest)?;

  let mut record = fetch::<S, M>(&state, id).await?;
  authorize(&record, &caller, "update")?;

  body.apply(&mut record.data);
  state
    .store
    .save(&mut record, Actor::from(&caller))
    .await
    .map_err(|e| write_error(&state.name, e))?;

  tracing::debug!(entity = %state.name, %id, user = %caller.id, "record updated");
  Ok(Json(Success::default()))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE {prefix}/{id}` — soft delete.
pub async fn delete_one<S, M>(
  State(state): State<CrudState<S>>,
  Caller(caller): Caller,
  path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Success>, ApiError>
where
  S: RecordStore,
  M: Schemas,
{
  let Path(id) = path.map_err(bad_path)?;
  let mut record = fetch::<S, M>(&state, id).await?;
  authorize(&record, &caller, "delete")?;

  state
    .store
    .delete(&mut record, Actor::from(&caller))
    .await
    .map_err(ApiError::from_store)?;

  tracing::info!(entity = %state.name, %id, user = %caller.id, "record deleted");
  Ok(Json(Success::default()))
}
