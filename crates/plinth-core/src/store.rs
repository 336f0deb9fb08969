//! The `RecordStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `plinth-store-sqlite`).
//! It is the only path through which records are written, so the audit
//! stamping of [`Record`] happens here for single and batch writes alike.

use std::future::Future;

use serde_json::Value;
use uuid::Uuid;

use crate::{
  error::Classify,
  model::Model,
  record::{Actor, Record, TenantId, UserId},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`RecordStore::list`].
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
  /// Restrict to records created by this user.
  pub created_by:      Option<UserId>,
  /// Restrict to records of this tenant.
  pub tenant_id:       Option<TenantId>,
  /// Equality filters on top-level model fields.
  pub fields:          Vec<(String, Value)>,
  /// Also return soft-deleted records. Default `false`.
  pub include_deleted: bool,
  pub limit:           Option<usize>,
  pub offset:          Option<usize>,
}

impl RecordQuery {
  pub fn new() -> Self { Self::default() }

  pub fn created_by(mut self, user: UserId) -> Self {
    self.created_by = Some(user);
    self
  }

  pub fn tenant(mut self, tenant_id: TenantId) -> Self {
    self.tenant_id = Some(tenant_id);
    self
  }

  pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
    self.fields.push((name.into(), value.into()));
    self
  }

  pub fn include_deleted(mut self) -> Self {
    self.include_deleted = true;
    self
  }

  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a record store backend.
///
/// Default reads never return soft-deleted records. Every mutating method
/// runs as a single transaction: audit stamps and the data write commit or
/// fail together.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  /// Create the storage for `M` if it does not exist yet. Called once per
  /// model at startup.
  fn ensure_model<M: Model>(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Single-record writes ──────────────────────────────────────────────

  /// Insert (if new) or update `record`, stamping it on behalf of `actor`.
  ///
  /// The caller's record only receives the new stamps once the write has
  /// committed. Fails with a unique-violation error when a unique field
  /// collides, and with not-found when an existing record has no row.
  fn save<'a, M: Model>(
    &'a self,
    record: &'a mut Record<M>,
    actor: Actor,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Soft-delete `record`: flag it, stamp `deleted_at`/`deleted_by_user`,
  /// then save. A failed save leaves `record` untouched.
  fn delete<'a, M: Model>(
    &'a self,
    record: &'a mut Record<M>,
    actor: Actor,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Construct a record around `data` and save it.
  fn create<M: Model>(
    &self,
    data: M,
    actor: Actor,
  ) -> impl Future<Output = Result<Record<M>, Self::Error>> + Send + '_;

  // ── Batch writes ──────────────────────────────────────────────────────

  /// Insert all `records` in one transaction, stamping creator and updater
  /// on each.
  fn bulk_create<M: Model>(
    &self,
    records: Vec<Record<M>>,
    actor: Actor,
  ) -> impl Future<Output = Result<Vec<Record<M>>, Self::Error>> + Send + '_;

  /// Write only `fields` (plus `updated_by_user`) of each record. Records
  /// that are soft-deleted or missing are skipped and keep their in-memory
  /// stamps; only written records receive `updated_by_user`. Returns the
  /// number of rows updated.
  fn bulk_update<'a, M: Model>(
    &'a self,
    records: &'a mut [Record<M>],
    fields: &'a [&'a str],
    actor: Actor,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Return the first live record matching every `lookup` pair, or save
  /// `defaults` as a new one. The flag is `true` when a record was created.
  fn get_or_create<M: Model>(
    &self,
    lookup: Vec<(String, Value)>,
    defaults: Record<M>,
    actor: Actor,
  ) -> impl Future<Output = Result<(Record<M>, bool), Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Fetch a live record. Missing and soft-deleted ids are both not-found.
  fn get<M: Model>(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Record<M>, Self::Error>> + Send + '_;

  fn list<'a, M: Model>(
    &'a self,
    query: &'a RecordQuery,
  ) -> impl Future<Output = Result<Vec<Record<M>>, Self::Error>> + Send + 'a;
}
