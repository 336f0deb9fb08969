//! The audit envelope every persisted model lives in.
//!
//! A [`Record`] pairs a model value with its identity, provenance
//! (`created_by_user`, `updated_by_user`, `deleted_by_user`), timestamps and
//! soft-delete flag. Records are never physically removed: deleting one flips
//! `is_deleted`, which hides it from default reads.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, model::Model};

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Identifier of a user, as stored in the audit columns.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

/// Identifier of the tenant (company) a record or user belongs to.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TenantId(pub Uuid);

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

impl fmt::Display for TenantId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

impl FromStr for UserId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(Self(Uuid::parse_str(s.trim())?)) }
}

impl FromStr for TenantId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(Self(Uuid::parse_str(s.trim())?)) }
}

impl From<Uuid> for UserId {
  fn from(id: Uuid) -> Self { Self(id) }
}

impl From<Uuid> for TenantId {
  fn from(id: Uuid) -> Self { Self(id) }
}

// ─── Acting principal ────────────────────────────────────────────────────────

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
  pub id:        UserId,
  pub tenant_id: Option<TenantId>,
  pub email:     String,
}

/// Whoever is responsible for a write.
///
/// Stores accept a full principal, a bare identifier, or nobody at all.
/// [`Actor::user_id`] is the only place the three shapes are reconciled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Actor {
  #[default]
  None,
  Principal(Principal),
  RawId(UserId),
}

impl Actor {
  /// Parse a raw string identifier into an [`Actor::RawId`].
  pub fn raw(id: &str) -> Result<Self, Error> { Ok(Self::RawId(id.parse()?)) }

  /// The typed user id to stamp, if any.
  pub fn user_id(&self) -> Option<UserId> {
    match self {
      Self::None => None,
      Self::Principal(p) => Some(p.id),
      Self::RawId(id) => Some(*id),
    }
  }

  /// The actor's tenant. Only known when a full principal was supplied.
  pub fn tenant_id(&self) -> Option<TenantId> {
    match self {
      Self::Principal(p) => p.tenant_id,
      Self::None | Self::RawId(_) => None,
    }
  }
}

impl From<Principal> for Actor {
  fn from(p: Principal) -> Self { Self::Principal(p) }
}

impl From<&Principal> for Actor {
  fn from(p: &Principal) -> Self { Self::Principal(p.clone()) }
}

impl From<UserId> for Actor {
  fn from(id: UserId) -> Self { Self::RawId(id) }
}

impl From<Uuid> for Actor {
  fn from(id: Uuid) -> Self { Self::RawId(UserId(id)) }
}

impl From<Option<UserId>> for Actor {
  fn from(id: Option<UserId>) -> Self { id.map_or(Self::None, Self::RawId) }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A model value wrapped in its audit envelope.
///
/// Invariants maintained by the stamping methods:
/// - `is_deleted` is true exactly when `deleted_at` is set;
/// - `updated_at >= created_at`;
/// - `id` never changes after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<M> {
  pub id:              Uuid,
  pub tenant_id:       Option<TenantId>,
  pub created_at:      DateTime<Utc>,
  pub created_by_user: Option<UserId>,
  pub updated_at:      DateTime<Utc>,
  pub updated_by_user: Option<UserId>,
  pub is_deleted:      bool,
  pub deleted_at:      Option<DateTime<Utc>>,
  pub deleted_by_user: Option<UserId>,
  pub data:            M,
  /// True until the record has been saved for the first time.
  #[serde(skip)]
  pub adding:          bool,
}

impl<M: Model> Record<M> {
  /// Construct an unsaved record around `data`.
  pub fn new(data: M) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      tenant_id: None,
      created_at: now,
      created_by_user: None,
      updated_at: now,
      updated_by_user: None,
      is_deleted: false,
      deleted_at: None,
      deleted_by_user: None,
      data,
      adding: true,
    }
  }

  pub fn with_tenant(mut self, tenant_id: Option<TenantId>) -> Self {
    self.tenant_id = tenant_id;
    self
  }

  /// Apply the audit stamps of a save performed by `actor` at `now`.
  ///
  /// A new record takes the actor as its creator and, when it has no tenant
  /// yet, the actor's tenant. Every save takes the actor as last updater.
  pub fn stamp_save(&mut self, actor: &Actor, now: DateTime<Utc>) {
    if self.adding {
      self.created_at = now;
      if self.tenant_id.is_none() {
        self.tenant_id = actor.tenant_id();
      }
    }
    if let Some(user) = actor.user_id() {
      if self.adding {
        self.created_by_user = Some(user);
      }
      self.updated_by_user = Some(user);
    }
    self.updated_at = now.max(self.created_at);
  }

  /// Apply the stamps of a soft delete, then those of the save that
  /// persists it.
  ///
  /// Deleting an already deleted record re-stamps `deleted_at` and
  /// `deleted_by_user`.
  pub fn stamp_delete(&mut self, actor: &Actor, now: DateTime<Utc>) {
    if let Some(user) = actor.user_id() {
      self.deleted_by_user = Some(user);
    }
    self.is_deleted = true;
    self.deleted_at = Some(now);
    self.data.on_soft_delete();
    self.stamp_save(actor, now);
  }

  /// Batch updates only record who touched the row.
  pub fn stamp_updated_by(&mut self, actor: &Actor) {
    if let Some(user) = actor.user_id() {
      self.updated_by_user = Some(user);
    }
  }

  /// Get-or-create stamping: fill creator and updater from `actor` without
  /// overriding values the caller already put on the defaults.
  pub fn stamp_defaults(&mut self, actor: &Actor, now: DateTime<Utc>) {
    if let Some(user) = actor.user_id() {
      self.created_by_user.get_or_insert(user);
      self.updated_by_user.get_or_insert(user);
    }
    if self.tenant_id.is_none() {
      self.tenant_id = actor.tenant_id();
    }
    self.created_at = now;
    self.updated_at = now;
  }

  pub fn is_new(&self) -> bool { self.adding }
}
