//! Integration tests for `SqliteStore` against an in-memory database.

use std::time::Duration;

use plinth_core::{
  Actor, Classify, ErrorKind, Model, Principal, Record, RecordQuery, RecordStore, TenantId,
  UserId,
  conversation::ConversationLog,
  user::User,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{Error, SqliteStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Widget {
  code:  String,
  label: String,
  count: i64,
}

impl Model for Widget {
  const TABLE: &'static str = "widgets";
  const UNIQUE_FIELDS: &'static [&'static str] = &["code"];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BadTable;

impl Model for BadTable {
  const TABLE: &'static str = "bad table";
}

async fn store() -> SqliteStore {
  let s = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  s.ensure_model::<Widget>().await.expect("widgets table");
  s
}

fn widget(code: &str) -> Widget {
  Widget { code: code.into(), label: format!("widget {code}"), count: 0 }
}

fn principal(tenant: Option<TenantId>) -> Principal {
  Principal {
    id:        UserId(Uuid::new_v4()),
    tenant_id: tenant,
    email:     "alice@example.com".into(),
  }
}

// ─── Create / get ────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_stamps_actor_and_is_readable() {
  let s = store().await;
  let p = principal(Some(TenantId(Uuid::new_v4())));

  let r = s.create(widget("a"), Actor::from(&p)).await.unwrap();
  assert_eq!(r.created_by_user, Some(p.id));
  assert_eq!(r.updated_by_user, Some(p.id));
  assert_eq!(r.tenant_id, p.tenant_id);
  assert!(!r.is_deleted);
  assert!(!r.is_new());

  let fetched: Record<Widget> = s.get(r.id).await.unwrap();
  assert_eq!(fetched.id, r.id);
  assert_eq!(fetched.data, r.data);
  assert_eq!(fetched.created_by_user, Some(p.id));
  assert_eq!(fetched.tenant_id, p.tenant_id);
}

#[tokio::test]
async fn create_with_raw_string_actor() {
  let s = store().await;
  let id = Uuid::new_v4();

  let r = s
    .create(widget("a"), Actor::raw(&id.to_string()).unwrap())
    .await
    .unwrap();
  assert_eq!(r.created_by_user, Some(UserId(id)));
  assert_eq!(r.tenant_id, None);
}

#[tokio::test]
async fn create_without_actor_leaves_audit_users_empty() {
  let s = store().await;
  let r = s.create(widget("a"), Actor::None).await.unwrap();
  assert_eq!(r.created_by_user, None);
  assert_eq!(r.updated_by_user, None);
}

#[tokio::test]
async fn get_missing_is_not_found() {
  let s = store().await;
  let err = s.get::<Widget>(Uuid::new_v4()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ─── Save ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn save_updates_fields_and_updater_only() {
  let s = store().await;
  let creator = UserId(Uuid::new_v4());
  let editor = UserId(Uuid::new_v4());

  let mut r = s.create(widget("a"), Actor::RawId(creator)).await.unwrap();
  let created_at = r.created_at;
  let before = r.updated_at;
  tokio::time::sleep(Duration::from_millis(5)).await;

  r.data.label = "renamed".into();
  s.save(&mut r, Actor::RawId(editor)).await.unwrap();

  let fetched: Record<Widget> = s.get(r.id).await.unwrap();
  assert_eq!(fetched.data.label, "renamed");
  assert_eq!(fetched.created_by_user, Some(creator));
  assert_eq!(fetched.updated_by_user, Some(editor));
  assert_eq!(fetched.created_at, created_at);
  assert!(fetched.updated_at > before);
}

#[tokio::test]
async fn save_of_vanished_record_is_not_found() {
  let s = store().await;
  let mut r = Record::new(widget("ghost"));
  r.adding = false;

  let err = s.save(&mut r, Actor::None).await.unwrap_err();
  assert!(matches!(err, Error::NotFound { .. }));
}

// ─── Uniqueness ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_unique_field_is_rejected_and_first_survives() {
  let s = store().await;
  let first = s.create(widget("dup"), Actor::None).await.unwrap();

  let err = s.create(widget("dup"), Actor::None).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::UniqueViolation);

  let all: Vec<Record<Widget>> = s.list(&RecordQuery::new()).await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].id, first.id);
}

#[tokio::test]
async fn uniqueness_spans_soft_deleted_records() {
  let s = store().await;
  let mut first = s.create(widget("dup"), Actor::None).await.unwrap();
  s.delete(&mut first, Actor::None).await.unwrap();

  let err = s.create(widget("dup"), Actor::None).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::UniqueViolation);
}

// ─── Soft delete ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_hides_record_from_default_reads() {
  let s = store().await;
  let p = principal(None);
  let mut r = s.create(widget("a"), Actor::None).await.unwrap();

  s.delete(&mut r, Actor::from(&p)).await.unwrap();
  assert!(r.is_deleted);
  assert!(r.deleted_at.is_some());
  assert_eq!(r.deleted_by_user, Some(p.id));

  let err = s.get::<Widget>(r.id).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);

  let live: Vec<Record<Widget>> = s.list(&RecordQuery::new()).await.unwrap();
  assert!(live.is_empty());

  let everything: Vec<Record<Widget>> =
    s.list(&RecordQuery::new().include_deleted()).await.unwrap();
  assert_eq!(everything.len(), 1);
  assert!(everything[0].is_deleted);
  assert_eq!(everything[0].deleted_by_user, Some(p.id));
}

#[tokio::test]
async fn deleting_twice_restamps() {
  let s = store().await;
  let first = UserId(Uuid::new_v4());
  let second = UserId(Uuid::new_v4());
  let mut r = s.create(widget("a"), Actor::None).await.unwrap();

  s.delete(&mut r, Actor::RawId(first)).await.unwrap();
  let first_at = r.deleted_at;
  s.delete(&mut r, Actor::RawId(second)).await.unwrap();

  assert_eq!(r.deleted_by_user, Some(second));
  assert!(r.deleted_at >= first_at);

  let stored: Vec<Record<Widget>> =
    s.list(&RecordQuery::new().include_deleted()).await.unwrap();
  assert_eq!(stored[0].deleted_by_user, Some(second));
}

#[tokio::test]
async fn failed_delete_leaves_record_untouched() {
  let s = store().await;
  s.create(widget("taken"), Actor::None).await.unwrap();
  let mut r = s.create(widget("free"), Actor::None).await.unwrap();

  // Make the save inside delete collide on the unique code.
  r.data.code = "taken".into();
  let err = s.delete(&mut r, Actor::None).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::UniqueViolation);

  assert!(!r.is_deleted);
  assert!(r.deleted_at.is_none());
  let stored: Record<Widget> = s.get(r.id).await.unwrap();
  assert!(!stored.is_deleted);
  assert_eq!(stored.data.code, "free");
}

#[tokio::test]
async fn deleting_a_user_deactivates_it() {
  let s = store().await;
  s.ensure_model::<User>().await.unwrap();
  let mut u = s
    .create(
      User {
        email:         "bob@example.com".into(),
        name:          "Bob".into(),
        password_hash: "x".into(),
        is_active:     true,
        is_staff:      false,
        is_superuser:  false,
      },
      Actor::None,
    )
    .await
    .unwrap();

  s.delete(&mut u, Actor::None).await.unwrap();
  let stored: Vec<Record<User>> = s.list(&RecordQuery::new().include_deleted()).await.unwrap();
  assert!(!stored[0].data.is_active);
}

// ─── Listing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_filters_by_creator_tenant_and_field() {
  let s = store().await;
  let tenant = TenantId(Uuid::new_v4());
  let alice = principal(Some(tenant));
  let bob = principal(None);

  s.create(widget("a1"), Actor::from(&alice)).await.unwrap();
  s.create(widget("a2"), Actor::from(&alice)).await.unwrap();
  s.create(widget("b1"), Actor::from(&bob)).await.unwrap();

  let by_alice: Vec<Record<Widget>> =
    s.list(&RecordQuery::new().created_by(alice.id)).await.unwrap();
  assert_eq!(by_alice.len(), 2);
  assert!(by_alice.iter().all(|r| r.created_by_user == Some(alice.id)));

  let in_tenant: Vec<Record<Widget>> = s.list(&RecordQuery::new().tenant(tenant)).await.unwrap();
  assert_eq!(in_tenant.len(), 2);

  let b1: Vec<Record<Widget>> = s.list(&RecordQuery::new().field("code", "b1")).await.unwrap();
  assert_eq!(b1.len(), 1);
  assert_eq!(b1[0].data.code, "b1");

  let zero: Vec<Record<Widget>> = s.list(&RecordQuery::new().field("count", 0)).await.unwrap();
  assert_eq!(zero.len(), 3);
}

#[tokio::test]
async fn list_rejects_non_identifier_fields() {
  let s = store().await;
  let err = s
    .list::<Widget>(&RecordQuery::new().field("code') OR 1=1 --", "x"))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn list_respects_limit() {
  let s = store().await;
  for code in ["a", "b", "c"] {
    s.create(widget(code), Actor::None).await.unwrap();
  }
  let two: Vec<Record<Widget>> = s.list(&RecordQuery::new().limit(2)).await.unwrap();
  assert_eq!(two.len(), 2);
}

// ─── Batch writes ────────────────────────────────────────────────────────────

#[tokio::test]
async fn bulk_create_stamps_every_record() {
  let s = store().await;
  let actor = UserId(Uuid::new_v4());
  let records = vec![Record::new(widget("x")), Record::new(widget("y"))];

  let created = s.bulk_create(records, Actor::RawId(actor)).await.unwrap();
  assert_eq!(created.len(), 2);
  assert!(created.iter().all(|r| r.created_by_user == Some(actor)));
  assert!(created.iter().all(|r| r.updated_by_user == Some(actor)));
  assert!(created.iter().all(|r| !r.is_new()));

  let stored: Vec<Record<Widget>> = s.list(&RecordQuery::new().created_by(actor)).await.unwrap();
  assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn bulk_create_is_all_or_nothing() {
  let s = store().await;
  let records = vec![Record::new(widget("same")), Record::new(widget("same"))];

  let err = s.bulk_create(records, Actor::None).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::UniqueViolation);

  let stored: Vec<Record<Widget>> = s.list(&RecordQuery::new()).await.unwrap();
  assert!(stored.is_empty());
}

#[tokio::test]
async fn bulk_update_writes_only_named_fields() {
  let s = store().await;
  let creator = UserId(Uuid::new_v4());
  let editor = UserId(Uuid::new_v4());
  let mut records = s
    .bulk_create(vec![Record::new(widget("x")), Record::new(widget("y"))], Actor::RawId(creator))
    .await
    .unwrap();

  for r in &mut records {
    r.data.count = 7;
    r.data.label = "not written".into();
  }
  let updated = s
    .bulk_update(&mut records, &["count"], Actor::RawId(editor))
    .await
    .unwrap();
  assert_eq!(updated, 2);
  assert!(records.iter().all(|r| r.updated_by_user == Some(editor)));

  let stored: Vec<Record<Widget>> = s.list(&RecordQuery::new()).await.unwrap();
  for r in stored {
    assert_eq!(r.data.count, 7);
    assert_ne!(r.data.label, "not written");
    assert_eq!(r.created_by_user, Some(creator));
    assert_eq!(r.updated_by_user, Some(editor));
  }
}

#[tokio::test]
async fn bulk_update_skips_soft_deleted_records() {
  let s = store().await;
  let mut keep = s.create(widget("keep"), Actor::None).await.unwrap();
  let mut gone = s.create(widget("gone"), Actor::None).await.unwrap();
  s.delete(&mut gone, Actor::None).await.unwrap();

  keep.data.count = 1;
  gone.data.count = 1;
  let editor = UserId(Uuid::new_v4());
  let mut batch = vec![keep, gone];
  let updated = s.bulk_update(&mut batch, &["count"], Actor::RawId(editor)).await.unwrap();
  assert_eq!(updated, 1);

  // Only the written row is stamped in memory, matching what was stored.
  assert_eq!(batch[0].updated_by_user, Some(editor));
  assert_eq!(batch[1].updated_by_user, None);

  let stored: Vec<Record<Widget>> = s.list(&RecordQuery::new().include_deleted()).await.unwrap();
  for (mem, row) in batch.iter().zip(&stored) {
    assert_eq!(mem.id, row.id);
    assert_eq!(mem.updated_by_user, row.updated_by_user);
  }
}

#[tokio::test]
async fn bulk_update_rejects_unknown_and_missing_fields() {
  let s = store().await;
  let mut batch = vec![s.create(widget("x"), Actor::None).await.unwrap()];

  let err = s.bulk_update(&mut batch, &["colour"], Actor::None).await.unwrap_err();
  assert!(matches!(err, Error::UnknownField { .. }));

  let err = s.bulk_update(&mut batch, &[], Actor::None).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
}

// ─── get_or_create ───────────────────────────────────────────────────────────

#[tokio::test]
async fn get_or_create_creates_then_gets() {
  let s = store().await;
  let actor = UserId(Uuid::new_v4());
  let lookup = vec![("code".to_string(), json!("goc"))];

  let (created, was_created) = s
    .get_or_create(lookup.clone(), Record::new(widget("goc")), Actor::RawId(actor))
    .await
    .unwrap();
  assert!(was_created);
  assert_eq!(created.created_by_user, Some(actor));
  assert_eq!(created.updated_by_user, Some(actor));

  let other = UserId(Uuid::new_v4());
  let (found, was_created) = s
    .get_or_create(lookup, Record::new(widget("goc")), Actor::RawId(other))
    .await
    .unwrap();
  assert!(!was_created);
  assert_eq!(found.id, created.id);
  assert_eq!(found.created_by_user, Some(actor));
  assert_eq!(found.updated_by_user, Some(actor));

  let stored: Record<Widget> = s.get(created.id).await.unwrap();
  assert_eq!(stored.created_by_user, Some(actor));
  assert_eq!(stored.updated_by_user, Some(actor));
  assert_eq!(stored.updated_at, created.updated_at);
}

#[tokio::test]
async fn get_or_create_keeps_caller_defaults() {
  let s = store().await;
  let preset = UserId(Uuid::new_v4());
  let actor = UserId(Uuid::new_v4());
  let mut defaults = Record::new(widget("preset"));
  defaults.created_by_user = Some(preset);

  let (r, _) = s
    .get_or_create(vec![("code".into(), json!("preset"))], defaults, Actor::RawId(actor))
    .await
    .unwrap();
  assert_eq!(r.created_by_user, Some(preset));
  assert_eq!(r.updated_by_user, Some(actor));
}

// ─── Schema checks ───────────────────────────────────────────────────────────

#[tokio::test]
async fn ensure_model_rejects_bad_table_names() {
  let s = store().await;
  let err = s.ensure_model::<BadTable>().await.unwrap_err();
  assert!(matches!(err, Error::InvalidName { .. }));
}

// ─── Conversations ───────────────────────────────────────────────────────────

#[tokio::test]
async fn record_conversation_returns_stamped_entry() {
  let s = store().await;
  let c = s
    .record_conversation("user-1".into(), "conv-1".into())
    .await
    .unwrap();
  assert_eq!(c.user_id, "user-1");
  assert_eq!(c.conversation_id, "conv-1");
}
