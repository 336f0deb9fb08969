//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings and UUIDs as hyphenated
//! lowercase strings. Model payloads are compact JSON.

use chrono::{DateTime, SecondsFormat, Utc};
use plinth_core::{Model, Record, TenantId, UserId};
use rusqlite::types::Value as SqlValue;
use serde_json::Value;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_user(id: Option<UserId>) -> Option<String> { id.map(|u| encode_uuid(u.0)) }

pub fn encode_tenant(id: Option<TenantId>) -> Option<String> {
  id.map(|t| encode_uuid(t.0))
}

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// Fixed-width nanosecond form, so text order matches time order.
pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Nanos, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Filter values ───────────────────────────────────────────────────────────

/// Convert a JSON filter value into what `json_extract` yields for it, so the
/// two compare equal with `IS`.
pub fn encode_filter(field: &str, v: &Value) -> Result<SqlValue> {
  Ok(match v {
    Value::Null => SqlValue::Null,
    Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
    Value::Number(n) => match (n.as_i64(), n.as_f64()) {
      (Some(i), _) => SqlValue::Integer(i),
      (None, Some(f)) => SqlValue::Real(f),
      (None, None) => {
        return Err(Error::UnsupportedFilter {
          field:  field.to_owned(),
          reason: "number out of range",
        });
      }
    },
    Value::String(s) => SqlValue::Text(s.clone()),
    Value::Array(_) | Value::Object(_) => {
      return Err(Error::UnsupportedFilter {
        field:  field.to_owned(),
        reason: "only scalar values can be compared",
      });
    }
  })
}

/// JSON path addressing a top-level field.
pub fn json_path(field: &str) -> String { format!("$.{field}") }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column values of a record row, ready to bind in
/// [`RECORD_COLUMNS`](crate::schema::RECORD_COLUMNS) order.
pub struct RecordRow {
  pub id:              String,
  pub tenant_id:       Option<String>,
  pub created_at:      String,
  pub created_by_user: Option<String>,
  pub updated_at:      String,
  pub updated_by_user: Option<String>,
  pub is_deleted:      bool,
  pub deleted_at:      Option<String>,
  pub deleted_by_user: Option<String>,
  pub data:            String,
}

impl RecordRow {
  pub fn encode<M: Model>(record: &Record<M>) -> Result<Self> {
    Ok(Self {
      id:              encode_uuid(record.id),
      tenant_id:       encode_tenant(record.tenant_id),
      created_at:      encode_dt(record.created_at),
      created_by_user: encode_user(record.created_by_user),
      updated_at:      encode_dt(record.updated_at),
      updated_by_user: encode_user(record.updated_by_user),
      is_deleted:      record.is_deleted,
      deleted_at:      record.deleted_at.map(encode_dt),
      deleted_by_user: encode_user(record.deleted_by_user),
      data:            serde_json::to_string(&record.data)?,
    })
  }

  /// Read a row selected with
  /// [`RECORD_COLUMNS`](crate::schema::RECORD_COLUMNS).
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      tenant_id:       row.get(1)?,
      created_at:      row.get(2)?,
      created_by_user: row.get(3)?,
      updated_at:      row.get(4)?,
      updated_by_user: row.get(5)?,
      is_deleted:      row.get(6)?,
      deleted_at:      row.get(7)?,
      deleted_by_user: row.get(8)?,
      data:            row.get(9)?,
    })
  }

  pub fn into_record<M: Model>(self) -> Result<Record<M>> {
    Ok(Record {
      id:              decode_uuid(&self.id)?,
      tenant_id:       decode_opt_uuid(self.tenant_id)?.map(TenantId),
      created_at:      decode_dt(&self.created_at)?,
      created_by_user: decode_opt_uuid(self.created_by_user)?.map(UserId),
      updated_at:      decode_dt(&self.updated_at)?,
      updated_by_user: decode_opt_uuid(self.updated_by_user)?.map(UserId),
      is_deleted:      self.is_deleted,
      deleted_at:      self.deleted_at.as_deref().map(decode_dt).transpose()?,
      deleted_by_user: decode_opt_uuid(self.deleted_by_user)?.map(UserId),
      data:            serde_json::from_str(&self.data)?,
      adding:          false,
    })
  }
}
