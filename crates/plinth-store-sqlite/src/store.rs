//! [`SqliteStore`] — the SQLite implementation of [`RecordStore`].

use std::path::Path;

use chrono::Utc;
use plinth_core::{
  Actor, Model, Record, RecordQuery, RecordStore,
  conversation::{Conversation, ConversationLog},
  model::is_identifier,
};
use rusqlite::{OptionalExtension as _, types::Value as SqlValue};
use serde_json::Value;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{RecordRow, encode_dt, encode_filter, encode_tenant, encode_user, encode_uuid, json_path},
  error::classify_write,
  schema::{RECORD_COLUMNS, SCHEMA, model_ddl},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Plinth record store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert or update a fully stamped record in one transaction. Returns the
  /// number of rows written.
  async fn write_record<M: Model>(&self, staged: &Record<M>) -> Result<usize> {
    let row = RecordRow::encode(staged)?;
    let adding = staged.adding;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let written = if adding {
          insert_row(&tx, M::TABLE, &row)?
        } else {
          update_row(&tx, M::TABLE, &row)?
        };
        tx.commit()?;
        Ok(written)
      })
      .await
      .map_err(|e| classify_write(M::TABLE, e))
  }
}

// ─── Row-level SQL ───────────────────────────────────────────────────────────

fn check_table<M: Model>() -> Result<()> {
  if is_identifier(M::TABLE) {
    Ok(())
  } else {
    Err(Error::InvalidName { what: "table name", name: M::TABLE.to_owned() })
  }
}

fn check_field(name: &str) -> Result<()> {
  if is_identifier(name) {
    Ok(())
  } else {
    Err(Error::InvalidName { what: "field name", name: name.to_owned() })
  }
}

fn insert_row(conn: &rusqlite::Connection, table: &str, row: &RecordRow) -> rusqlite::Result<usize> {
  conn.execute(
    &format!(
      "INSERT INTO {table} ({RECORD_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
    ),
    rusqlite::params![
      row.id,
      row.tenant_id,
      row.created_at,
      row.created_by_user,
      row.updated_at,
      row.updated_by_user,
      row.is_deleted,
      row.deleted_at,
      row.deleted_by_user,
      row.data,
    ],
  )
}

fn update_row(conn: &rusqlite::Connection, table: &str, row: &RecordRow) -> rusqlite::Result<usize> {
  conn.execute(
    &format!(
      "UPDATE {table} SET
         tenant_id = ?2, created_at = ?3, created_by_user = ?4,
         updated_at = ?5, updated_by_user = ?6,
         is_deleted = ?7, deleted_at = ?8, deleted_by_user = ?9,
         data = ?10
       WHERE id = ?1"
    ),
    rusqlite::params![
      row.id,
      row.tenant_id,
      row.created_at,
      row.created_by_user,
      row.updated_at,
      row.updated_by_user,
      row.is_deleted,
      row.deleted_at,
      row.deleted_by_user,
      row.data,
    ],
  )
}

/// A `SELECT` over one model table with its bound parameters.
struct Select {
  sql:    String,
  params: Vec<SqlValue>,
}

impl Select {
  fn build(table: &str, query: &RecordQuery) -> Result<Self> {
    let mut conds: Vec<String> = vec![];
    let mut params: Vec<SqlValue> = vec![];

    if !query.include_deleted {
      conds.push("is_deleted = 0".into());
    }
    if let Some(user) = encode_user(query.created_by) {
      conds.push("created_by_user = ?".into());
      params.push(SqlValue::Text(user));
    }
    if let Some(tenant) = encode_tenant(query.tenant_id) {
      conds.push("tenant_id = ?".into());
      params.push(SqlValue::Text(tenant));
    }
    for (field, value) in &query.fields {
      check_field(field)?;
      conds.push("json_extract(data, ?) IS ?".into());
      params.push(SqlValue::Text(json_path(field)));
      params.push(encode_filter(field, value)?);
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };

    // SQLite treats a negative LIMIT as "no limit".
    params.push(SqlValue::Integer(query.limit.map_or(-1, |l| l as i64)));
    params.push(SqlValue::Integer(query.offset.unwrap_or(0) as i64));

    Ok(Self {
      sql: format!(
        "SELECT {RECORD_COLUMNS} FROM {table}
         {where_clause}
         ORDER BY created_at, id
         LIMIT ? OFFSET ?"
      ),
      params,
    })
  }

  fn run(&self, conn: &rusqlite::Connection) -> rusqlite::Result<Vec<RecordRow>> {
    let mut stmt = conn.prepare(&self.sql)?;
    stmt
      .query_map(rusqlite::params_from_iter(self.params.iter()), RecordRow::from_row)?
      .collect()
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  async fn ensure_model<M: Model>(&self) -> Result<()> {
    check_table::<M>()?;
    for field in M::UNIQUE_FIELDS {
      check_field(field)?;
    }
    let ddl = model_ddl(M::TABLE, M::UNIQUE_FIELDS);

    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&ddl)?;
        Ok(())
      })
      .await?;

    tracing::debug!(table = M::TABLE, "model table ready");
    Ok(())
  }

  // ── Single-record writes ──────────────────────────────────────────────────

  async fn save<'a, M: Model>(&'a self, record: &'a mut Record<M>, actor: Actor) -> Result<()> {
    check_table::<M>()?;
    let mut staged = record.clone();
    staged.stamp_save(&actor, Utc::now());

    if self.write_record(&staged).await? == 0 {
      return Err(Error::NotFound { table: M::TABLE, id: staged.id });
    }

    staged.adding = false;
    *record = staged;
    Ok(())
  }

  async fn delete<'a, M: Model>(&'a self, record: &'a mut Record<M>, actor: Actor) -> Result<()> {
    check_table::<M>()?;
    let mut staged = record.clone();
    staged.stamp_delete(&actor, Utc::now());

    if self.write_record(&staged).await? == 0 {
      return Err(Error::NotFound { table: M::TABLE, id: staged.id });
    }

    staged.adding = false;
    *record = staged;
    Ok(())
  }

  async fn create<M: Model>(&self, data: M, actor: Actor) -> Result<Record<M>> {
    let mut record = Record::new(data);
    self.save(&mut record, actor).await?;
    Ok(record)
  }

  // ── Batch writes ──────────────────────────────────────────────────────────

  async fn bulk_create<M: Model>(
    &self,
    mut records: Vec<Record<M>>,
    actor: Actor,
  ) -> Result<Vec<Record<M>>> {
    check_table::<M>()?;
    let now = Utc::now();

    let mut rows = Vec::with_capacity(records.len());
    for record in &mut records {
      record.adding = true;
      record.stamp_save(&actor, now);
      rows.push(RecordRow::encode(record)?);
    }

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for row in &rows {
          insert_row(&tx, M::TABLE, row)?;
        }
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(|e| classify_write(M::TABLE, e))?;

    for record in &mut records {
      record.adding = false;
    }
    Ok(records)
  }

  async fn bulk_update<'a, M: Model>(
    &'a self,
    records: &'a mut [Record<M>],
    fields: &'a [&'a str],
    actor: Actor,
  ) -> Result<usize> {
    check_table::<M>()?;
    if fields.is_empty() {
      return Err(plinth_core::Error::Validation("bulk update needs at least one field".into()).into());
    }
    for field in fields {
      check_field(field)?;
    }

    let updated_by = encode_user(actor.user_id());
    let assignments = fields.iter().map(|_| "?, json(?)").collect::<Vec<_>>().join(", ");
    let stamp = if updated_by.is_some() { ", updated_by_user = ?" } else { "" };
    let sql = format!(
      "UPDATE {} SET data = json_set(data, {assignments}){stamp}
       WHERE id = ? AND is_deleted = 0",
      M::TABLE
    );

    let mut batches: Vec<Vec<SqlValue>> = Vec::with_capacity(records.len());
    for record in records.iter() {
      let data = serde_json::to_value(&record.data)?;
      let mut params = Vec::with_capacity(fields.len() * 2 + 2);
      for field in fields {
        let value = data.get(*field).ok_or_else(|| Error::UnknownField {
          table: M::TABLE,
          field: (*field).to_owned(),
        })?;
        params.push(SqlValue::Text(json_path(field)));
        params.push(SqlValue::Text(serde_json::to_string(value)?));
      }
      if let Some(user) = &updated_by {
        params.push(SqlValue::Text(user.clone()));
      }
      params.push(SqlValue::Text(encode_uuid(record.id)));
      batches.push(params);
    }

    let written: Vec<bool> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut written = Vec::with_capacity(batches.len());
        {
          let mut stmt = tx.prepare(&sql)?;
          for params in &batches {
            written.push(stmt.execute(rusqlite::params_from_iter(params.iter()))? > 0);
          }
        }
        tx.commit()?;
        Ok(written)
      })
      .await
      .map_err(|e| classify_write(M::TABLE, e))?;

    // Skipped rows keep their in-memory stamps so they match storage.
    let mut updated = 0;
    for (record, written) in records.iter_mut().zip(written) {
      if written {
        record.stamp_updated_by(&actor);
        updated += 1;
      }
    }
    Ok(updated)
  }

  async fn get_or_create<M: Model>(
    &self,
    lookup: Vec<(String, Value)>,
    mut defaults: Record<M>,
    actor: Actor,
  ) -> Result<(Record<M>, bool)> {
    check_table::<M>()?;
    let query = RecordQuery { fields: lookup, ..RecordQuery::default() }.limit(1);
    let select = Select::build(M::TABLE, &query)?;

    defaults.adding = true;
    defaults.stamp_defaults(&actor, Utc::now());
    let row = RecordRow::encode(&defaults)?;

    let existing = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if let Some(found) = select.run(&tx)?.into_iter().next() {
          return Ok(Some(found));
        }
        insert_row(&tx, M::TABLE, &row)?;
        tx.commit()?;
        Ok(None)
      })
      .await
      .map_err(|e| classify_write(M::TABLE, e))?;

    match existing {
      Some(found) => Ok((found.into_record()?, false)),
      None => {
        defaults.adding = false;
        Ok((defaults, true))
      }
    }
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get<M: Model>(&self, id: Uuid) -> Result<Record<M>> {
    check_table::<M>()?;
    let id_str = encode_uuid(id);

    let raw: Option<RecordRow> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {RECORD_COLUMNS} FROM {} WHERE id = ?1 AND is_deleted = 0",
                M::TABLE
              ),
              rusqlite::params![id_str],
              RecordRow::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .ok_or(Error::NotFound { table: M::TABLE, id })?
      .into_record()
  }

  async fn list<'a, M: Model>(&'a self, query: &'a RecordQuery) -> Result<Vec<Record<M>>> {
    check_table::<M>()?;
    let select = Select::build(M::TABLE, query)?;

    let raws: Vec<RecordRow> = self.conn.call(move |conn| Ok(select.run(conn)?)).await?;

    raws.into_iter().map(RecordRow::into_record).collect()
  }
}

// ─── ConversationLog impl ────────────────────────────────────────────────────

impl ConversationLog for SqliteStore {
  type Error = Error;

  async fn record_conversation(
    &self,
    user_id: String,
    conversation_id: String,
  ) -> Result<Conversation> {
    let conversation = Conversation { user_id, conversation_id, timestamp: Utc::now() };

    let user_id = conversation.user_id.clone();
    let conversation_id = conversation.conversation_id.clone();
    let at_str = encode_dt(conversation.timestamp);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO conversations (user_id, conversation_id, timestamp) VALUES (?1, ?2, ?3)",
          rusqlite::params![user_id, conversation_id, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(conversation)
  }
}
