//! SQL schema for the Plinth SQLite store.
//!
//! [`SCHEMA`] runs once at connection startup. Model tables are created on
//! demand by [`model_ddl`] when a model is registered.

/// Connection-wide pragmas and fixed tables; idempotent thanks to
/// `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Bot conversation log. Append-only, not audited.
CREATE TABLE IF NOT EXISTS conversations (
    id              INTEGER PRIMARY KEY,
    user_id         TEXT NOT NULL,
    conversation_id TEXT NOT NULL,
    timestamp       TEXT NOT NULL
);
";

/// Columns shared by every model table, in `SELECT` order.
pub const RECORD_COLUMNS: &str = "id, tenant_id, created_at, created_by_user, updated_at, \
   updated_by_user, is_deleted, deleted_at, deleted_by_user, data";

/// DDL for one model table plus its indexes.
///
/// `table` and every entry of `unique_fields` must already be validated as
/// identifiers. Unique fields are enforced by expression indexes over the
/// JSON document; SQL `NULL`s never collide.
pub fn model_ddl(table: &str, unique_fields: &[&str]) -> String {
  let mut ddl = format!(
    "CREATE TABLE IF NOT EXISTS {table} (
    id              TEXT PRIMARY KEY,
    tenant_id       TEXT,
    created_at      TEXT NOT NULL,
    created_by_user TEXT,
    updated_at      TEXT NOT NULL,
    updated_by_user TEXT,
    is_deleted      INTEGER NOT NULL DEFAULT 0,
    deleted_at      TEXT,
    deleted_by_user TEXT,
    data            TEXT NOT NULL    -- the model, as a JSON object
);
CREATE INDEX IF NOT EXISTS {table}_live_idx       ON {table} (is_deleted, created_at);
CREATE INDEX IF NOT EXISTS {table}_created_by_idx ON {table} (created_by_user);
CREATE INDEX IF NOT EXISTS {table}_tenant_idx     ON {table} (tenant_id);
"
  );
  for field in unique_fields {
    ddl.push_str(&format!(
      "CREATE UNIQUE INDEX IF NOT EXISTS {table}_{field}_key \
       ON {table} (json_extract(data, '$.{field}'));\n"
    ));
  }
  ddl
}
