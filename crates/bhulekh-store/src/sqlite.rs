//! [`SqliteChannel`] — snapshot history in a `ledger_backups` table.
//!
//! Unlike the file channel this keeps a rolling history: each save inserts
//! a new row and the oldest rows beyond [`MAX_BACKUP_ROWS`] are trimmed.
//! Restore always takes the newest row.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension as _, params};
use tracing::debug;

use crate::{
  Result,
  channel::{BackupChannel, BackupMeta},
};

/// Rows retained after each save; older backups are deleted.
pub const MAX_BACKUP_ROWS: usize = 10;

/// Idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS ledger_backups (
    backup_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,   -- friendly display name
    filename    TEXT NOT NULL,   -- original filename, for reference
    backup_data TEXT NOT NULL,   -- encrypted snapshot text
    created_at  TEXT NOT NULL,   -- ISO 8601 UTC
    created_by  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS ledger_backups_created_idx
    ON ledger_backups(created_at);
";

pub struct SqliteChannel {
  conn: Connection,
}

impl SqliteChannel {
  /// Open (or create) the backup database at `path`.
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = Connection::open(path)?;
    conn.execute_batch(SCHEMA)?;
    Ok(Self { conn })
  }

  /// In-memory channel — useful for testing.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(SCHEMA)?;
    Ok(Self { conn })
  }

  /// Number of retained backup rows.
  pub fn backup_count(&self) -> Result<usize> {
    let count: i64 = self.conn.query_row(
      "SELECT COUNT(*) FROM ledger_backups",
      [],
      |row| row.get(0),
    )?;
    Ok(count as usize)
  }

  fn trim_old_rows(&self) -> Result<usize> {
    let deleted = self.conn.execute(
      "DELETE FROM ledger_backups
       WHERE backup_id NOT IN (
         SELECT backup_id FROM ledger_backups
         ORDER BY created_at DESC, backup_id DESC
         LIMIT ?1
       )",
      params![MAX_BACKUP_ROWS as i64],
    )?;
    Ok(deleted)
  }
}

impl BackupChannel for SqliteChannel {
  fn name(&self) -> &'static str { "sqlite" }

  fn save(&self, blob: &str, meta: &BackupMeta) -> Result<()> {
    self.conn.execute(
      "INSERT INTO ledger_backups (name, filename, backup_data, created_at, created_by)
       VALUES (?1, ?2, ?3, ?4, ?5)",
      params![
        meta.display_name,
        meta.filename,
        blob,
        meta.created_at,
        meta.created_by
      ],
    )?;
    let trimmed = self.trim_old_rows()?;
    if trimmed > 0 {
      debug!(trimmed, "rotated old backup rows");
    }
    Ok(())
  }

  fn load_latest(&self) -> Result<Option<String>> {
    let blob: Option<String> = self
      .conn
      .query_row(
        "SELECT backup_data FROM ledger_backups
         ORDER BY created_at DESC, backup_id DESC
         LIMIT 1",
        [],
        |row| row.get(0),
      )
      .optional()?;
    Ok(blob)
  }
}
