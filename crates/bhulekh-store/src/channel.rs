//! The [`BackupChannel`] capability trait every storage destination
//! implements.

use chrono::Utc;

use crate::Result;

/// The filename every channel stores the snapshot under; also the name the
/// remote channel tries first when a CID resolves to a folder.
pub const SNAPSHOT_FILENAME: &str = "ledger_data.encrypted";

/// Descriptive metadata attached to every saved blob.
#[derive(Debug, Clone)]
pub struct BackupMeta {
  /// Friendly display name, e.g. `"Auto-backup 2024-05-01 12:00:00"`.
  pub display_name: String,
  pub filename:     String,
  /// RFC 3339.
  pub created_at:   String,
  /// Operator or process identifier.
  pub created_by:   String,
}

impl BackupMeta {
  /// Metadata for an automatic post-mutation backup.
  pub fn auto(created_by: impl Into<String>) -> Self {
    let now = Utc::now();
    Self {
      display_name: format!(
        "Auto-backup {}",
        now.format("%Y-%m-%d %H:%M:%S")
      ),
      filename:     SNAPSHOT_FILENAME.to_string(),
      created_at:   now.to_rfc3339(),
      created_by:   created_by.into(),
    }
  }
}

/// A destination that can store and retrieve the encrypted snapshot text.
///
/// Synchronous on purpose: saves happen after each mutation on the caller's
/// thread, and restore runs once at startup. Implementations must treat the
/// blob as opaque text.
pub trait BackupChannel {
  /// Short stable identifier used in logs and restore reports.
  fn name(&self) -> &'static str;

  fn save(&self, blob: &str, meta: &BackupMeta) -> Result<()>;

  /// The most recently saved blob, or `Ok(None)` if this channel has never
  /// stored one. Transport and storage failures are `Err`.
  fn load_latest(&self) -> Result<Option<String>>;
}
