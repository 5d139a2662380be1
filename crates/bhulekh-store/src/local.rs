//! [`LocalFileChannel`] — the encrypted snapshot as a single text file.

use std::{fs, path::PathBuf};

use tracing::debug;

use crate::{
  Result,
  channel::{BackupChannel, BackupMeta, SNAPSHOT_FILENAME},
};

/// Stores the blob at `<data_dir>/ledger_data.encrypted`, overwriting on
/// every save. The lowest-priority restore source and the only one that
/// works with no configuration at all.
#[derive(Debug, Clone)]
pub struct LocalFileChannel {
  path: PathBuf,
}

impl LocalFileChannel {
  pub fn new(data_dir: impl Into<PathBuf>) -> Self {
    Self {
      path: data_dir.into().join(SNAPSHOT_FILENAME),
    }
  }

  pub fn path(&self) -> &std::path::Path { &self.path }
}

impl BackupChannel for LocalFileChannel {
  fn name(&self) -> &'static str { "local-file" }

  fn save(&self, blob: &str, _meta: &BackupMeta) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::write(&self.path, blob)?;
    debug!(path = %self.path.display(), bytes = blob.len(), "wrote snapshot file");
    Ok(())
  }

  fn load_latest(&self) -> Result<Option<String>> {
    if !self.path.exists() {
      return Ok(None);
    }
    let blob = fs::read_to_string(&self.path)?;
    if blob.trim().is_empty() {
      return Ok(None);
    }
    Ok(Some(blob))
  }
}
