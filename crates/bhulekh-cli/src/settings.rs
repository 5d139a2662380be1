//! CLI settings: `config.toml` overlaid with `BHULEKH_*` environment
//! variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// Directory holding the snapshot file, CID bookkeeping, and (by
  /// default) the backup database.
  pub data_dir:          PathBuf,
  /// Backup database path; defaults to `<data_dir>/backups.db`.
  pub sqlite_path:       Option<PathBuf>,
  pub pinata_api_key:    String,
  pub pinata_secret_key: String,
  /// IPFS gateway base URLs tried during remote restore; empty means the
  /// built-in list.
  pub gateways:          Vec<String>,
  /// Recorded as `created_by` on every backup.
  pub operator:          String,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      data_dir:          PathBuf::from("data"),
      sqlite_path:       None,
      pinata_api_key:    String::new(),
      pinata_secret_key: String::new(),
      gateways:          Vec::new(),
      operator:          "bhulekh-cli".to_string(),
    }
  }
}

impl Settings {
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path.to_path_buf()).required(false))
      .add_source(config::Environment::with_prefix("BHULEKH"))
      .build()
      .context("failed to read configuration")?
      .try_deserialize()
      .context("failed to deserialize settings")
  }

  pub fn sqlite_path(&self) -> PathBuf {
    self
      .sqlite_path
      .clone()
      .unwrap_or_else(|| self.data_dir.join("backups.db"))
  }
}
