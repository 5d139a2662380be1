//! [`CidRegistry`] — remembering which IPFS CID holds the latest backup.
//!
//! The CID is the one piece of state the remote channel cannot rediscover
//! from the blob itself, so it is written to every reachable sink and read
//! back from the first one that answers. The process environment comes
//! first so an operator can force a specific restore point; the Pinata
//! pin-list query (owned by the remote channel) slots in after it.

use std::{fs, path::PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::Result;

/// Operator override: restore from this CID, ignoring recorded history.
pub const RESTORE_CID_ENV: &str = "BHULEKH_RESTORE_CID";

const HISTORY_FILE: &str = "cid_history.json";
const PLAIN_FILE: &str = "latest_cid.txt";

/// History entries retained in the sidecar file.
const MAX_HISTORY: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CidEntry {
  cid:      String,
  saved_at: String,
}

/// File-backed CID bookkeeping under the data directory.
#[derive(Debug, Clone)]
pub struct CidRegistry {
  history_path: PathBuf,
  plain_path:   PathBuf,
}

impl CidRegistry {
  pub fn new(data_dir: impl Into<PathBuf>) -> Self {
    let data_dir = data_dir.into();
    Self {
      history_path: data_dir.join(HISTORY_FILE),
      plain_path:   data_dir.join(PLAIN_FILE),
    }
  }

  /// Record `cid` as the latest backup. Writes every sink; succeeds if at
  /// least one of them took the value.
  pub fn record(&self, cid: &str) -> Result<()> {
    let mut wrote_any = false;

    if let Err(error) = self.append_history(cid) {
      warn!(%error, "could not update CID history file");
    } else {
      wrote_any = true;
    }

    let plain_write = self
      .plain_path
      .parent()
      .map_or(Ok(()), fs::create_dir_all)
      .and_then(|()| fs::write(&self.plain_path, cid));
    match plain_write {
      Ok(()) => wrote_any = true,
      Err(error) => warn!(%error, "could not write plain CID file"),
    }

    if wrote_any {
      Ok(())
    } else {
      Err(std::io::Error::other("no CID sink was writable").into())
    }
  }

  /// The operator override from the environment, if set.
  pub fn from_env(&self) -> Option<String> {
    std::env::var(RESTORE_CID_ENV)
      .ok()
      .map(|cid| cid.trim().to_string())
      .filter(|cid| !cid.is_empty())
  }

  /// Newest entry of the sidecar history file.
  pub fn from_history(&self) -> Option<String> {
    let text = fs::read_to_string(&self.history_path).ok()?;
    let entries: Vec<CidEntry> = serde_json::from_str(&text).ok()?;
    entries.last().map(|entry| entry.cid.clone())
  }

  /// The plain-text CID file.
  pub fn from_file(&self) -> Option<String> {
    let cid = fs::read_to_string(&self.plain_path).ok()?;
    let cid = cid.trim().to_string();
    (!cid.is_empty()).then_some(cid)
  }

  /// Resolve the latest CID from the local sinks only, in priority order.
  /// The remote channel interleaves its pin-list query after `from_env`.
  pub fn latest_local(&self) -> Option<String> {
    self
      .from_env()
      .or_else(|| self.from_history())
      .or_else(|| self.from_file())
  }

  fn append_history(&self, cid: &str) -> Result<()> {
    if let Some(parent) = self.history_path.parent() {
      fs::create_dir_all(parent)?;
    }

    let mut entries: Vec<CidEntry> = match fs::read_to_string(&self.history_path)
    {
      Ok(text) => serde_json::from_str(&text).unwrap_or_default(),
      Err(_) => Vec::new(),
    };

    entries.push(CidEntry {
      cid:      cid.to_string(),
      saved_at: Utc::now().to_rfc3339(),
    });
    if entries.len() > MAX_HISTORY {
      let excess = entries.len() - MAX_HISTORY;
      entries.drain(..excess);
    }

    fs::write(&self.history_path, serde_json::to_string_pretty(&entries)?)?;
    debug!(%cid, entries = entries.len(), "appended CID history");
    Ok(())
  }
}
