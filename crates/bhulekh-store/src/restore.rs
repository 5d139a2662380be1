//! Startup restore and post-mutation backup drivers.

use bhulekh_codec::{Cipher, RestoreOutcome, decode, encode};
use bhulekh_core::Ledger;
use tracing::{debug, info, warn};

use crate::{BackupChannel, BackupMeta, Result};

/// How the startup ledger came to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  /// Every record restored and re-verified.
  Full,
  /// The blob's chain was damaged; `dropped` records were discarded.
  Partial { dropped: usize },
  /// No channel produced a usable blob; this is a brand-new chain.
  Fresh,
}

/// The result of [`restore_ledger`].
#[derive(Debug)]
pub struct RestoredLedger {
  pub ledger:  Ledger,
  /// Name of the channel that produced the blob, or `"fresh"`.
  pub source:  &'static str,
  pub outcome: Outcome,
}

/// Build the startup ledger from the first channel that yields a decodable
/// blob, in the order given (the caller lists SQLite before the remote
/// channel before the local file). A channel that has nothing, fails to
/// load, or holds an undecodable blob is logged and skipped. When every
/// channel is exhausted a fresh genesis ledger is returned; restore never
/// fails outright.
pub fn restore_ledger(
  channels: &[Box<dyn BackupChannel>],
  cipher: &Cipher,
) -> Result<RestoredLedger> {
  for channel in channels {
    let blob = match channel.load_latest() {
      Ok(Some(blob)) => blob,
      Ok(None) => {
        debug!(channel = channel.name(), "channel has no backup");
        continue;
      }
      Err(error) => {
        warn!(channel = channel.name(), %error, "channel load failed");
        continue;
      }
    };

    match decode(&blob, cipher) {
      Ok(RestoreOutcome::Full(ledger)) => {
        info!(
          channel = channel.name(),
          records = ledger.records().len(),
          "ledger restored"
        );
        return Ok(RestoredLedger {
          ledger,
          source: channel.name(),
          outcome: Outcome::Full,
        });
      }
      Ok(RestoreOutcome::Partial { ledger, dropped }) => {
        warn!(
          channel = channel.name(),
          kept = ledger.records().len(),
          dropped,
          "ledger partially recovered; trailing records were discarded"
        );
        return Ok(RestoredLedger {
          ledger,
          source: channel.name(),
          outcome: Outcome::Partial { dropped },
        });
      }
      Err(error) => {
        warn!(channel = channel.name(), %error, "blob failed to decode");
      }
    }
  }

  info!("no usable backup found; starting a fresh ledger");
  Ok(RestoredLedger {
    ledger:  Ledger::new()?,
    source:  "fresh",
    outcome: Outcome::Fresh,
  })
}

/// Per-channel results of a [`backup_ledger`] broadcast.
#[derive(Debug, Default)]
pub struct BackupReport {
  pub succeeded: Vec<&'static str>,
  pub failed:    Vec<(&'static str, String)>,
}

impl BackupReport {
  pub fn any_succeeded(&self) -> bool { !self.succeeded.is_empty() }
}

/// Encode the ledger once and offer the blob to every channel. A channel
/// failure is recorded, not fatal; the caller decides whether an
/// all-channels-failed report warrants surfacing.
pub fn backup_ledger(
  ledger: &Ledger,
  channels: &[Box<dyn BackupChannel>],
  meta: &BackupMeta,
  cipher: &Cipher,
) -> Result<BackupReport> {
  let blob = encode(ledger, cipher)?;

  let mut report = BackupReport::default();
  for channel in channels {
    match channel.save(&blob, meta) {
      Ok(()) => {
        debug!(channel = channel.name(), "backup saved");
        report.succeeded.push(channel.name());
      }
      Err(error) => {
        warn!(channel = channel.name(), %error, "backup failed");
        report.failed.push((channel.name(), error.to_string()));
      }
    }
  }
  Ok(report)
}
