//! Full-ledger snapshots: the one JSON shape every backup channel stores.
//!
//! A snapshot carries the record chain together with the derived indices
//! and registries, so a restore does not have to replay history to answer
//! queries. The chain is still re-verified hash by hash on every decode;
//! the indices are trusted only after the chain checks out.

use std::collections::BTreeMap;

use bhulekh_core::{
  Error as CoreError, Ledger, Record, identity::IdentityRegistry,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{Cipher, Result};

/// The serialized form of a complete ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
  pub records:         Vec<Record>,
  pub property_index:  BTreeMap<String, Vec<u64>>,
  pub identity:        IdentityRegistry,
  pub survey_registry: BTreeMap<String, String>,
  /// RFC 3339; when this snapshot was taken, not when it was stored.
  pub saved_at:        String,
}

impl Snapshot {
  pub fn of(ledger: &Ledger) -> Self {
    Self {
      records:         ledger.records().to_vec(),
      property_index:  ledger.property_index().clone(),
      identity:        ledger.identity().clone(),
      survey_registry: ledger.survey_registry().clone(),
      saved_at:        Utc::now().to_rfc3339(),
    }
  }
}

/// What a decode produced.
#[derive(Debug)]
pub enum RestoreOutcome {
  /// Every record verified and linked; nothing was lost.
  Full(Ledger),
  /// The chain was damaged; `ledger` is the longest verifiable prefix and
  /// `dropped` records after it were discarded.
  Partial { ledger: Ledger, dropped: usize },
}

impl RestoreOutcome {
  pub fn ledger(&self) -> &Ledger {
    match self {
      Self::Full(ledger) => ledger,
      Self::Partial { ledger, .. } => ledger,
    }
  }

  pub fn into_ledger(self) -> Ledger {
    match self {
      Self::Full(ledger) => ledger,
      Self::Partial { ledger, .. } => ledger,
    }
  }
}

/// Serialize and encrypt a ledger into the storage text form.
pub fn encode(ledger: &Ledger, cipher: &Cipher) -> Result<String> {
  let json = serde_json::to_string(&Snapshot::of(ledger))?;
  Ok(cipher.encrypt(&json))
}

/// Decrypt, parse, and re-verify a stored blob.
///
/// A chain that fails verification mid-way is salvaged: the longest prefix
/// of self-verifying, correctly linked records is kept, the property index
/// is rebuilt from that prefix, and the result is reported as
/// [`RestoreOutcome::Partial`]. Blobs that cannot be decrypted or parsed at
/// all, or whose genesis record is itself corrupt, are hard errors.
pub fn decode(blob: &str, cipher: &Cipher) -> Result<RestoreOutcome> {
  let json = cipher.decrypt(blob)?;
  let snapshot: Snapshot = serde_json::from_str(&json)?;

  match Ledger::from_parts(
    snapshot.records.clone(),
    snapshot.property_index,
    snapshot.identity,
    snapshot.survey_registry,
  ) {
    Ok(ledger) => Ok(RestoreOutcome::Full(ledger)),
    Err(
      CoreError::HashMismatch { .. }
      | CoreError::SequenceMismatch { .. }
      | CoreError::BrokenLink { .. }
      | CoreError::IndexOutOfRange { .. }
      | CoreError::IndexNotRegistration(_),
    ) => {
      let (ledger, dropped) = Ledger::recover(snapshot.records)?;
      if dropped == 0 {
        // The chain was fine; only the stored index was malformed and has
        // now been rebuilt.
        Ok(RestoreOutcome::Full(ledger))
      } else {
        Ok(RestoreOutcome::Partial { ledger, dropped })
      }
    }
    Err(other) => Err(other.into()),
  }
}
