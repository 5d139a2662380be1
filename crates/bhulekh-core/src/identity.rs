//! Owner identity types and the identity-uniqueness registry.
//!
//! Identity is keyed by the trimmed owner name: one name maps to exactly
//! one (Aadhaar, PAN, customer key) tuple, and each of those values is
//! globally unique across owners. Two distinct real people sharing an
//! identical name string are therefore treated as one identity — a known
//! correctness risk of the design, preserved deliberately.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── National ID newtypes ────────────────────────────────────────────────────

/// A validated 12-digit Aadhaar number, stored without spaces or dashes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Aadhaar(String);

impl Aadhaar {
  /// Parse an Aadhaar number, stripping spaces and dashes first.
  pub fn parse(input: &str) -> Result<Self> {
    let cleaned: String = input
      .chars()
      .filter(|c| *c != ' ' && *c != '-')
      .collect();
    if cleaned.len() == 12 && cleaned.bytes().all(|b| b.is_ascii_digit()) {
      Ok(Self(cleaned))
    } else {
      Err(Error::InvalidAadhaar(input.to_string()))
    }
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Aadhaar {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// A validated PAN card number (`[A-Z]{5}[0-9]{4}[A-Z]`), stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pan(String);

impl Pan {
  /// Parse a PAN number; input case is irrelevant.
  pub fn parse(input: &str) -> Result<Self> {
    let upper = input.trim().to_ascii_uppercase();
    let bytes = upper.as_bytes();
    let well_formed = bytes.len() == 10
      && bytes[..5].iter().all(u8::is_ascii_uppercase)
      && bytes[5..9].iter().all(u8::is_ascii_digit)
      && bytes[9].is_ascii_uppercase();
    if well_formed {
      Ok(Self(upper))
    } else {
      Err(Error::InvalidPan(input.to_string()))
    }
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Pan {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Registry types ──────────────────────────────────────────────────────────

/// The identity tuple registered for one owner name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerIdentity {
  pub aadhaar:      Aadhaar,
  pub pan:          Pan,
  pub customer_key: String,
}

/// An identity tuple joined with its owner name, for lookups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnerProfile {
  pub name:         String,
  pub aadhaar:      Aadhaar,
  pub pan:          Pan,
  pub customer_key: String,
}

/// Trim the incidental whitespace that keys the registry.
pub fn normalize_owner(name: &str) -> String { name.trim().to_string() }

/// Owner-name-keyed identity registry with uniqueness-enforcing reverse
/// maps. `BTreeMap` keeps the serialized snapshot deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityRegistry {
  owners:          BTreeMap<String, OwnerIdentity>,
  by_aadhaar:      BTreeMap<String, String>,
  by_pan:          BTreeMap<String, String>,
  by_customer_key: BTreeMap<String, String>,
}

impl IdentityRegistry {
  /// Pure precondition check: would `register_or_verify` with the same
  /// arguments succeed? Lets the ledger order all checks ahead of any
  /// mutation.
  pub fn check_compatible(
    &self,
    owner: &str,
    aadhaar: &Aadhaar,
    pan: &Pan,
  ) -> Result<()> {
    let owner = normalize_owner(owner);

    if let Some(existing) = self.owners.get(&owner) {
      if existing.aadhaar != *aadhaar {
        return Err(Error::IdentityMismatch {
          owner,
          field: "Aadhaar",
          registered: existing.aadhaar.to_string(),
          provided: aadhaar.to_string(),
        });
      }
      if existing.pan != *pan {
        return Err(Error::IdentityMismatch {
          owner,
          field: "PAN",
          registered: existing.pan.to_string(),
          provided: pan.to_string(),
        });
      }
      return Ok(());
    }

    if let Some(holder) = self.by_aadhaar.get(aadhaar.as_str())
      && *holder != owner
    {
      return Err(Error::AadhaarTaken {
        aadhaar: aadhaar.to_string(),
        owner:   holder.clone(),
      });
    }
    if let Some(holder) = self.by_pan.get(pan.as_str())
      && *holder != owner
    {
      return Err(Error::PanTaken {
        pan:   pan.to_string(),
        owner: holder.clone(),
      });
    }
    Ok(())
  }

  /// Register a new owner, or verify that a returning owner presented the
  /// same identity tuple as before. Returns the registered tuple.
  ///
  /// Checked before any mutation; an `Err` leaves the registry unchanged.
  pub fn register_or_verify(
    &mut self,
    owner: &str,
    aadhaar: &Aadhaar,
    pan: &Pan,
  ) -> Result<OwnerIdentity> {
    self.check_compatible(owner, aadhaar, pan)?;
    let owner = normalize_owner(owner);

    if let Some(existing) = self.owners.get(&owner) {
      return Ok(existing.clone());
    }

    let identity = OwnerIdentity {
      aadhaar:      aadhaar.clone(),
      pan:          pan.clone(),
      customer_key: self.fresh_customer_key(),
    };

    self
      .by_aadhaar
      .insert(identity.aadhaar.to_string(), owner.clone());
    self.by_pan.insert(identity.pan.to_string(), owner.clone());
    self
      .by_customer_key
      .insert(identity.customer_key.clone(), owner.clone());
    self.owners.insert(owner, identity.clone());

    Ok(identity)
  }

  /// Reinstate an identity tuple carried by a surviving record during
  /// chain recovery, bypassing the conflict checks — recovery trusts the
  /// records it decided to keep. Idempotent for a given owner.
  pub(crate) fn restore(&mut self, owner: &str, identity: OwnerIdentity) {
    let owner = normalize_owner(owner);
    self
      .by_aadhaar
      .insert(identity.aadhaar.to_string(), owner.clone());
    self.by_pan.insert(identity.pan.to_string(), owner.clone());
    self
      .by_customer_key
      .insert(identity.customer_key.clone(), owner.clone());
    self.owners.insert(owner, identity);
  }

  /// Generate a customer key of the form `CUST-XXXXXXXX`, retrying on the
  /// (astronomically unlikely) collision.
  fn fresh_customer_key(&self) -> String {
    loop {
      let id = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
      let key = format!("CUST-{}", &id[..8]);
      if !self.by_customer_key.contains_key(&key) {
        return key;
      }
    }
  }

  /// The identity tuple registered for `owner`, if any.
  pub fn identity_of(&self, owner: &str) -> Option<&OwnerIdentity> {
    self.owners.get(&normalize_owner(owner))
  }

  /// Resolve a customer key to the full owner profile.
  pub fn profile_by_customer_key(
    &self,
    customer_key: &str,
  ) -> Option<OwnerProfile> {
    let name = self.by_customer_key.get(customer_key)?;
    let identity = self.owners.get(name)?;
    Some(OwnerProfile {
      name:         name.clone(),
      aadhaar:      identity.aadhaar.clone(),
      pan:          identity.pan.clone(),
      customer_key: identity.customer_key.clone(),
    })
  }

  /// Number of distinct registered owners.
  pub fn owner_count(&self) -> usize { self.owners.len() }
}
