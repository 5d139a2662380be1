//! Record types — one immutable entry in the property ledger.
//!
//! A record is never updated after it is appended. Its content hash binds
//! the five identity-bearing fields together and to the predecessor record,
//! and doubles as the record's identity.

use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::{
  Result,
  canonical::to_canonical_string,
  identity::{Aadhaar, Pan},
};

/// `subject_key` of the genesis record; never a valid property key.
pub const GENESIS_KEY: &str = "GENESIS";

/// `link_hash` sentinel of the genesis record.
pub const GENESIS_LINK: &str = "0";

// ─── Payload sub-types ───────────────────────────────────────────────────────

/// Administrative location of a property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
  pub village:  String,
  pub taluk:    String,
  pub district: String,
  pub state:    String,
}

/// Physical description of the land itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandDetails {
  /// Free text, e.g. "2 acres" or "500 sq ft".
  pub area:     String,
  /// Free text, e.g. "agricultural", "residential".
  pub category: String,
}

/// Payload of the genesis record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenesisPayload {
  pub message: String,
}

/// Payload of a first-time property registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationPayload {
  pub owner:        String,
  pub customer_key: String,
  pub aadhaar:      Aadhaar,
  pub pan:          Pan,
  pub address:      String,
  pub pincode:      String,
  /// Registered value in INR.
  pub value:        f64,
  pub survey_no:    String,
  /// Record of Rights, Tenancy and Crops number.
  pub rtc_no:       String,
  pub location:     Location,
  pub land:         LandDetails,
  pub description:  String,
}

/// Payload of an ownership transfer (sale, gift, inheritance, ...).
///
/// Snapshots the full identity of both parties so the record is
/// self-contained even if the registries are later rebuilt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferPayload {
  pub transfer_reason:           String,
  pub previous_owner:            String,
  pub previous_owner_aadhaar:    Aadhaar,
  pub previous_owner_pan:        Pan,
  pub previous_customer_key:     String,
  pub new_owner:                 String,
  pub new_owner_customer_key:    String,
  pub new_owner_aadhaar:         Aadhaar,
  pub new_owner_pan:             Pan,
  /// Consideration for this transfer, in INR.
  pub transfer_value:            f64,
  /// Tracked value after the transfer: `transfer_value + stamp_duty +
  /// registration_fee`. Tracks cost basis, not market price.
  pub new_property_value:        f64,
  pub address:                   String,
  pub pincode:                   String,
  pub survey_no:                 String,
  pub rtc_no:                    String,
  pub stamp_duty:                f64,
  pub registration_fee:          f64,
  /// Heir's relationship to the deceased; inheritance transfers only.
  pub relationship:              Option<String>,
  /// Inheritance transfers only.
  pub legal_heir_certificate_no: Option<String>,
}

// ─── Payload ─────────────────────────────────────────────────────────────────

/// The typed payload of a record. The variant name serves as the `kind`
/// discriminant in the serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
  Genesis(GenesisPayload),
  Registration(RegistrationPayload),
  Transfer(TransferPayload),
}

impl Payload {
  /// The discriminant string used in the serialized `kind` tag.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Genesis(_) => "genesis",
      Self::Registration(_) => "registration",
      Self::Transfer(_) => "transfer",
    }
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// One immutable, hash-linked entry in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
  /// Position in the chain; 0 is the genesis record.
  pub sequence_index: u64,
  /// RFC 3339 timestamp, frozen at append time. Stored as the exact string
  /// that entered the hash so re-verification after restore can never be
  /// broken by re-serialization.
  pub created_at:     String,
  pub payload:        Payload,
  /// Content hash of the predecessor record ([`GENESIS_LINK`] for index 0).
  pub link_hash:      String,
  /// Property key this record concerns ([`GENESIS_KEY`] for index 0).
  pub subject_key:    String,
  /// SHA-256 hex digest over the canonical encoding of the five fields
  /// above; computed at construction.
  pub content_hash:   String,
}

impl Record {
  /// Construct a record and compute its content hash.
  pub fn new(
    sequence_index: u64,
    created_at: String,
    payload: Payload,
    link_hash: String,
    subject_key: String,
  ) -> Result<Self> {
    let mut record = Self {
      sequence_index,
      created_at,
      payload,
      link_hash,
      subject_key,
      content_hash: String::new(),
    };
    record.content_hash = record.compute_content_hash()?;
    Ok(record)
  }

  /// The first record of a fresh chain.
  pub fn genesis(created_at: String) -> Result<Self> {
    Self::new(
      0,
      created_at,
      Payload::Genesis(GenesisPayload {
        message: "Property Ledger Genesis Record".to_string(),
      }),
      GENESIS_LINK.to_string(),
      GENESIS_KEY.to_string(),
    )
  }

  /// Recompute the content hash from the current field values.
  ///
  /// Pure and repeatable: the same logical content always yields the same
  /// 64-character lowercase hex digest, regardless of construction order.
  pub fn compute_content_hash(&self) -> Result<String> {
    let input = json!({
      "sequence_index": self.sequence_index,
      "created_at": self.created_at,
      "payload": serde_json::to_value(&self.payload)?,
      "link_hash": self.link_hash,
      "subject_key": self.subject_key,
    });
    let canonical = to_canonical_string(&input);
    let digest = Sha256::digest(canonical.as_bytes());
    Ok(hex::encode(digest))
  }

  /// Confirm the stored hash matches a fresh recomputation.
  ///
  /// A mismatch signals tampering or corruption; the caller decides whether
  /// that is fatal or triggers recovery.
  pub fn verify(&self) -> Result<()> {
    let computed = self.compute_content_hash()?;
    if computed != self.content_hash {
      return Err(crate::Error::HashMismatch {
        index:    self.sequence_index,
        stored:   self.content_hash.clone(),
        computed,
      });
    }
    Ok(())
  }
}
