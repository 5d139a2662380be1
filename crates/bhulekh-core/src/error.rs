//! Error types for `bhulekh-core`.
//!
//! Every validation, conflict, not-found, and integrity condition gets its
//! own variant so callers can branch on kind instead of string-matching
//! messages. All mutating operations check their preconditions before
//! touching any state, so an `Err` always means the ledger is unchanged.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  // ── Validation ────────────────────────────────────────────────────────
  #[error("invalid Aadhaar number {0:?}: must be exactly 12 digits")]
  InvalidAadhaar(String),

  #[error("invalid PAN number {0:?}: must match ABCDE1234F")]
  InvalidPan(String),

  #[error("property value must be positive, got {0}")]
  NonPositiveValue(f64),

  // ── Conflicts ─────────────────────────────────────────────────────────
  #[error("property {0:?} is already registered; use a transfer for ownership changes")]
  PropertyExists(String),

  #[error(
    "identity mismatch: owner {owner:?} is already registered with \
     {field} {registered}, but {provided} was provided"
  )]
  IdentityMismatch {
    owner:      String,
    /// `"Aadhaar"` or `"PAN"`.
    field:      &'static str,
    registered: String,
    provided:   String,
  },

  #[error("Aadhaar {aadhaar} is already registered to {owner:?}")]
  AadhaarTaken { aadhaar: String, owner: String },

  #[error("PAN {pan} is already registered to {owner:?}")]
  PanTaken { pan: String, owner: String },

  #[error("survey number {survey_no:?} is already registered to property {property_key:?}")]
  SurveyTaken {
    survey_no:    String,
    property_key: String,
  },

  #[error("cannot transfer property to its current owner {0:?}")]
  SelfTransfer(String),

  #[error(
    "deceased owner mismatch: property {property_key:?} is owned by \
     {current_owner:?}, not {claimed:?}"
  )]
  DeceasedOwnerMismatch {
    property_key:  String,
    current_owner: String,
    claimed:       String,
  },

  // ── Not found ─────────────────────────────────────────────────────────
  #[error("property not found: {0:?}")]
  PropertyNotFound(String),

  #[error("record {sequence_index} does not belong to property {property_key:?}")]
  RecordNotFound {
    property_key:   String,
    sequence_index: u64,
  },

  // ── Integrity ─────────────────────────────────────────────────────────
  #[error(
    "hash mismatch at record {index}: stored {stored}, recomputed {computed}"
  )]
  HashMismatch {
    index:    u64,
    stored:   String,
    computed: String,
  },

  #[error(
    "record at position {position} carries sequence_index {stored}"
  )]
  SequenceMismatch { position: u64, stored: u64 },

  #[error(
    "broken link at record {index}: link_hash {link_hash} does not match \
     predecessor hash {previous_hash}"
  )]
  BrokenLink {
    index:         u64,
    link_hash:     String,
    previous_hash: String,
  },

  #[error("ledger is empty: a chain must start with a genesis record")]
  EmptyChain,

  #[error(
    "property index for {property_key:?} references record {index}, but the \
     chain has only {chain_len} records"
  )]
  IndexOutOfRange {
    property_key: String,
    index:        u64,
    chain_len:    usize,
  },

  #[error("property index for {0:?} does not start with a registration record")]
  IndexNotRegistration(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
