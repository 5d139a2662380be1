//! The [`Ledger`] — an append-only, hash-linked sequence of records with
//! per-property indexing and identity/survey uniqueness registries.
//!
//! One authoritative instance exists per process. There is no internal
//! locking: the caller serializes all mutating calls, and reads are only
//! safe while no append is in flight. Corrections are modeled as new
//! transfer records; nothing is ever deleted or edited in place.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  identity::{
    Aadhaar, IdentityRegistry, OwnerIdentity, OwnerProfile, Pan,
    normalize_owner,
  },
  record::{
    GENESIS_KEY, LandDetails, Location, Payload, Record, RegistrationPayload,
    TransferPayload,
  },
  search::{self, SearchHit},
  state::PropertyState,
};

/// Stamp duty charged when no explicit amount is supplied: 2 % of the
/// effective transfer value.
pub const STAMP_DUTY_RATE: f64 = 0.02;

/// Registration fee charged when no explicit amount is supplied: 5 % of the
/// effective transfer value.
pub const REGISTRATION_FEE_RATE: f64 = 0.05;

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`Ledger::register_property`]. National IDs are accepted as raw
/// strings and validated/normalized by the ledger.
#[derive(Debug, Clone)]
pub struct NewRegistration {
  pub property_key: String,
  pub owner:        String,
  pub address:      String,
  pub pincode:      String,
  /// Registered value in INR; must be positive.
  pub value:        f64,
  pub aadhaar:      String,
  pub pan:          String,
  pub survey_no:    String,
  pub rtc_no:       String,
  pub location:     Location,
  pub land:         LandDetails,
  pub description:  String,
}

impl NewRegistration {
  /// Convenience constructor with the optional descriptive fields empty.
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    property_key: impl Into<String>,
    owner: impl Into<String>,
    address: impl Into<String>,
    pincode: impl Into<String>,
    value: f64,
    aadhaar: impl Into<String>,
    pan: impl Into<String>,
    survey_no: impl Into<String>,
  ) -> Self {
    Self {
      property_key: property_key.into(),
      owner: owner.into(),
      address: address.into(),
      pincode: pincode.into(),
      value,
      aadhaar: aadhaar.into(),
      pan: pan.into(),
      survey_no: survey_no.into(),
      rtc_no: String::new(),
      location: Location::default(),
      land: LandDetails::default(),
      description: String::new(),
    }
  }
}

/// Input to [`Ledger::transfer_property`].
#[derive(Debug, Clone)]
pub struct NewTransfer {
  pub property_key:     String,
  pub new_owner:        String,
  pub aadhaar:          String,
  pub pan:              String,
  /// Consideration in INR; defaults to the property's current tracked
  /// value.
  pub transfer_value:   Option<f64>,
  /// e.g. `"sale"`, `"gift"`, `"inheritance"`.
  pub transfer_reason:  String,
  /// Defaults to [`STAMP_DUTY_RATE`] of the effective transfer value.
  pub stamp_duty:       Option<f64>,
  /// Defaults to [`REGISTRATION_FEE_RATE`] of the effective transfer value.
  pub registration_fee: Option<f64>,
}

impl NewTransfer {
  pub fn new(
    property_key: impl Into<String>,
    new_owner: impl Into<String>,
    aadhaar: impl Into<String>,
    pan: impl Into<String>,
  ) -> Self {
    Self {
      property_key:     property_key.into(),
      new_owner:        new_owner.into(),
      aadhaar:          aadhaar.into(),
      pan:              pan.into(),
      transfer_value:   None,
      transfer_reason:  "sale".to_string(),
      stamp_duty:       None,
      registration_fee: None,
    }
  }
}

/// Input to [`Ledger::inherit_property`].
#[derive(Debug, Clone)]
pub struct NewInheritance {
  pub property_key:              String,
  /// Must match the property's current owner (case/whitespace-insensitive).
  pub deceased_owner:            String,
  pub heir:                      String,
  pub aadhaar:                   String,
  pub pan:                       String,
  pub relationship:              String,
  pub legal_heir_certificate_no: String,
}

/// Ledger statistics for dashboards and CLI output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerStats {
  pub total_records:    usize,
  pub total_properties: usize,
  pub latest_hash:      String,
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

/// The ordered, hash-linked collection of records plus derived indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
  records:         Vec<Record>,
  /// Property key → sequence indices, registration first, chronological.
  property_index:  BTreeMap<String, Vec<u64>>,
  identity:        IdentityRegistry,
  /// Survey number → property key; one survey number per property for the
  /// life of the ledger.
  survey_registry: BTreeMap<String, String>,
}

fn now_rfc3339() -> String { Utc::now().to_rfc3339() }

impl Ledger {
  /// A fresh ledger containing only the genesis record.
  pub fn new() -> Result<Self> {
    Ok(Self {
      records:         vec![Record::genesis(now_rfc3339())?],
      property_index:  BTreeMap::new(),
      identity:        IdentityRegistry::default(),
      survey_registry: BTreeMap::new(),
    })
  }

  // ── Mutation ──────────────────────────────────────────────────────────

  /// Register a new property. Preconditions, first failure wins: unique
  /// property key, Aadhaar format, PAN format, positive value, consistent
  /// owner identity, unused survey number. Nothing is mutated on failure.
  pub fn register_property(
    &mut self,
    input: NewRegistration,
  ) -> Result<&Record> {
    if self.property_index.contains_key(&input.property_key) {
      return Err(Error::PropertyExists(input.property_key));
    }

    let aadhaar = Aadhaar::parse(&input.aadhaar)?;
    let pan = Pan::parse(&input.pan)?;

    if input.value <= 0.0 {
      return Err(Error::NonPositiveValue(input.value));
    }

    // Pure identity check first so an identity conflict is reported ahead
    // of a survey conflict, then the survey check, then the actual
    // (now infallible) registration. Keeps "no partial state on error".
    self.identity.check_compatible(&input.owner, &aadhaar, &pan)?;

    let survey_no = input.survey_no.trim().to_string();
    if let Some(existing) = self.survey_registry.get(&survey_no) {
      return Err(Error::SurveyTaken {
        survey_no,
        property_key: existing.clone(),
      });
    }

    let identity =
      self.identity.register_or_verify(&input.owner, &aadhaar, &pan)?;

    let payload = Payload::Registration(RegistrationPayload {
      owner: input.owner,
      customer_key: identity.customer_key,
      aadhaar,
      pan,
      address: input.address,
      pincode: input.pincode,
      value: input.value,
      survey_no: input.survey_no.clone(),
      rtc_no: input.rtc_no,
      location: input.location,
      land: input.land,
      description: input.description,
    });

    let record = self.append(payload, input.property_key.clone())?;
    self
      .property_index
      .insert(input.property_key.clone(), vec![record]);
    self.survey_registry.insert(survey_no, input.property_key);

    Ok(&self.records[record as usize])
  }

  /// Transfer a property to a new owner. The effective transfer value
  /// defaults to the current tracked value; omitted fees default to
  /// [`STAMP_DUTY_RATE`] and [`REGISTRATION_FEE_RATE`] of it. The tracked
  /// value after the transfer is `transfer_value + stamp_duty +
  /// registration_fee` — transaction costs compound into the tracked
  /// value by design (cost basis, not market price).
  pub fn transfer_property(&mut self, input: NewTransfer) -> Result<&Record> {
    self.transfer_inner(input, None, None)
  }

  /// Transfer through inheritance: a transfer with
  /// `transfer_reason = "inheritance"` whose named deceased owner must
  /// match the property's current owner.
  pub fn inherit_property(
    &mut self,
    input: NewInheritance,
  ) -> Result<&Record> {
    let state = self.current_state(&input.property_key)?;

    if !same_owner(&state.owner, &input.deceased_owner) {
      return Err(Error::DeceasedOwnerMismatch {
        property_key:  input.property_key,
        current_owner: state.owner,
        claimed:       input.deceased_owner,
      });
    }

    let transfer = NewTransfer {
      property_key:     input.property_key,
      new_owner:        input.heir,
      aadhaar:          input.aadhaar,
      pan:              input.pan,
      transfer_value:   None,
      transfer_reason:  "inheritance".to_string(),
      stamp_duty:       None,
      registration_fee: None,
    };
    self.transfer_inner(
      transfer,
      Some(input.relationship),
      Some(input.legal_heir_certificate_no),
    )
  }

  fn transfer_inner(
    &mut self,
    input: NewTransfer,
    relationship: Option<String>,
    legal_heir_certificate_no: Option<String>,
  ) -> Result<&Record> {
    let state = self.current_state(&input.property_key)?;

    let aadhaar = Aadhaar::parse(&input.aadhaar)?;
    let pan = Pan::parse(&input.pan)?;

    if let Some(v) = input.transfer_value
      && v <= 0.0
    {
      return Err(Error::NonPositiveValue(v));
    }

    self
      .identity
      .check_compatible(&input.new_owner, &aadhaar, &pan)?;

    if same_owner(&state.owner, &input.new_owner) {
      return Err(Error::SelfTransfer(state.owner));
    }

    let identity =
      self
        .identity
        .register_or_verify(&input.new_owner, &aadhaar, &pan)?;

    let transfer_value = input.transfer_value.unwrap_or(state.value);
    let stamp_duty = input
      .stamp_duty
      .unwrap_or(transfer_value * STAMP_DUTY_RATE);
    let registration_fee = input
      .registration_fee
      .unwrap_or(transfer_value * REGISTRATION_FEE_RATE);
    let new_property_value = transfer_value + stamp_duty + registration_fee;

    let payload = Payload::Transfer(TransferPayload {
      transfer_reason: input.transfer_reason,
      previous_owner: state.owner,
      previous_owner_aadhaar: state.aadhaar,
      previous_owner_pan: state.pan,
      previous_customer_key: state.customer_key,
      new_owner: input.new_owner,
      new_owner_customer_key: identity.customer_key,
      new_owner_aadhaar: aadhaar,
      new_owner_pan: pan,
      transfer_value,
      new_property_value,
      address: state.address,
      pincode: state.pincode,
      survey_no: state.survey_no,
      rtc_no: state.rtc_no,
      stamp_duty,
      registration_fee,
      relationship,
      legal_heir_certificate_no,
    });

    let record = self.append(payload, input.property_key.clone())?;
    self
      .property_index
      .get_mut(&input.property_key)
      .ok_or(Error::PropertyNotFound(input.property_key))?
      .push(record);

    Ok(&self.records[record as usize])
  }

  /// Append a record linked to the current tip; returns its index.
  fn append(&mut self, payload: Payload, subject_key: String) -> Result<u64> {
    let link_hash = self
      .records
      .last()
      .map(|r| r.content_hash.clone())
      .ok_or(Error::EmptyChain)?;
    let index = self.records.len() as u64;
    let record =
      Record::new(index, now_rfc3339(), payload, link_hash, subject_key)?;
    self.records.push(record);
    Ok(index)
  }

  // ── Queries ───────────────────────────────────────────────────────────

  /// The flattened current state of a property.
  pub fn current_state(&self, property_key: &str) -> Result<PropertyState> {
    let refs = self.records_for(property_key)?;
    PropertyState::fold(&refs)
      .ok_or_else(|| Error::IndexNotRegistration(property_key.to_string()))
  }

  /// The full ordered history of a property, as value copies the caller
  /// may freely mutate (e.g. to redact fields before display).
  pub fn history(&self, property_key: &str) -> Result<Vec<Record>> {
    Ok(
      self
        .records_for(property_key)?
        .into_iter()
        .cloned()
        .collect(),
    )
  }

  /// One record for a property: the one at `sequence_index` if given (it
  /// must belong to the property), otherwise the latest.
  pub fn record_for(
    &self,
    property_key: &str,
    sequence_index: Option<u64>,
  ) -> Result<Record> {
    let indices = self
      .property_index
      .get(property_key)
      .ok_or_else(|| Error::PropertyNotFound(property_key.to_string()))?;

    let index = match sequence_index {
      Some(i) if indices.contains(&i) => i,
      Some(i) => {
        return Err(Error::RecordNotFound {
          property_key:   property_key.to_string(),
          sequence_index: i,
        });
      }
      None => *indices.last().ok_or(Error::EmptyChain)?,
    };
    Ok(self.records[index as usize].clone())
  }

  /// Current states of all registered properties; genesis excluded.
  pub fn properties(&self) -> Vec<PropertyState> {
    self
      .property_index
      .keys()
      .filter_map(|key| self.current_state(key).ok())
      .collect()
  }

  /// Resolve a customer key to the owner's full profile.
  pub fn owner_by_customer_key(
    &self,
    customer_key: &str,
  ) -> Option<OwnerProfile> {
    self.identity.profile_by_customer_key(customer_key)
  }

  /// Properties whose current owner name matches `owner`
  /// case-insensitively.
  pub fn search_by_owner(&self, owner: &str) -> Vec<PropertyState> {
    let needle = normalize_owner(owner).to_lowercase();
    self
      .properties()
      .into_iter()
      .filter(|s| s.owner.trim().to_lowercase() == needle)
      .collect()
  }

  /// Properties whose current state matches all three identity fields
  /// exactly. Inputs are normalized (Aadhaar stripped, PAN uppercased)
  /// but not validated — a malformed input simply matches nothing.
  pub fn search_by_identity(
    &self,
    customer_key: &str,
    aadhaar: &str,
    pan: &str,
  ) -> Vec<PropertyState> {
    let aadhaar: String = aadhaar
      .chars()
      .filter(|c| *c != ' ' && *c != '-')
      .collect();
    let pan = pan.trim().to_ascii_uppercase();

    self
      .properties()
      .into_iter()
      .filter(|s| {
        s.customer_key == customer_key
          && s.aadhaar.as_str() == aadhaar
          && s.pan.as_str() == pan
      })
      .collect()
  }

  /// Weighted fuzzy search across property, identity, and location fields.
  /// See [`crate::search`] for the scoring tiers.
  pub fn unified_search(&self, query: &str) -> Vec<SearchHit> {
    search::unified_search(self, query)
  }

  // ── Validation ────────────────────────────────────────────────────────

  /// Walk the chain recomputing every content hash, checking every link,
  /// and checking that each record's stored `sequence_index` matches its
  /// actual position. Returns the first discrepancy with its index and
  /// the offending values. A genesis-only chain is valid iff the genesis
  /// self-verifies.
  ///
  /// The position check matters because the content hash is unkeyed: a
  /// forged record can self-verify with any `sequence_index` it likes,
  /// and the index lookups trust that value.
  pub fn validate(&self) -> Result<()> {
    let first = self.records.first().ok_or(Error::EmptyChain)?;
    first.verify()?;
    if first.sequence_index != 0 {
      return Err(Error::SequenceMismatch {
        position: 0,
        stored:   first.sequence_index,
      });
    }

    for (position, window) in self.records.windows(2).enumerate() {
      let (previous, current) = (&window[0], &window[1]);
      current.verify()?;
      let expected = (position + 1) as u64;
      if current.sequence_index != expected {
        return Err(Error::SequenceMismatch {
          position: expected,
          stored:   current.sequence_index,
        });
      }
      if current.link_hash != previous.content_hash {
        return Err(Error::BrokenLink {
          index:         current.sequence_index,
          link_hash:     current.link_hash.clone(),
          previous_hash: previous.content_hash.clone(),
        });
      }
    }
    Ok(())
  }

  /// Ledger statistics: record count, property count, tip hash.
  pub fn stats(&self) -> LedgerStats {
    LedgerStats {
      total_records:    self.records.len(),
      total_properties: self.property_index.len(),
      latest_hash:      self
        .records
        .last()
        .map(|r| r.content_hash.clone())
        .unwrap_or_default(),
    }
  }

  // ── Accessors for the codec ───────────────────────────────────────────

  pub fn records(&self) -> &[Record] { &self.records }

  pub fn property_index(&self) -> &BTreeMap<String, Vec<u64>> {
    &self.property_index
  }

  pub fn identity(&self) -> &IdentityRegistry { &self.identity }

  pub fn survey_registry(&self) -> &BTreeMap<String, String> {
    &self.survey_registry
  }

  // ── Reconstruction ────────────────────────────────────────────────────

  /// Rebuild a ledger from restored parts, refusing anything that fails
  /// chain validation or whose property index references records that do
  /// not exist or do not start with a registration.
  pub fn from_parts(
    records: Vec<Record>,
    property_index: BTreeMap<String, Vec<u64>>,
    identity: IdentityRegistry,
    survey_registry: BTreeMap<String, String>,
  ) -> Result<Self> {
    let ledger = Self {
      records,
      property_index,
      identity,
      survey_registry,
    };
    ledger.validate()?;

    for (key, indices) in &ledger.property_index {
      for &index in indices {
        if index as usize >= ledger.records.len() {
          return Err(Error::IndexOutOfRange {
            property_key: key.clone(),
            index,
            chain_len: ledger.records.len(),
          });
        }
      }
      let starts_with_registration = indices
        .first()
        .map(|&i| {
          matches!(
            ledger.records[i as usize].payload,
            Payload::Registration(_)
          )
        })
        .unwrap_or(false);
      if !starts_with_registration {
        return Err(Error::IndexNotRegistration(key.clone()));
      }
    }

    Ok(ledger)
  }

  /// Salvage the longest verifiably consistent prefix of `records`, then
  /// rebuild every derived structure — the property index and the
  /// identity/survey registries — from that prefix alone. A record is
  /// kept only if it self-verifies, links to its predecessor, and stores
  /// the `sequence_index` matching its actual position; the transfer
  /// payload's identity snapshots make the registries recoverable without
  /// replaying dropped records.
  ///
  /// Returns the ledger and the number of records dropped. Fails if not
  /// even the genesis record verifies.
  pub fn recover(records: Vec<Record>) -> Result<(Self, usize)> {
    let total = records.len();
    let mut kept: Vec<Record> = Vec::with_capacity(total);

    for record in records {
      if record.sequence_index != kept.len() as u64
        || record.verify().is_err()
      {
        break;
      }
      if let Some(previous) = kept.last()
        && record.link_hash != previous.content_hash
      {
        break;
      }
      kept.push(record);
    }

    if kept.is_empty() {
      return Err(Error::EmptyChain);
    }

    let mut property_index: BTreeMap<String, Vec<u64>> = BTreeMap::new();
    let mut identity = IdentityRegistry::default();
    let mut survey_registry: BTreeMap<String, String> = BTreeMap::new();

    for record in &kept {
      if record.subject_key != GENESIS_KEY {
        property_index
          .entry(record.subject_key.clone())
          .or_default()
          .push(record.sequence_index);
      }
      match &record.payload {
        Payload::Registration(reg) => {
          identity.restore(&reg.owner, OwnerIdentity {
            aadhaar:      reg.aadhaar.clone(),
            pan:          reg.pan.clone(),
            customer_key: reg.customer_key.clone(),
          });
          survey_registry
            .insert(reg.survey_no.trim().to_string(), record.subject_key.clone());
        }
        Payload::Transfer(t) => {
          identity.restore(&t.previous_owner, OwnerIdentity {
            aadhaar:      t.previous_owner_aadhaar.clone(),
            pan:          t.previous_owner_pan.clone(),
            customer_key: t.previous_customer_key.clone(),
          });
          identity.restore(&t.new_owner, OwnerIdentity {
            aadhaar:      t.new_owner_aadhaar.clone(),
            pan:          t.new_owner_pan.clone(),
            customer_key: t.new_owner_customer_key.clone(),
          });
        }
        Payload::Genesis(_) => {}
      }
    }

    let dropped = total - kept.len();
    let ledger = Self {
      records: kept,
      property_index,
      identity,
      survey_registry,
    };
    Ok((ledger, dropped))
  }

  fn records_for(&self, property_key: &str) -> Result<Vec<&Record>> {
    let indices = self
      .property_index
      .get(property_key)
      .ok_or_else(|| Error::PropertyNotFound(property_key.to_string()))?;
    Ok(
      indices
        .iter()
        .map(|&i| &self.records[i as usize])
        .collect(),
    )
  }
}

/// Case- and whitespace-insensitive owner name comparison.
fn same_owner(a: &str, b: &str) -> bool {
  a.trim().to_lowercase() == b.trim().to_lowercase()
}
