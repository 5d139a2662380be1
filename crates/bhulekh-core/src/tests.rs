//! Integration tests for the ledger core.

use crate::{
  Error, Ledger,
  ledger::{NewInheritance, NewRegistration, NewTransfer},
  record::Payload,
};

fn ledger() -> Ledger { Ledger::new().expect("fresh ledger") }

fn registration(
  key: &str,
  owner: &str,
  aadhaar: &str,
  pan: &str,
  survey: &str,
) -> NewRegistration {
  NewRegistration::new(
    key,
    owner,
    "12 MG Road, Bengaluru",
    "560001",
    1_000_000.0,
    aadhaar,
    pan,
    survey,
  )
}

fn transfer(key: &str, owner: &str, aadhaar: &str, pan: &str) -> NewTransfer {
  NewTransfer::new(key, owner, aadhaar, pan)
}

// ─── Registration ────────────────────────────────────────────────────────────

#[test]
fn register_appends_linked_record() {
  let mut l = ledger();
  let record = l
    .register_property(registration(
      "P1",
      "Ramesh Kumar",
      "111111111111",
      "ABCDE1234F",
      "24/1",
    ))
    .unwrap()
    .clone();

  assert_eq!(record.sequence_index, 1);
  assert_eq!(record.subject_key, "P1");
  assert_eq!(record.link_hash, l.records()[0].content_hash);
  assert!(matches!(record.payload, Payload::Registration(_)));
  l.validate().unwrap();
}

#[test]
fn register_assigns_customer_key() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();

  let state = l.current_state("P1").unwrap();
  assert!(state.customer_key.starts_with("CUST-"));
  assert_eq!(state.customer_key.len(), "CUST-".len() + 8);

  let profile = l.owner_by_customer_key(&state.customer_key).unwrap();
  assert_eq!(profile.name, "Ramesh Kumar");
  assert_eq!(profile.aadhaar.as_str(), "111111111111");
}

#[test]
fn register_duplicate_property_key_errors() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();

  let err = l
    .register_property(registration(
      "P1",
      "Ramesh Kumar",
      "111111111111",
      "ABCDE1234F",
      "24/2",
    ))
    .unwrap_err();
  assert!(matches!(err, Error::PropertyExists(_)));
  assert_eq!(l.records().len(), 2);
}

#[test]
fn register_same_aadhaar_different_owner_errors() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();

  let err = l
    .register_property(registration(
      "P2",
      "Suresh Rao",
      "111111111111",
      "FGHIJ5678K",
      "24/2",
    ))
    .unwrap_err();
  assert!(matches!(err, Error::AadhaarTaken { .. }));
}

#[test]
fn returning_owner_with_different_pan_is_identity_conflict() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();

  let err = l
    .register_property(registration(
      "P2",
      "Ramesh Kumar",
      "111111111111",
      "FGHIJ5678K",
      "24/2",
    ))
    .unwrap_err();
  assert!(matches!(err, Error::IdentityMismatch { field: "PAN", .. }));
}

#[test]
fn returning_owner_keeps_customer_key() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();
  l.register_property(registration(
    "P2",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/2",
  ))
  .unwrap();

  let a = l.current_state("P1").unwrap();
  let b = l.current_state("P2").unwrap();
  assert_eq!(a.customer_key, b.customer_key);
}

#[test]
fn register_duplicate_survey_number_errors() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();

  let err = l
    .register_property(registration(
      "P2",
      "Suresh Rao",
      "222222222222",
      "FGHIJ5678K",
      "24/1",
    ))
    .unwrap_err();
  assert!(matches!(err, Error::SurveyTaken { .. }));
  // The conflict must reject before any mutation: Suresh must not have
  // been registered as an identity.
  assert_eq!(l.identity().owner_count(), 1);
}

#[test]
fn register_rejects_malformed_ids_and_value() {
  let mut l = ledger();

  let err = l
    .register_property(registration(
      "P1",
      "Ramesh Kumar",
      "1111",
      "ABCDE1234F",
      "24/1",
    ))
    .unwrap_err();
  assert!(matches!(err, Error::InvalidAadhaar(_)));

  let err = l
    .register_property(registration(
      "P1",
      "Ramesh Kumar",
      "111111111111",
      "NOT-A-PAN",
      "24/1",
    ))
    .unwrap_err();
  assert!(matches!(err, Error::InvalidPan(_)));

  let mut input = registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  );
  input.value = 0.0;
  let err = l.register_property(input).unwrap_err();
  assert!(matches!(err, Error::NonPositiveValue(_)));

  assert_eq!(l.records().len(), 1);
}

// ─── Transfer ────────────────────────────────────────────────────────────────

#[test]
fn transfer_overlays_current_state() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();
  l.transfer_property(transfer("P1", "Suresh Rao", "222222222222", "FGHIJ5678K"))
    .unwrap();

  let state = l.current_state("P1").unwrap();
  assert_eq!(state.owner, "Suresh Rao");
  assert_eq!(state.aadhaar.as_str(), "222222222222");
  assert_eq!(state.pan.as_str(), "FGHIJ5678K");
  assert_eq!(state.total_transfers, 1);
  // Address and survey metadata stay from the registration.
  assert_eq!(state.survey_no, "24/1");
  l.validate().unwrap();
}

#[test]
fn default_fees_compound_into_tracked_value() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();
  let record = l
    .transfer_property(transfer(
      "P1",
      "Suresh Rao",
      "222222222222",
      "FGHIJ5678K",
    ))
    .unwrap();

  let Payload::Transfer(t) = &record.payload else {
    panic!("expected transfer payload");
  };
  assert_eq!(t.transfer_value, 1_000_000.0);
  assert_eq!(t.stamp_duty, 20_000.0);
  assert_eq!(t.registration_fee, 50_000.0);
  assert_eq!(t.new_property_value, 1_070_000.0);

  assert_eq!(l.current_state("P1").unwrap().value, 1_070_000.0);
}

#[test]
fn explicit_fees_override_defaults() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();

  let mut input =
    transfer("P1", "Suresh Rao", "222222222222", "FGHIJ5678K");
  input.transfer_value = Some(2_000_000.0);
  input.stamp_duty = Some(10_000.0);
  input.registration_fee = Some(5_000.0);
  l.transfer_property(input).unwrap();

  assert_eq!(l.current_state("P1").unwrap().value, 2_015_000.0);
}

#[test]
fn self_transfer_is_rejected_without_appending() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();

  // Case- and whitespace-insensitive match on the current owner.
  let err = l
    .transfer_property(transfer(
      "P1",
      "  ramesh kumar ",
      "111111111111",
      "ABCDE1234F",
    ))
    .unwrap_err();
  assert!(matches!(err, Error::SelfTransfer(_)));
  assert_eq!(l.records().len(), 2);
}

#[test]
fn transfer_unknown_property_errors() {
  let mut l = ledger();
  let err = l
    .transfer_property(transfer(
      "NOPE",
      "Suresh Rao",
      "222222222222",
      "FGHIJ5678K",
    ))
    .unwrap_err();
  assert!(matches!(err, Error::PropertyNotFound(_)));
}

#[test]
fn transfer_snapshots_both_identities() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();
  let previous_key = l.current_state("P1").unwrap().customer_key;

  let record = l
    .transfer_property(transfer(
      "P1",
      "Suresh Rao",
      "222222222222",
      "FGHIJ5678K",
    ))
    .unwrap();
  let Payload::Transfer(t) = &record.payload else {
    panic!("expected transfer payload");
  };
  assert_eq!(t.previous_owner, "Ramesh Kumar");
  assert_eq!(t.previous_owner_aadhaar.as_str(), "111111111111");
  assert_eq!(t.previous_owner_pan.as_str(), "ABCDE1234F");
  assert_eq!(t.previous_customer_key, previous_key);
  assert_eq!(t.new_owner, "Suresh Rao");
}

// ─── Inheritance ─────────────────────────────────────────────────────────────

#[test]
fn inheritance_requires_matching_deceased_owner() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();

  let err = l
    .inherit_property(NewInheritance {
      property_key:              "P1".into(),
      deceased_owner:            "Someone Else".into(),
      heir:                      "Suresh Rao".into(),
      aadhaar:                   "222222222222".into(),
      pan:                       "FGHIJ5678K".into(),
      relationship:              "son".into(),
      legal_heir_certificate_no: "LHC-1".into(),
    })
    .unwrap_err();
  assert!(matches!(err, Error::DeceasedOwnerMismatch { .. }));
  assert_eq!(l.records().len(), 2);
}

#[test]
fn inheritance_is_a_transfer_with_reason_and_certificate() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();

  let record = l
    .inherit_property(NewInheritance {
      property_key:              "P1".into(),
      deceased_owner:            "ramesh kumar".into(),
      heir:                      "Suresh Rao".into(),
      aadhaar:                   "222222222222".into(),
      pan:                       "FGHIJ5678K".into(),
      relationship:              "son".into(),
      legal_heir_certificate_no: "LHC-1".into(),
    })
    .unwrap();

  let Payload::Transfer(t) = &record.payload else {
    panic!("expected transfer payload");
  };
  assert_eq!(t.transfer_reason, "inheritance");
  assert_eq!(t.relationship.as_deref(), Some("son"));
  assert_eq!(t.legal_heir_certificate_no.as_deref(), Some("LHC-1"));
  assert_eq!(l.current_state("P1").unwrap().owner, "Suresh Rao");
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[test]
fn history_returns_value_copies() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();

  let mut history = l.history("P1").unwrap();
  assert_eq!(history.len(), 1);

  // Redact in place, as a caller preparing a non-owner view would.
  history[0].content_hash.clear();
  history.clear();

  let again = l.history("P1").unwrap();
  assert_eq!(again.len(), 1);
  assert!(!again[0].content_hash.is_empty());
  l.validate().unwrap();
}

#[test]
fn record_for_latest_and_specific() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();
  l.transfer_property(transfer("P1", "Suresh Rao", "222222222222", "FGHIJ5678K"))
    .unwrap();

  assert_eq!(l.record_for("P1", None).unwrap().sequence_index, 2);
  assert_eq!(l.record_for("P1", Some(1)).unwrap().sequence_index, 1);
  assert!(matches!(
    l.record_for("P1", Some(5)).unwrap_err(),
    Error::RecordNotFound { .. }
  ));
}

#[test]
fn search_by_identity_requires_all_three_fields() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();
  let key = l.current_state("P1").unwrap().customer_key;

  // Normalized inputs match.
  let hits = l.search_by_identity(&key, "1111 1111 1111", "abcde1234f");
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].property_key, "P1");

  // One wrong field, no match.
  assert!(
    l.search_by_identity(&key, "222222222222", "ABCDE1234F")
      .is_empty()
  );
}

#[test]
fn search_by_owner_is_case_insensitive() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();

  assert_eq!(l.search_by_owner("RAMESH KUMAR").len(), 1);
  assert!(l.search_by_owner("Ramesh").is_empty());
}

#[test]
fn unified_search_ranks_owner_matches_above_address_matches() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();
  l.register_property(registration(
    "P2",
    "Ram Kumar",
    "222222222222",
    "FGHIJ5678K",
    "24/2",
  ))
  .unwrap();
  // Address-only candidate: "ram" appears only in the street name.
  let mut other = registration(
    "P3",
    "Vijay Shetty",
    "333333333333",
    "KLMNO9012P",
    "24/3",
  );
  other.address = "7 Rampur Road".into();
  l.register_property(other).unwrap();

  let hits = l.unified_search("ram");
  assert_eq!(hits.len(), 3);
  assert_eq!(hits[0].state.property_key, "P2"); // prefix of shorter name
  assert_eq!(hits[1].state.property_key, "P1");
  assert_eq!(hits[2].state.property_key, "P3");
  assert_eq!(hits[0].matched_field, "owner");
  assert_eq!(hits[2].matched_field, "address");
  assert!(hits[1].score > hits[2].score);
}

#[test]
fn unified_search_exact_survey_number_tops_the_ranking() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();
  l.register_property(registration(
    "P2",
    "Suresh Rao",
    "222222222222",
    "FGHIJ5678K",
    "99/9",
  ))
  .unwrap();

  let hits = l.unified_search("24/1");
  assert_eq!(hits[0].state.property_key, "P1");
  assert_eq!(hits[0].matched_field, "survey_no");
  assert_eq!(hits[0].score, 90.0); // 100 × survey weight
}

#[test]
fn unified_search_matches_stripped_aadhaar() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();

  let hits = l.unified_search("1111-1111-1111");
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].matched_field, "aadhaar");
}

#[test]
fn unified_search_empty_query_returns_nothing() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();
  assert!(l.unified_search("   ").is_empty());
}

// ─── Validation & recovery ───────────────────────────────────────────────────

#[test]
fn hash_is_deterministic() {
  let l = ledger();
  let genesis = &l.records()[0];
  assert_eq!(genesis.content_hash.len(), 64);
  assert_eq!(
    genesis.compute_content_hash().unwrap(),
    genesis.content_hash
  );
}

#[test]
fn validate_detects_tampered_payload_at_exact_index() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();
  l.transfer_property(transfer("P1", "Suresh Rao", "222222222222", "FGHIJ5678K"))
    .unwrap();
  l.validate().unwrap();

  // Flip one character of record 1's payload behind the ledger's back.
  let mut records = l.records().to_vec();
  if let Payload::Registration(reg) = &mut records[1].payload {
    reg.owner = "Ramesh Xumar".into();
  }
  let tampered = Ledger::from_parts(
    records,
    l.property_index().clone(),
    l.identity().clone(),
    l.survey_registry().clone(),
  );
  assert!(matches!(
    tampered.unwrap_err(),
    Error::HashMismatch { index: 1, .. }
  ));
}

#[test]
fn validate_detects_broken_link() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();

  let mut records = l.records().to_vec();
  records[1].link_hash = "0".repeat(64);
  // Re-hash so the record self-verifies but the link is wrong.
  records[1].content_hash = records[1].compute_content_hash().unwrap();

  let err = Ledger::from_parts(
    records,
    l.property_index().clone(),
    l.identity().clone(),
    l.survey_registry().clone(),
  )
  .unwrap_err();
  assert!(matches!(err, Error::BrokenLink { index: 1, .. }));
}

#[test]
fn recover_truncates_to_valid_prefix() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();
  l.register_property(registration(
    "P2",
    "Suresh Rao",
    "222222222222",
    "FGHIJ5678K",
    "24/2",
  ))
  .unwrap();
  l.transfer_property(transfer("P2", "Vijay Shetty", "333333333333", "KLMNO9012P"))
    .unwrap();

  let mut records = l.records().to_vec();
  // Corrupt record 2; records 2 and 3 should both be dropped.
  records[2].subject_key = "EVIL".into();

  let (recovered, dropped) = Ledger::recover(records).unwrap();

  assert_eq!(dropped, 2);
  assert_eq!(recovered.records().len(), 2);
  recovered.validate().unwrap();
  assert!(recovered.current_state("P1").is_ok());
  assert!(matches!(
    recovered.current_state("P2").unwrap_err(),
    Error::PropertyNotFound(_)
  ));
}

#[test]
fn recover_rebuilds_registries_from_the_kept_prefix() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();
  l.register_property(registration(
    "P2",
    "Suresh Rao",
    "222222222222",
    "FGHIJ5678K",
    "24/2",
  ))
  .unwrap();

  let mut records = l.records().to_vec();
  records[2].subject_key = "EVIL".into();

  let (mut recovered, dropped) = Ledger::recover(records).unwrap();
  assert_eq!(dropped, 1);

  // Suresh's registration was dropped, so his identity and survey number
  // must be free for re-registration — not ghost-locked by stale
  // registry entries.
  assert_eq!(recovered.identity().owner_count(), 1);
  recovered
    .register_property(registration(
      "P2",
      "Suresh Rao",
      "222222222222",
      "FGHIJ5678K",
      "24/2",
    ))
    .unwrap();
  recovered.validate().unwrap();
}

#[test]
fn recover_keeps_transfer_identities() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();
  l.transfer_property(transfer("P1", "Suresh Rao", "222222222222", "FGHIJ5678K"))
    .unwrap();
  let suresh_key = l.current_state("P1").unwrap().customer_key;

  // Nothing corrupt; recover must reproduce both parties' identities
  // from the transfer payload's snapshots.
  let (recovered, dropped) = Ledger::recover(l.records().to_vec()).unwrap();
  assert_eq!(dropped, 0);
  assert_eq!(recovered.identity().owner_count(), 2);
  assert_eq!(recovered.identity(), l.identity());
  assert_eq!(
    recovered.owner_by_customer_key(&suresh_key).unwrap().name,
    "Suresh Rao"
  );
}

#[test]
fn recover_fails_when_genesis_is_corrupt() {
  let l = ledger();
  let mut records = l.records().to_vec();
  records[0].content_hash = "f".repeat(64);

  assert!(Ledger::recover(records).is_err());
}

#[test]
fn forged_sequence_index_is_rejected_not_trusted() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();

  // A forged record can claim any sequence_index and still self-verify,
  // because the content hash is unkeyed. It must not be trusted as a
  // position.
  let mut records = l.records().to_vec();
  records[1].sequence_index = 5;
  records[1].content_hash = records[1].compute_content_hash().unwrap();

  let err = Ledger::from_parts(
    records.clone(),
    l.property_index().clone(),
    l.identity().clone(),
    l.survey_registry().clone(),
  )
  .unwrap_err();
  assert!(matches!(
    err,
    Error::SequenceMismatch {
      position: 1,
      stored:   5,
    }
  ));

  // Recovery keeps the genesis prefix and drops the forgery; queries on
  // the result error cleanly instead of indexing out of bounds.
  let (recovered, dropped) = Ledger::recover(records).unwrap();
  assert_eq!(dropped, 1);
  assert_eq!(recovered.records().len(), 1);
  assert!(matches!(
    recovered.current_state("P1").unwrap_err(),
    Error::PropertyNotFound(_)
  ));
}

#[test]
fn stats_counts_records_and_properties() {
  let mut l = ledger();
  l.register_property(registration(
    "P1",
    "Ramesh Kumar",
    "111111111111",
    "ABCDE1234F",
    "24/1",
  ))
  .unwrap();

  let stats = l.stats();
  assert_eq!(stats.total_records, 2);
  assert_eq!(stats.total_properties, 1);
  assert_eq!(stats.latest_hash, l.records()[1].content_hash);
}
