//! The computed read model for a property — never stored, always derived.

use serde::Serialize;

use crate::{
  identity::{Aadhaar, Pan},
  record::{Payload, Record},
};

/// Flattened current state of one property: the registration payload with
/// the latest transfer (if any) overlaid, and location/land sub-fields
/// hoisted to the top level for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyState {
  pub property_key:    String,
  pub owner:           String,
  pub customer_key:    String,
  pub aadhaar:         Aadhaar,
  pub pan:             Pan,
  pub address:         String,
  pub pincode:         String,
  /// Tracked value in INR; compounds transaction costs on every transfer.
  pub value:           f64,
  pub survey_no:       String,
  pub rtc_no:          String,
  pub village:         String,
  pub taluk:           String,
  pub district:        String,
  pub state:           String,
  pub land_area:       String,
  pub land_category:   String,
  pub description:     String,
  pub registered_at:   String,
  /// Timestamp of the most recent record touching this property.
  pub last_updated:    String,
  pub total_transfers: usize,
}

impl PropertyState {
  /// Fold a property's record sequence (registration first, transfers
  /// after, chronological) into its current state.
  ///
  /// Only called with sequences built by the ledger's own index, so the
  /// first record is always a registration.
  pub(crate) fn fold(records: &[&Record]) -> Option<Self> {
    let first = records.first()?;
    let Payload::Registration(reg) = &first.payload else {
      return None;
    };

    let mut state = Self {
      property_key:    first.subject_key.clone(),
      owner:           reg.owner.clone(),
      customer_key:    reg.customer_key.clone(),
      aadhaar:         reg.aadhaar.clone(),
      pan:             reg.pan.clone(),
      address:         reg.address.clone(),
      pincode:         reg.pincode.clone(),
      value:           reg.value,
      survey_no:       reg.survey_no.clone(),
      rtc_no:          reg.rtc_no.clone(),
      village:         reg.location.village.clone(),
      taluk:           reg.location.taluk.clone(),
      district:        reg.location.district.clone(),
      state:           reg.location.state.clone(),
      land_area:       reg.land.area.clone(),
      land_category:   reg.land.category.clone(),
      description:     reg.description.clone(),
      registered_at:   first.created_at.clone(),
      last_updated:    records.last()?.created_at.clone(),
      total_transfers: records.len() - 1,
    };

    // Overlay the latest transfer's new-owner fields and recomputed value.
    if let Some(last) = records.last()
      && let Payload::Transfer(t) = &last.payload
    {
      state.owner = t.new_owner.clone();
      state.customer_key = t.new_owner_customer_key.clone();
      state.aadhaar = t.new_owner_aadhaar.clone();
      state.pan = t.new_owner_pan.clone();
      state.value = t.new_property_value;
    }

    Some(state)
  }
}
