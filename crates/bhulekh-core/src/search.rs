//! Unified fuzzy search over current property states.
//!
//! Matching tiers, highest first: exact equality (100), prefix match
//! (85–100, scaled by the query/field length ratio), substring containment
//! (75–90, scaled the same way), and — for the owner-name field only — a
//! fuzzy fallback combining token overlap and character-set similarity.
//! The raw tier score is multiplied by a fixed per-field relevance weight;
//! a property's overall score is the best weighted field score, tagged
//! with the field that produced it. Hits below 35 are dropped.

use serde::Serialize;

use crate::{Ledger, state::PropertyState};

/// Hits scoring below this are excluded from results.
pub const SCORE_THRESHOLD: f64 = 35.0;

/// One search result: the property's current state, its relevance score,
/// and the field that produced the score.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
  pub score:         f64,
  pub matched_field: &'static str,
  pub state:         PropertyState,
}

pub(crate) fn unified_search(ledger: &Ledger, query: &str) -> Vec<SearchHit> {
  let query = query.trim().to_lowercase();
  if query.is_empty() {
    return Vec::new();
  }
  // Identity documents are matched with spaces/dashes stripped from both
  // sides, so "1234 5678 9012" finds the stored "123456789012".
  let query_stripped: String = query
    .chars()
    .filter(|c| *c != ' ' && *c != '-')
    .collect();

  let mut hits: Vec<SearchHit> = ledger
    .properties()
    .into_iter()
    .filter_map(|state| {
      let mut best = 0.0_f64;
      let mut matched_field = "";

      for field in fields_of(&state) {
        if field.value.is_empty() {
          continue;
        }

        let target = if field.stripped {
          field
            .value
            .chars()
            .filter(|c| *c != ' ' && *c != '-')
            .collect::<String>()
            .to_lowercase()
        } else {
          field.value.to_lowercase()
        };
        let q = if field.stripped { &query_stripped } else { &query };

        let mut raw = tier_score(q, &target);
        if raw == 0.0 && field.fuzzy {
          raw = fuzzy_score(&query, &target);
        }

        let weighted = raw * field.weight;
        if weighted > best {
          best = weighted;
          matched_field = field.name;
        }
      }

      (best >= SCORE_THRESHOLD).then(|| SearchHit {
        score: (best * 10.0).round() / 10.0,
        matched_field,
        state,
      })
    })
    .collect();

  hits.sort_by(|a, b| b.score.total_cmp(&a.score));
  hits
}

struct Field<'a> {
  name:     &'static str,
  value:    &'a str,
  weight:   f64,
  /// Strip spaces/dashes from field and query before comparing.
  stripped: bool,
  /// Apply the fuzzy fallback when no tier matches.
  fuzzy:    bool,
}

fn fields_of(state: &PropertyState) -> [Field<'_>; 12] {
  let plain = |name, value, weight| Field {
    name,
    value,
    weight,
    stripped: false,
    fuzzy: false,
  };
  [
    plain("property_key", &state.property_key, 1.0),
    Field {
      name:     "owner",
      value:    &state.owner,
      weight:   1.0,
      stripped: false,
      fuzzy:    true,
    },
    plain("customer_key", &state.customer_key, 0.95),
    plain("survey_no", &state.survey_no, 0.9),
    plain("rtc_no", &state.rtc_no, 0.9),
    Field {
      name:     "aadhaar",
      value:    state.aadhaar.as_str(),
      weight:   0.85,
      stripped: true,
      fuzzy:    false,
    },
    plain("pan", state.pan.as_str(), 0.85),
    plain("pincode", &state.pincode, 0.8),
    plain("village", &state.village, 0.7),
    plain("taluk", &state.taluk, 0.7),
    plain("district", &state.district, 0.7),
    plain("address", &state.address, 0.6),
  ]
}

/// Exact / prefix / substring tiers. Both inputs are already lowercased.
fn tier_score(query: &str, target: &str) -> f64 {
  if query == target {
    return 100.0;
  }
  let ratio = query.len() as f64 / target.len() as f64;
  if target.starts_with(query) {
    return 85.0 + ratio * 15.0;
  }
  if target.contains(query) {
    return 75.0 + ratio * 15.0;
  }
  0.0
}

/// Fuzzy fallback for owner names: token overlap first, then a
/// character-set Jaccard similarity with a first-character bonus.
fn fuzzy_score(query: &str, target: &str) -> f64 {
  if query.is_empty() || target.is_empty() {
    return 0.0;
  }

  let query_words: Vec<&str> = query.split_whitespace().collect();
  let target_words: Vec<&str> = target.split_whitespace().collect();

  // Every query word appears inside some target word.
  if !query_words.is_empty()
    && query_words
      .iter()
      .all(|qw| target_words.iter().any(|tw| tw.contains(qw)))
  {
    return 80.0;
  }

  // Partial token overlap, in either containment direction.
  let matching = query_words
    .iter()
    .filter(|qw| {
      target_words
        .iter()
        .any(|tw| tw.contains(*qw) || qw.contains(tw))
    })
    .count();
  if !query_words.is_empty() {
    let word_score = matching as f64 / query_words.len() as f64 * 70.0;
    if word_score > 30.0 {
      return word_score;
    }
  }

  // Character-set Jaccard similarity.
  let query_chars: std::collections::BTreeSet<char> =
    query.chars().filter(|c| *c != ' ').collect();
  let target_chars: std::collections::BTreeSet<char> =
    target.chars().filter(|c| *c != ' ').collect();
  if query_chars.is_empty() || target_chars.is_empty() {
    return 0.0;
  }

  let common = query_chars.intersection(&target_chars).count();
  let total = query_chars.union(&target_chars).count();
  let mut score = common as f64 / total as f64 * 50.0;
  if query.chars().next() == target.chars().next() {
    score += 10.0;
  }
  score
}
