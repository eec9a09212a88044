//! Match evaluation: is a memory hit trustworthy enough to answer directly?
//!
//! Pure decision logic over the ranked lookup results; no I/O.

use crate::config::BrainConfig;
use crate::memory::records::ProblemRecord;

/// Verdict over the top-k memory matches.
#[derive(Debug, Clone)]
pub enum MatchDecision {
  /// Answer straight from this record, skipping external analysis.
  Direct { record: ProblemRecord, similarity: f32 },

  /// No direct answer; the best still-worth-considering candidate (if any)
  /// is carried into fusion.
  Uncertain { best: Option<(ProblemRecord, f32)> },
}

/// Decide whether the ranked matches contain a direct answer.
///
/// Direct requires the top similarity to clear the high-confidence threshold
/// AND the record's success rate to clear the configured minimum, so a
/// historically-failing solution is never surfaced verbatim no matter how
/// similar the query.
pub fn evaluate(matches: &[(ProblemRecord, f32)], config: &BrainConfig) -> MatchDecision {
  let Some((top, top_similarity)) = matches.first() else {
    return MatchDecision::Uncertain { best: None };
  };

  if *top_similarity >= config.direct_threshold && top.success_rate >= config.min_success_rate {
    return MatchDecision::Direct { record: top.clone(), similarity: *top_similarity };
  }

  let best = matches
    .iter()
    .find(|(_, similarity)| *similarity >= config.consider_threshold)
    .map(|(record, similarity)| (record.clone(), *similarity));

  MatchDecision::Uncertain { best }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;
  use std::collections::BTreeSet;
  use uuid::Uuid;

  fn record(success_rate: f32) -> ProblemRecord {
    let now = Utc::now();
    ProblemRecord {
      id: Uuid::new_v4(),
      problem_text: "tv screen is black".to_string(),
      problem_type: "display".to_string(),
      device_category: Some("television".to_string()),
      error_codes: BTreeSet::new(),
      possible_causes: Vec::new(),
      solution_steps: Vec::new(),
      confidence_score: 0.9,
      success_rate,
      usage_count: 3,
      created_at: now,
      updated_at: now,
    }
  }

  #[test]
  fn confident_successful_match_is_direct() {
    let matches = vec![(record(0.9), 0.97)];
    let decision = evaluate(&matches, &BrainConfig::default());
    assert!(matches!(decision, MatchDecision::Direct { similarity, .. } if similarity == 0.97));
  }

  #[test]
  fn failing_record_is_not_direct_even_when_similar() {
    let matches = vec![(record(0.1), 0.97)];
    let decision = evaluate(&matches, &BrainConfig::default());
    // Still worth considering in fusion, just not a verbatim answer
    assert!(matches!(decision, MatchDecision::Uncertain { best: Some(_) }));
  }

  #[test]
  fn weak_similarity_is_uncertain_without_candidate() {
    let matches = vec![(record(0.9), 0.55)];
    let decision = evaluate(&matches, &BrainConfig::default());
    assert!(matches!(decision, MatchDecision::Uncertain { best: None }));
  }

  #[test]
  fn middling_similarity_carries_best_candidate() {
    let matches = vec![(record(0.9), 0.75), (record(0.8), 0.65)];
    let decision = evaluate(&matches, &BrainConfig::default());
    match decision {
      MatchDecision::Uncertain { best: Some((_, similarity)) } => assert_eq!(similarity, 0.75),
      other => panic!("expected uncertain-with-best, got {other:?}"),
    }
  }

  #[test]
  fn empty_matches_are_uncertain() {
    let decision = evaluate(&[], &BrainConfig::default());
    assert!(matches!(decision, MatchDecision::Uncertain { best: None }));
  }
}
