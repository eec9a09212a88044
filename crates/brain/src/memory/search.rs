//! Similarity scoring and result ordering for memory lookups.

use super::records::ProblemRecord;

/// Cosine similarity between two vectors of equal length. Degenerate
/// (all-zero) vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
  let mut dot = 0.0f32;
  let mut norm_a = 0.0f32;
  let mut norm_b = 0.0f32;

  for (x, y) in a.iter().zip(b.iter()) {
    dot += x * y;
    norm_a += x * x;
    norm_b += y * y;
  }

  if norm_a == 0.0 || norm_b == 0.0 {
    return 0.0;
  }
  dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Order matches by descending similarity; ties broken by higher
/// success_rate, then higher usage_count, then most recent update, then id.
/// The final key makes the order total and reproducible.
pub fn rank_matches(matches: &mut [(ProblemRecord, f32)]) {
  matches.sort_by(|(a, sim_a), (b, sim_b)| {
    sim_b
      .partial_cmp(sim_a)
      .unwrap_or(std::cmp::Ordering::Equal)
      .then_with(|| {
        b.success_rate.partial_cmp(&a.success_rate).unwrap_or(std::cmp::Ordering::Equal)
      })
      .then_with(|| b.usage_count.cmp(&a.usage_count))
      .then_with(|| b.updated_at.cmp(&a.updated_at))
      .then_with(|| a.id.cmp(&b.id))
  });
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{TimeZone, Utc};
  use std::collections::BTreeSet;
  use uuid::Uuid;

  fn record(success_rate: f32, usage_count: u64, updated_secs: i64) -> ProblemRecord {
    let updated_at = Utc.timestamp_opt(updated_secs, 0).unwrap();
    ProblemRecord {
      id: Uuid::new_v4(),
      problem_text: "test".to_string(),
      problem_type: "test".to_string(),
      device_category: None,
      error_codes: BTreeSet::new(),
      possible_causes: Vec::new(),
      solution_steps: Vec::new(),
      confidence_score: 0.5,
      success_rate,
      usage_count,
      created_at: updated_at,
      updated_at,
    }
  }

  #[test]
  fn identical_vectors_have_unit_similarity() {
    let v = vec![0.2, 0.4, 0.1];
    assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
  }

  #[test]
  fn orthogonal_vectors_have_zero_similarity() {
    assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
  }

  #[test]
  fn zero_vector_scores_zero() {
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
  }

  #[test]
  fn higher_similarity_ranks_first() {
    let mut matches = vec![(record(0.1, 0, 0), 0.4), (record(0.1, 0, 0), 0.9)];
    rank_matches(&mut matches);
    assert_eq!(matches[0].1, 0.9);
  }

  #[test]
  fn similarity_ties_break_on_success_rate_then_usage_then_recency() {
    let mut matches = vec![
      (record(0.5, 10, 100), 0.8),
      (record(0.9, 1, 100), 0.8),
      (record(0.5, 30, 100), 0.8),
      (record(0.5, 30, 200), 0.8),
    ];
    rank_matches(&mut matches);
    assert_eq!(matches[0].0.success_rate, 0.9);
    assert_eq!(matches[1].0.usage_count, 30);
    assert_eq!(matches[1].0.updated_at.timestamp(), 200);
    assert_eq!(matches[2].0.usage_count, 30);
    assert_eq!(matches[3].0.usage_count, 10);
  }
}
