//! Record types owned by the memory store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::types::SolutionStep;

/// A solved problem held in memory.
///
/// Invariants maintained by the store: step numbers form a contiguous
/// 1-based sequence, `confidence_score` and `success_rate` stay within
/// [0, 1], `usage_count` only grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemRecord {
  pub id: Uuid,
  pub problem_text: String,

  /// Free-form tag, e.g. "display", "network", "learned"
  pub problem_type: String,
  pub device_category: Option<String>,
  pub error_codes: BTreeSet<String>,
  pub possible_causes: Vec<String>,
  pub solution_steps: Vec<SolutionStep>,
  pub confidence_score: f32,
  pub success_rate: f32,
  pub usage_count: u64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl ProblemRecord {
  /// Deterministic id derived from the canonical problem text, so the same
  /// problem learned twice collapses onto one record.
  pub fn id_for(problem_text: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, problem_text.to_lowercase().as_bytes())
  }
}

/// The embedding half of a stored problem. Back-references its owner by id;
/// the store keeps the pair together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
  pub problem_id: Uuid,
  pub vector: Vec<f32>,
  pub created_at: DateTime<Utc>,
}

/// Input for a store insert. The store assigns id, timestamps, and counters.
#[derive(Debug, Clone)]
pub struct NewProblem {
  pub problem_text: String,
  pub problem_type: String,
  pub device_category: Option<String>,
  pub error_codes: BTreeSet<String>,
  pub possible_causes: Vec<String>,
  pub solution_steps: Vec<SolutionStep>,
  pub confidence_score: f32,
  pub success_rate: f32,
}

/// Aggregate store statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
  pub total_problems: usize,
  pub average_confidence: f32,
  pub average_success_rate: f32,
  pub total_usage: u64,
}

pub fn clamp01(value: f32) -> f32 {
  value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn record_ids_are_deterministic_and_case_insensitive() {
    let a = ProblemRecord::id_for("TV screen is black");
    let b = ProblemRecord::id_for("tv screen is black");
    let c = ProblemRecord::id_for("tv has no sound");
    assert_eq!(a, b);
    assert_ne!(a, c);
  }
}
