//! Request/response types shared across the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

// Query Input
// ===========

/// One arm of the multimodal input union. Transcription, OCR, and log parsing
/// happen upstream; every arm already carries text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RawInput {
  Text { text: String },
  Audio { transcript: String },
  Image { ocr_text: String },
  Logs { parsed_log_summary: String },
}

impl RawInput {
  /// The text payload of whichever arm this is.
  pub fn payload(&self) -> &str {
    match self {
      RawInput::Text { text } => text,
      RawInput::Audio { transcript } => transcript,
      RawInput::Image { ocr_text } => ocr_text,
      RawInput::Logs { parsed_log_summary } => parsed_log_summary,
    }
  }
}

/// Structured hints extracted during normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryHints {
  /// Inferred device category (e.g. "television", "smartphone")
  pub device_category: Option<String>,

  /// Error codes spotted in the raw text, upper-cased
  pub error_codes: BTreeSet<String>,
}

/// Canonical normalized query: lowercase, whitespace-collapsed text plus the
/// hint bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalQuery {
  pub text: String,
  pub hints: QueryHints,
}

/// Ephemeral per-request fingerprint. Never persisted; discarded when the
/// request completes.
#[derive(Debug, Clone)]
pub struct QueryFingerprint {
  pub text: String,
  pub hints: QueryHints,
  pub embedding: Vec<f32>,
}

// Solutions
// =========

/// One recommended step of a solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionStep {
  pub step_number: u32,
  pub description: String,

  /// Optional supporting media reference
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub media_url: Option<String>,
}

impl SolutionStep {
  pub fn new(step_number: u32, description: impl Into<String>) -> Self {
    Self { step_number, description: description.into(), media_url: None }
  }
}

/// Renumber steps into a contiguous 1-based sequence, preserving order.
pub fn renumber_steps(steps: &mut [SolutionStep]) {
  for (index, step) in steps.iter_mut().enumerate() {
    step.step_number = index as u32 + 1;
  }
}

/// External reference attached to a solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalSource {
  pub title: String,
  pub snippet: String,
  pub url: String,
}

/// The final ranked answer delivered to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
  pub issue: String,
  pub possible_causes: Vec<String>,
  pub confidence_score: f32,
  pub recommended_steps: Vec<SolutionStep>,
  pub external_sources: Vec<ExternalSource>,
}

// Candidates
// ==========

/// Where a candidate solution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
  DirectMemory,
  UncertainMemory,
  GeneratedAnalysis,
  WebSearch,
}

impl CandidateSource {
  /// Stable ordering rank used to break confidence ties deterministically.
  pub fn rank(&self) -> u8 {
    match self {
      CandidateSource::DirectMemory => 0,
      CandidateSource::UncertainMemory => 1,
      CandidateSource::GeneratedAnalysis => 2,
      CandidateSource::WebSearch => 3,
    }
  }
}

/// Ephemeral candidate produced by memory lookup or external analysis,
/// consumed only by the fusion engine.
#[derive(Debug, Clone)]
pub struct CandidateSolution {
  pub source: CandidateSource,
  pub confidence: f32,
  pub issue: String,
  pub causes: Vec<String>,
  pub steps: Vec<SolutionStep>,
  pub sources: Vec<ExternalSource>,
}

// Outcomes
// ========

/// Business outcome of resolving one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
  Solved { solution: Solution },
  NoSolutionFound,
}

/// Response of [`crate::core::BrainCore::resolve`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
  pub query_id: Uuid,
  #[serde(flatten)]
  pub outcome: Outcome,
}

/// Post-hoc user feedback on a delivered solution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEvent {
  pub query_id: Uuid,
  pub success: bool,
  pub score: Option<u8>,
  pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn payload_returns_arm_text() {
    let input = RawInput::Audio { transcript: "no sound".to_string() };
    assert_eq!(input.payload(), "no sound");
  }

  #[test]
  fn renumber_makes_steps_contiguous() {
    let mut steps =
      vec![SolutionStep::new(4, "first"), SolutionStep::new(4, "second"), SolutionStep::new(0, "third")];
    renumber_steps(&mut steps);
    let numbers: Vec<u32> = steps.iter().map(|s| s.step_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(steps[0].description, "first");
  }
}
