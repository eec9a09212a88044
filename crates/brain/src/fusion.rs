//! Fusion and ranking: merge candidate solutions into one ranked answer.
//!
//! Causes are unioned across sources; steps are never interleaved — they
//! come whole from the single most confident candidate that has any, so the
//! user never follows instructions stitched together from disagreeing
//! sources.

use std::collections::HashSet;

use crate::config::BrainConfig;
use crate::types::{
  renumber_steps, CandidateSolution, CandidateSource, ExternalSource, Solution, SolutionStep,
};

/// Merge the available candidates into one solution, or `None` when there is
/// nothing to merge (the caller reports that as a no-solution outcome).
pub fn fuse(candidates: Vec<CandidateSolution>, config: &BrainConfig) -> Option<Solution> {
  if candidates.is_empty() {
    return None;
  }

  let mut scored: Vec<(f32, CandidateSolution)> = candidates
    .into_iter()
    .map(|candidate| (effective_confidence(&candidate, config), candidate))
    .collect();

  scored.sort_by(|(conf_a, cand_a), (conf_b, cand_b)| {
    conf_b
      .partial_cmp(conf_a)
      .unwrap_or(std::cmp::Ordering::Equal)
      .then_with(|| cand_a.source.rank().cmp(&cand_b.source.rank()))
  });

  let issue = scored
    .iter()
    .map(|(_, candidate)| candidate.issue.trim())
    .find(|issue| !issue.is_empty())
    .unwrap_or("unidentified issue")
    .to_string();

  let possible_causes = union_causes(&scored);
  let recommended_steps = pick_steps(&scored);
  let external_sources = collect_sources(&scored, config.max_external_sources);

  let confidence_score =
    scored.iter().map(|(confidence, _)| *confidence).fold(0.0f32, f32::max).clamp(0.0, 1.0);

  Some(Solution { issue, possible_causes, confidence_score, recommended_steps, external_sources })
}

/// Per-source confidence after the provenance rules. Uncertain memory is
/// discounted; a direct hit and a generated analysis stand as reported.
fn effective_confidence(candidate: &CandidateSolution, config: &BrainConfig) -> f32 {
  let confidence = match candidate.source {
    CandidateSource::UncertainMemory => candidate.confidence * config.provenance_discount,
    _ => candidate.confidence,
  };
  confidence.clamp(0.0, 1.0)
}

/// Union causes across candidates, highest-confidence source first,
/// deduplicated by case-insensitive text equality in first-seen order.
fn union_causes(scored: &[(f32, CandidateSolution)]) -> Vec<String> {
  let mut seen = HashSet::new();
  let mut causes = Vec::new();

  for (_, candidate) in scored {
    for cause in &candidate.causes {
      let trimmed = cause.trim();
      if trimmed.is_empty() {
        continue;
      }
      if seen.insert(trimmed.to_lowercase()) {
        causes.push(trimmed.to_string());
      }
    }
  }

  causes
}

/// Steps from the single most confident candidate that has any, renumbered
/// into a contiguous 1-based sequence.
fn pick_steps(scored: &[(f32, CandidateSolution)]) -> Vec<SolutionStep> {
  for (_, candidate) in scored {
    if !candidate.steps.is_empty() {
      let mut steps = candidate.steps.clone();
      renumber_steps(&mut steps);
      return steps;
    }
  }
  Vec::new()
}

/// Web snippets deduplicated by URL, capped.
fn collect_sources(scored: &[(f32, CandidateSolution)], cap: usize) -> Vec<ExternalSource> {
  let mut seen = HashSet::new();
  let mut sources = Vec::new();

  for (_, candidate) in scored {
    if candidate.source != CandidateSource::WebSearch {
      continue;
    }
    for source in &candidate.sources {
      if sources.len() >= cap {
        return sources;
      }
      if seen.insert(source.url.clone()) {
        sources.push(source.clone());
      }
    }
  }

  sources
}
