//! Engine configuration.
//!
//! Every tunable the decision logic depends on lives here with a documented
//! default and a `BRAIN_*` environment override. Call sites never hard-code
//! thresholds.

use std::env;
use std::time::Duration;

use crate::error::BrainError;

#[derive(Debug, Clone)]
pub struct BrainConfig {
  /// Fixed dimensionality of every embedding in the store. Changing it
  /// requires a fresh store; a snapshot with a different dimension refuses
  /// to load.
  pub embedding_dimension: usize,

  /// Nearest neighbors fetched per memory lookup.
  pub top_k: usize,

  /// Similarity at or above which a memory hit may be returned directly.
  pub direct_threshold: f32,

  /// Minimum success rate a record needs to qualify as a direct answer.
  /// Keeps historically-failing solutions from being surfaced verbatim.
  pub min_success_rate: f32,

  /// Similarity at or above which a weak match is still worth fusing.
  pub consider_threshold: f32,

  /// Multiplier applied to uncertain-memory confidence during fusion.
  pub provenance_discount: f32,

  /// Confidence assigned to web-search candidates, which report none.
  pub web_confidence: f32,

  /// EMA smoothing factor for success-rate updates from feedback.
  pub feedback_alpha: f32,

  /// How far confidence drifts toward the observed similarity per match.
  pub match_nudge: f32,

  /// Minimum fused confidence before an answer is written back to memory.
  pub learn_threshold: f32,

  /// Cap on external sources attached to one solution.
  pub max_external_sources: usize,

  /// Timeout for one embedding call.
  pub embed_timeout: Duration,

  /// Timeout for the generative-reasoning collaborator.
  pub reasoning_timeout: Duration,

  /// Timeout for the web-search collaborator.
  pub search_timeout: Duration,

  /// How long a query id stays eligible for feedback.
  pub feedback_ttl: Duration,

  /// Load the built-in problem catalog into an empty store at startup.
  pub seed_catalog: bool,
}

impl Default for BrainConfig {
  fn default() -> Self {
    Self {
      embedding_dimension: 384,
      top_k: 3,
      direct_threshold: 0.90,
      min_success_rate: 0.40,
      consider_threshold: 0.60,
      provenance_discount: 0.75,
      web_confidence: 0.35,
      feedback_alpha: 0.20,
      match_nudge: 0.15,
      learn_threshold: 0.55,
      max_external_sources: 5,
      embed_timeout: Duration::from_secs(5),
      reasoning_timeout: Duration::from_secs(12),
      search_timeout: Duration::from_secs(8),
      feedback_ttl: Duration::from_secs(900),
      seed_catalog: true,
    }
  }
}

impl BrainConfig {
  /// Defaults overridden by any `BRAIN_*` environment variables present.
  pub fn from_env() -> Self {
    let defaults = Self::default();
    Self {
      embedding_dimension: env_usize("BRAIN_EMBEDDING_DIMENSION", defaults.embedding_dimension),
      top_k: env_usize("BRAIN_TOP_K", defaults.top_k),
      direct_threshold: env_f32("BRAIN_DIRECT_THRESHOLD", defaults.direct_threshold),
      min_success_rate: env_f32("BRAIN_MIN_SUCCESS_RATE", defaults.min_success_rate),
      consider_threshold: env_f32("BRAIN_CONSIDER_THRESHOLD", defaults.consider_threshold),
      provenance_discount: env_f32("BRAIN_PROVENANCE_DISCOUNT", defaults.provenance_discount),
      web_confidence: env_f32("BRAIN_WEB_CONFIDENCE", defaults.web_confidence),
      feedback_alpha: env_f32("BRAIN_FEEDBACK_ALPHA", defaults.feedback_alpha),
      match_nudge: env_f32("BRAIN_MATCH_NUDGE", defaults.match_nudge),
      learn_threshold: env_f32("BRAIN_LEARN_THRESHOLD", defaults.learn_threshold),
      max_external_sources: env_usize("BRAIN_MAX_EXTERNAL_SOURCES", defaults.max_external_sources),
      embed_timeout: env_secs("BRAIN_EMBED_TIMEOUT_SECS", defaults.embed_timeout),
      reasoning_timeout: env_secs("BRAIN_REASONING_TIMEOUT_SECS", defaults.reasoning_timeout),
      search_timeout: env_secs("BRAIN_SEARCH_TIMEOUT_SECS", defaults.search_timeout),
      feedback_ttl: env_secs("BRAIN_FEEDBACK_TTL_SECS", defaults.feedback_ttl),
      seed_catalog: env_bool("BRAIN_SEED_CATALOG", defaults.seed_catalog),
    }
  }

  /// Reject configurations the engine cannot run with. A missing timeout is
  /// a configuration bug, not an acceptable default.
  pub fn validate(&self) -> Result<(), BrainError> {
    if self.embedding_dimension == 0 {
      return Err(BrainError::invalid_config("embedding_dimension must be positive"));
    }
    if self.top_k == 0 {
      return Err(BrainError::invalid_config("top_k must be at least 1"));
    }
    for (name, value) in [
      ("direct_threshold", self.direct_threshold),
      ("min_success_rate", self.min_success_rate),
      ("consider_threshold", self.consider_threshold),
      ("provenance_discount", self.provenance_discount),
      ("web_confidence", self.web_confidence),
      ("feedback_alpha", self.feedback_alpha),
      ("match_nudge", self.match_nudge),
      ("learn_threshold", self.learn_threshold),
    ] {
      if !(0.0..=1.0).contains(&value) {
        return Err(BrainError::invalid_config(format!("{name} must be within [0, 1]")));
      }
    }
    if self.consider_threshold > self.direct_threshold {
      return Err(BrainError::invalid_config(
        "consider_threshold must not exceed direct_threshold",
      ));
    }
    for (name, timeout) in [
      ("embed_timeout", self.embed_timeout),
      ("reasoning_timeout", self.reasoning_timeout),
      ("search_timeout", self.search_timeout),
      ("feedback_ttl", self.feedback_ttl),
    ] {
      if timeout.is_zero() {
        return Err(BrainError::invalid_config(format!("{name} must be positive")));
      }
    }
    Ok(())
  }
}

fn env_f32(name: &str, default: f32) -> f32 {
  env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
  env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_secs(name: &str, default: Duration) -> Duration {
  env::var(name).ok().and_then(|v| v.parse().ok()).map(Duration::from_secs).unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
  env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_validate() {
    assert!(BrainConfig::default().validate().is_ok());
  }

  #[test]
  fn zero_dimension_is_rejected() {
    let config = BrainConfig { embedding_dimension: 0, ..Default::default() };
    assert!(config.validate().is_err());
  }

  #[test]
  fn zero_timeout_is_rejected() {
    let config = BrainConfig { reasoning_timeout: Duration::ZERO, ..Default::default() };
    assert!(config.validate().is_err());
  }

  #[test]
  fn out_of_range_threshold_is_rejected() {
    let config = BrainConfig { direct_threshold: 1.5, ..Default::default() };
    assert!(config.validate().is_err());
  }

  #[test]
  fn inverted_thresholds_are_rejected() {
    let config =
      BrainConfig { consider_threshold: 0.95, direct_threshold: 0.90, ..Default::default() };
    assert!(config.validate().is_err());
  }
}
