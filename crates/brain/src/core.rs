//! Brain core: the single entry point.
//!
//! One resolve call walks the pipeline in order: normalize, embed, memory
//! lookup, match evaluation, then either a direct memory answer or a fused
//! answer from concurrent external analysis. Everything learned along the
//! way flows back into the memory store.

use chrono::Utc;
use std::sync::Arc;
use tokio::time::timeout;
use uuid::Uuid;

use crate::analysis::providers::{ReasoningProvider, WebSearchProvider};
use crate::analysis::{AnalysisOrchestrator, AnalysisOutcome};
use crate::config::BrainConfig;
use crate::embedding::Embedder;
use crate::error::BrainError;
use crate::evaluator::{self, MatchDecision};
use crate::feedback::{self, FeedbackLedger};
use crate::fusion;
use crate::memory::records::{NewProblem, ProblemRecord, StoreStats};
use crate::memory::{seed, MemoryStore};
use crate::normalize;
use crate::types::{
  CandidateSolution, CandidateSource, CanonicalQuery, FeedbackEvent, Outcome, QueryFingerprint,
  RawInput, Resolution, Solution,
};

pub struct BrainCore {
  config: BrainConfig,
  store: MemoryStore,
  embedder: Arc<dyn Embedder>,
  orchestrator: AnalysisOrchestrator,
  ledger: FeedbackLedger,
}

impl BrainCore {
  /// Wire the engine together. Collaborators are injected so callers (and
  /// tests) choose the backends; the store handle is owned, not global.
  pub async fn new(
    config: BrainConfig,
    store: MemoryStore,
    embedder: Arc<dyn Embedder>,
    reasoning: Arc<dyn ReasoningProvider>,
    search: Arc<dyn WebSearchProvider>,
  ) -> Result<Self, BrainError> {
    config.validate()?;
    if embedder.dimension() != config.embedding_dimension {
      return Err(BrainError::invalid_config(format!(
        "embedder dimension {} does not match configured dimension {}",
        embedder.dimension(),
        config.embedding_dimension
      )));
    }

    let orchestrator = AnalysisOrchestrator::new(reasoning, search, &config);
    let ledger = FeedbackLedger::new(config.feedback_ttl);
    let core = Self { config, store, embedder, orchestrator, ledger };

    if core.config.seed_catalog && core.store.is_empty().await {
      core.seed_catalog().await?;
    }

    Ok(core)
  }

  /// Resolve one troubleshooting query. Every resolvable path yields a
  /// solution (possibly low-confidence) or an explicit no-solution outcome;
  /// analysis-source failures never surface as errors.
  pub async fn resolve(
    &self,
    input: RawInput,
    hint: Option<&str>,
  ) -> Result<Resolution, BrainError> {
    let query_id = Uuid::new_v4();
    let query = normalize::normalize(&input, hint)?;

    // The fingerprint lives for this request only; it is never persisted
    let fingerprint = match self.embed(&query.text).await {
      Ok(embedding) => Some(QueryFingerprint {
        text: query.text.clone(),
        hints: query.hints.clone(),
        embedding,
      }),
      Err(BrainError::EmbeddingUnavailable(reason)) => {
        tracing::warn!(%reason, "embedding unavailable, treating query as memory miss");
        None
      }
      Err(other) => return Err(other),
    };

    let matches = match &fingerprint {
      Some(fingerprint) => self.store.lookup(&fingerprint.embedding, self.config.top_k).await?,
      None => Vec::new(),
    };

    match evaluator::evaluate(&matches, &self.config) {
      MatchDecision::Direct { record, similarity } => {
        self.store.update_on_match(record.id, similarity).await?;
        self.ledger.register(query_id, record.id);
        tracing::info!(%query_id, record_id = %record.id, similarity, "direct memory hit");
        let solution = solution_from_record(&record);
        Ok(Resolution { query_id, outcome: Outcome::Solved { solution } })
      }
      MatchDecision::Uncertain { best } => {
        self.resolve_with_analysis(query_id, query, fingerprint, best).await
      }
    }
  }

  /// Best-effort feedback intake. Logs and swallows every failure mode:
  /// feedback must never block or fail the caller's request.
  pub async fn feedback(&self, query_id: Uuid, success: bool, score: Option<u8>) {
    if !feedback::score_in_range(score) {
      tracing::warn!(%query_id, ?score, "ignoring feedback with out-of-range score");
      return;
    }

    let event = FeedbackEvent { query_id, success, score, created_at: Utc::now() };
    let Some(record_id) = self.ledger.take(&event.query_id) else {
      tracing::warn!(%query_id, "feedback for unknown or expired query id");
      return;
    };

    match self.store.update_on_feedback(record_id, event.success).await {
      Ok(true) => {
        tracing::debug!(%query_id, %record_id, success = event.success, "feedback applied")
      }
      Ok(false) => tracing::warn!(%record_id, "feedback target record no longer present"),
      Err(error) => tracing::warn!(%error, "feedback update failed"),
    }
  }

  pub async fn stats(&self) -> StoreStats {
    self.store.stats().await
  }

  async fn resolve_with_analysis(
    &self,
    query_id: Uuid,
    query: CanonicalQuery,
    fingerprint: Option<QueryFingerprint>,
    best: Option<(ProblemRecord, f32)>,
  ) -> Result<Resolution, BrainError> {
    let memory_candidate =
      best.as_ref().map(|(record, similarity)| memory_candidate(record, *similarity));

    let candidates = match self.orchestrator.analyze(&query, memory_candidate).await {
      AnalysisOutcome::Candidates(candidates) => candidates,
      AnalysisOutcome::Failed(memory) => {
        tracing::warn!(%query_id, "all analysis sources failed, degrading to memory only");
        memory.into_iter().collect()
      }
    };

    let Some(solution) = fusion::fuse(candidates, &self.config) else {
      tracing::info!(%query_id, "no solution found");
      return Ok(Resolution { query_id, outcome: Outcome::NoSolutionFound });
    };

    let embedding = fingerprint.map(|fingerprint| fingerprint.embedding);
    let record_id = self.learn(&query, embedding.as_deref(), &solution, best.as_ref()).await?;
    if let Some(record_id) = record_id {
      self.ledger.register(query_id, record_id);
    }

    Ok(Resolution { query_id, outcome: Outcome::Solved { solution } })
  }

  /// The learning write path: credit the contributing memory candidate, and
  /// persist a confident-enough fused answer so the next similar query is a
  /// memory hit.
  async fn learn(
    &self,
    query: &CanonicalQuery,
    embedding: Option<&[f32]>,
    solution: &Solution,
    best: Option<&(ProblemRecord, f32)>,
  ) -> Result<Option<Uuid>, BrainError> {
    if let Some((record, similarity)) = best {
      self.store.update_on_match(record.id, *similarity).await?;
    }

    if solution.confidence_score >= self.config.learn_threshold {
      if let Some(vector) = embedding {
        let new = NewProblem {
          problem_text: query.text.clone(),
          problem_type: "learned".to_string(),
          device_category: query.hints.device_category.clone(),
          error_codes: query.hints.error_codes.clone(),
          possible_causes: solution.possible_causes.clone(),
          solution_steps: solution.recommended_steps.clone(),
          confidence_score: solution.confidence_score,
          // Neutral prior; feedback moves it from here
          success_rate: 0.5,
        };
        let record = self.store.insert(new, vector.to_vec()).await?;
        tracing::info!(record_id = %record.id, "learned new problem");
        return Ok(Some(record.id));
      }
    }

    Ok(best.map(|(record, _)| record.id))
  }

  async fn embed(&self, text: &str) -> Result<Vec<f32>, BrainError> {
    match timeout(self.config.embed_timeout, self.embedder.embed(text)).await {
      Ok(result) => result,
      Err(_) => Err(BrainError::embedding_unavailable("embedding call timed out")),
    }
  }

  async fn seed_catalog(&self) -> Result<(), BrainError> {
    let mut seeded = Vec::new();
    for new in seed::catalog() {
      match self.embed(&new.problem_text).await {
        Ok(vector) => seeded.push((new, vector)),
        Err(BrainError::EmbeddingUnavailable(reason)) => {
          tracing::warn!(%reason, "embedding unavailable, skipping catalog seeding");
          return Ok(());
        }
        Err(other) => return Err(other),
      }
    }

    let count = self.store.seed(seeded).await?;
    tracing::info!(count, "seeded built-in problem catalog");
    Ok(())
  }
}

/// A direct hit answers with the record as stored; its confidence is the
/// record's own, not a fused score.
fn solution_from_record(record: &ProblemRecord) -> Solution {
  Solution {
    issue: record.problem_text.clone(),
    possible_causes: record.possible_causes.clone(),
    confidence_score: record.confidence_score,
    recommended_steps: record.solution_steps.clone(),
    external_sources: Vec::new(),
  }
}

/// An uncertain memory match enters fusion weighted by how similar it was
/// and how often it actually worked.
fn memory_candidate(record: &ProblemRecord, similarity: f32) -> CandidateSolution {
  let confidence =
    (record.confidence_score * similarity.clamp(0.0, 1.0) * record.success_rate).clamp(0.0, 1.0);
  CandidateSolution {
    source: CandidateSource::UncertainMemory,
    confidence,
    issue: record.problem_text.clone(),
    causes: record.possible_causes.clone(),
    steps: record.solution_steps.clone(),
    sources: Vec::new(),
  }
}
