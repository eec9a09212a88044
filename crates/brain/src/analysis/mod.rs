//! External analysis orchestration.
//!
//! When memory can't answer on its own, the reasoning and web-search
//! collaborators are invoked concurrently, each under its own timeout.
//! A failure on one side never aborts the other, and both failing is a
//! reportable outcome, not an error: the caller still gets whatever memory
//! candidate existed.

pub mod providers;

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::BrainConfig;
use crate::types::{CandidateSolution, CandidateSource, CanonicalQuery};
use providers::{ReasoningProvider, WebSearchProvider};

/// Result of one orchestrated analysis pass.
#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
  /// At least one fresh candidate came back (plus the memory candidate, if
  /// one was carried in).
  Candidates(Vec<CandidateSolution>),

  /// Both collaborators failed or produced nothing; only the memory
  /// candidate (if any) remains for a degraded answer.
  Failed(Option<CandidateSolution>),
}

pub struct AnalysisOrchestrator {
  reasoning: Arc<dyn ReasoningProvider>,
  search: Arc<dyn WebSearchProvider>,
  reasoning_timeout: Duration,
  search_timeout: Duration,
  web_confidence: f32,
}

impl AnalysisOrchestrator {
  pub fn new(
    reasoning: Arc<dyn ReasoningProvider>,
    search: Arc<dyn WebSearchProvider>,
    config: &BrainConfig,
  ) -> Self {
    Self {
      reasoning,
      search,
      reasoning_timeout: config.reasoning_timeout,
      search_timeout: config.search_timeout,
      web_confidence: config.web_confidence,
    }
  }

  /// Fan out to both collaborators and fan the results back in. Total
  /// latency is bounded by the slower of the two timeouts, not their sum.
  pub async fn analyze(
    &self,
    query: &CanonicalQuery,
    memory_candidate: Option<CandidateSolution>,
  ) -> AnalysisOutcome {
    let reasoning_call =
      timeout(self.reasoning_timeout, self.reasoning.analyze(&query.text, &query.hints));
    let search_call = timeout(self.search_timeout, self.search.search(&query.text));

    let (reasoning_result, search_result) = tokio::join!(reasoning_call, search_call);

    let generated = match reasoning_result {
      Ok(Ok(analysis)) => Some(CandidateSolution {
        source: CandidateSource::GeneratedAnalysis,
        confidence: analysis.confidence_score,
        issue: analysis.issue,
        causes: analysis.possible_causes,
        steps: analysis.recommended_steps,
        sources: Vec::new(),
      }),
      Ok(Err(error)) => {
        tracing::warn!(%error, "reasoning collaborator failed");
        None
      }
      Err(_) => {
        tracing::warn!(timeout = ?self.reasoning_timeout, "reasoning collaborator timed out");
        None
      }
    };

    let web = match search_result {
      Ok(Ok(snippets)) if !snippets.is_empty() => Some(CandidateSolution {
        source: CandidateSource::WebSearch,
        confidence: self.web_confidence,
        issue: query.text.clone(),
        causes: Vec::new(),
        steps: Vec::new(),
        sources: snippets,
      }),
      Ok(Ok(_)) => {
        tracing::debug!("web search returned no results");
        None
      }
      Ok(Err(error)) => {
        tracing::warn!(%error, "search collaborator failed");
        None
      }
      Err(_) => {
        tracing::warn!(timeout = ?self.search_timeout, "search collaborator timed out");
        None
      }
    };

    if generated.is_none() && web.is_none() {
      return AnalysisOutcome::Failed(memory_candidate);
    }

    let candidates =
      memory_candidate.into_iter().chain(generated).chain(web).collect::<Vec<_>>();
    AnalysisOutcome::Candidates(candidates)
  }
}
