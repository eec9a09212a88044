//! Collaborator seams for external analysis.
//!
//! The generative-reasoning and web-search providers are opaque to the
//! engine: contract only, injected as trait objects. Production
//! implementations speak JSON over HTTP; the offline implementations let the
//! engine run memory-only.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::types::{ExternalSource, QueryHints, SolutionStep};

/// What the reasoning collaborator returns for one query.
#[derive(Debug, Clone)]
pub struct GeneratedAnalysis {
  pub issue: String,
  pub possible_causes: Vec<String>,
  pub recommended_steps: Vec<SolutionStep>,
  pub confidence_score: f32,
}

#[async_trait]
pub trait ReasoningProvider: Send + Sync {
  async fn analyze(&self, query: &str, hints: &QueryHints) -> Result<GeneratedAnalysis>;
}

#[async_trait]
pub trait WebSearchProvider: Send + Sync {
  async fn search(&self, query: &str) -> Result<Vec<ExternalSource>>;
}

// HTTP Providers
// ==============

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
  query: &'a str,
  device_category: Option<&'a str>,
  error_codes: Vec<&'a str>,
}

#[derive(Deserialize)]
struct AnalyzeResponse {
  issue: String,
  #[serde(default)]
  possible_causes: Vec<String>,
  #[serde(default)]
  recommended_steps: Vec<WireStep>,
  confidence_score: f32,
}

#[derive(Deserialize)]
struct WireStep {
  step_number: u32,
  description: String,
}

/// Client for a generative-reasoning service.
pub struct HttpReasoningProvider {
  client: Client,
  base_url: String,
}

impl HttpReasoningProvider {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self { client: Client::new(), base_url: base_url.into() }
  }
}

#[async_trait]
impl ReasoningProvider for HttpReasoningProvider {
  async fn analyze(&self, query: &str, hints: &QueryHints) -> Result<GeneratedAnalysis> {
    let request = AnalyzeRequest {
      query,
      device_category: hints.device_category.as_deref(),
      error_codes: hints.error_codes.iter().map(String::as_str).collect(),
    };

    let url = format!("{}/analyze", self.base_url);
    let response = self.client.post(&url).json(&request).send().await?;
    if !response.status().is_success() {
      return Err(anyhow!("reasoning service returned HTTP {}", response.status()));
    }

    let body: AnalyzeResponse = response.json().await?;
    Ok(GeneratedAnalysis {
      issue: body.issue,
      possible_causes: body.possible_causes,
      recommended_steps: body
        .recommended_steps
        .into_iter()
        .map(|s| SolutionStep::new(s.step_number, s.description))
        .collect(),
      confidence_score: body.confidence_score.clamp(0.0, 1.0),
    })
  }
}

#[derive(Serialize)]
struct SearchWireRequest<'a> {
  query: &'a str,
}

#[derive(Deserialize)]
struct SearchWireResponse {
  #[serde(default)]
  results: Vec<ExternalSource>,
}

/// Client for a web-search service.
pub struct HttpSearchProvider {
  client: Client,
  base_url: String,
}

impl HttpSearchProvider {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self { client: Client::new(), base_url: base_url.into() }
  }
}

#[async_trait]
impl WebSearchProvider for HttpSearchProvider {
  async fn search(&self, query: &str) -> Result<Vec<ExternalSource>> {
    // Steering the general-purpose search engine toward fix-it content
    let search_query = format!("{query} troubleshooting solution");
    let request = SearchWireRequest { query: &search_query };

    let url = format!("{}/search", self.base_url);
    let response = self.client.post(&url).json(&request).send().await?;
    if !response.status().is_success() {
      return Err(anyhow!("search service returned HTTP {}", response.status()));
    }

    let body: SearchWireResponse = response.json().await?;
    Ok(body.results)
  }
}

// Offline Providers
// =================

/// Placeholder used when no reasoning endpoint is configured; every call
/// fails, so the engine degrades to memory-only answers.
pub struct OfflineReasoningProvider;

#[async_trait]
impl ReasoningProvider for OfflineReasoningProvider {
  async fn analyze(&self, _query: &str, _hints: &QueryHints) -> Result<GeneratedAnalysis> {
    Err(anyhow!("no reasoning endpoint configured"))
  }
}

/// Placeholder used when no search endpoint is configured.
pub struct OfflineSearchProvider;

#[async_trait]
impl WebSearchProvider for OfflineSearchProvider {
  async fn search(&self, _query: &str) -> Result<Vec<ExternalSource>> {
    Err(anyhow!("no search endpoint configured"))
  }
}
