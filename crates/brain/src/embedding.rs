//! Embedding indexer: canonical text in, fixed-length vector out.
//!
//! Implementations sit behind the [`Embedder`] trait so the engine and its
//! tests can swap backends. [`HashingEmbedder`] is pure and deterministic;
//! [`HttpEmbedder`] talks to an external embedding daemon and degrades to
//! [`BrainError::EmbeddingUnavailable`] on any transport failure.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;
use uuid::Uuid;

use crate::error::BrainError;

#[async_trait]
pub trait Embedder: Send + Sync {
  /// Dimensionality of every vector this embedder produces.
  fn dimension(&self) -> usize;

  /// Embed one canonical text. Deterministic for identical input.
  async fn embed(&self, text: &str) -> Result<Vec<f32>, BrainError>;
}

// Hashing Embedder
// ================

/// In-process feature-hashing embedder. Each token lands in a bucket chosen
/// by FNV-1a, with the hash's top bit picking the contribution sign; the
/// result is L2-normalized. Identical normalized text yields bit-identical
/// vectors, which the round-trip and caching contracts rely on.
pub struct HashingEmbedder {
  dimension: usize,
}

impl HashingEmbedder {
  pub fn new(dimension: usize) -> Self {
    Self { dimension }
  }
}

#[async_trait]
impl Embedder for HashingEmbedder {
  fn dimension(&self) -> usize {
    self.dimension
  }

  async fn embed(&self, text: &str) -> Result<Vec<f32>, BrainError> {
    let mut vector = vec![0.0f32; self.dimension];

    for token in text.split_whitespace() {
      let hash = fnv1a(token.as_bytes());
      let bucket = (hash % self.dimension as u64) as usize;
      let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
      vector[bucket] += sign;
    }

    // Token pairs keep word order relevant without a real language model
    let tokens: Vec<&str> = text.split_whitespace().collect();
    for pair in tokens.windows(2) {
      let hash = fnv1a(format!("{} {}", pair[0], pair[1]).as_bytes());
      let bucket = (hash % self.dimension as u64) as usize;
      let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
      vector[bucket] += 0.5 * sign;
    }

    normalize_vector(&mut vector);
    Ok(vector)
  }
}

fn fnv1a(bytes: &[u8]) -> u64 {
  const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
  const PRIME: u64 = 0x100000001b3;
  bytes.iter().fold(OFFSET_BASIS, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(PRIME))
}

fn normalize_vector(vector: &mut [f32]) {
  let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
  if norm > 0.0 {
    for value in vector.iter_mut() {
      *value /= norm;
    }
  }
}

// HTTP Embedder
// =============

#[derive(Serialize)]
struct EmbedRequest {
  texts: Vec<String>,
  id: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
  embeddings: Vec<Vec<f32>>,
  error: Option<String>,
}

/// Client for an external embedding daemon speaking the
/// `{texts} -> {embeddings | error}` JSON contract.
pub struct HttpEmbedder {
  client: Client,
  base_url: String,
  dimension: usize,
  timeout: Duration,
}

impl HttpEmbedder {
  pub fn new(base_url: impl Into<String>, dimension: usize, timeout: Duration) -> Self {
    Self { client: Client::new(), base_url: base_url.into(), dimension, timeout }
  }
}

#[async_trait]
impl Embedder for HttpEmbedder {
  fn dimension(&self) -> usize {
    self.dimension
  }

  async fn embed(&self, text: &str) -> Result<Vec<f32>, BrainError> {
    let request = EmbedRequest { texts: vec![text.to_string()], id: Uuid::new_v4().to_string() };
    let url = format!("{}/embed", self.base_url);

    let response = timeout(self.timeout, self.client.post(&url).json(&request).send())
      .await
      .map_err(|_| BrainError::embedding_unavailable("embedding request timed out"))?
      .map_err(|e| BrainError::embedding_unavailable(e.to_string()))?;

    if !response.status().is_success() {
      return Err(BrainError::embedding_unavailable(format!(
        "embedding daemon returned HTTP {}",
        response.status()
      )));
    }

    let body: EmbedResponse =
      response.json().await.map_err(|e| BrainError::embedding_unavailable(e.to_string()))?;
    if let Some(error) = body.error {
      return Err(BrainError::embedding_unavailable(error));
    }

    let vector = body
      .embeddings
      .into_iter()
      .next()
      .ok_or_else(|| BrainError::embedding_unavailable("daemon returned no embedding"))?;

    // A daemon serving the wrong model is a deployment problem, not a miss
    if vector.len() != self.dimension {
      return Err(BrainError::invalid_config(format!(
        "embedding daemon returned dimension {}, store expects {}",
        vector.len(),
        self.dimension
      )));
    }

    Ok(vector)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn identical_text_embeds_identically() {
    let embedder = HashingEmbedder::new(64);
    let a = embedder.embed("tv screen is black").await.unwrap();
    let b = embedder.embed("tv screen is black").await.unwrap();
    assert_eq!(a, b);
  }

  #[tokio::test]
  async fn vectors_have_configured_dimension_and_unit_norm() {
    let embedder = HashingEmbedder::new(96);
    let vector = embedder.embed("phone will not charge").await.unwrap();
    assert_eq!(vector.len(), 96);
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-5);
  }

  #[tokio::test]
  async fn different_text_embeds_differently() {
    let embedder = HashingEmbedder::new(128);
    let a = embedder.embed("tv screen is black").await.unwrap();
    let b = embedder.embed("smartwatch will not sync").await.unwrap();
    assert_ne!(a, b);
  }

  #[tokio::test]
  async fn unreachable_daemon_degrades_to_unavailable() {
    let embedder =
      HttpEmbedder::new("http://127.0.0.1:1", 384, Duration::from_millis(200));
    let err = embedder.embed("anything").await.unwrap_err();
    assert!(matches!(err, BrainError::EmbeddingUnavailable(_)));
  }
}
