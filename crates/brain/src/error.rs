//! Error taxonomy for the brain engine.
//!
//! Only genuine failures live here. "Both analysis sources failed" and "no
//! solution found" are business outcomes carried by
//! [`crate::analysis::AnalysisOutcome`] and [`crate::types::Outcome`], never
//! errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrainError {
  /// The caller's input carried no usable text in any arm of the union.
  #[error("no usable text in input: {0}")]
  InvalidInput(String),

  /// The embedding backend could not be reached. Recoverable: the caller
  /// treats the query as a guaranteed memory miss and proceeds to analysis.
  #[error("embedding service unavailable: {0}")]
  EmbeddingUnavailable(String),

  /// The memory store cannot be read or written. Fatal for the current
  /// request only; the caller should surface a retryable service error.
  #[error("memory store unavailable: {0}")]
  MemoryStoreUnavailable(String),

  /// A configuration invariant is broken (zero dimension, missing timeout,
  /// snapshot dimensionality mismatch). Never degraded around.
  #[error("invalid configuration: {0}")]
  InvalidConfig(String),
}

impl BrainError {
  pub fn invalid_input(message: impl Into<String>) -> Self {
    Self::InvalidInput(message.into())
  }

  pub fn embedding_unavailable(message: impl Into<String>) -> Self {
    Self::EmbeddingUnavailable(message.into())
  }

  pub fn store_unavailable(message: impl Into<String>) -> Self {
    Self::MemoryStoreUnavailable(message.into())
  }

  pub fn invalid_config(message: impl Into<String>) -> Self {
    Self::InvalidConfig(message.into())
  }
}
