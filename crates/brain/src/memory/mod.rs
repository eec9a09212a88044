//! Problem memory store.
//!
//! Persistent, append-mostly collection of problem/embedding pairs with
//! nearest-neighbor lookup. The store is the only component allowed to
//! mutate records. Writes to one record never block unrelated records:
//! every record sits behind its own lock inside an outer map lock, and
//! lookups clone fully-written snapshots, never partial state.
//!
//! Persistence is a JSON snapshot written through a temp file and rename,
//! so a crashed or cancelled request leaves either the previous snapshot
//! or the new one, never a torn file.

pub mod records;
pub mod search;
pub mod seed;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::config::BrainConfig;
use crate::error::BrainError;
use crate::types::renumber_steps;
use records::{clamp01, EmbeddingRecord, NewProblem, ProblemRecord, StoreStats};
use search::{cosine_similarity, rank_matches};

const SNAPSHOT_FILE: &str = "memory.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredProblem {
  record: ProblemRecord,
  embedding: EmbeddingRecord,
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
  dimension: usize,
  problems: Vec<StoredProblem>,
}

type RecordMap = HashMap<Uuid, Arc<RwLock<StoredProblem>>>;

#[derive(Debug)]
pub struct MemoryStore {
  dimension: usize,
  feedback_alpha: f32,
  match_nudge: f32,
  snapshot_path: PathBuf,
  records: RwLock<RecordMap>,

  /// Serializes snapshot writes so concurrent mutations can't interleave
  /// partially-built files.
  save_lock: Mutex<()>,
}

impl MemoryStore {
  /// Open (or create) a store rooted at `dir`. A snapshot recorded with a
  /// different embedding dimension refuses to load: dimensionality is fixed
  /// for the lifetime of a store.
  pub async fn open(dir: &Path, config: &BrainConfig) -> Result<Self, BrainError> {
    tokio::fs::create_dir_all(dir)
      .await
      .map_err(|e| BrainError::store_unavailable(format!("cannot create {}: {e}", dir.display())))?;

    let snapshot_path = dir.join(SNAPSHOT_FILE);
    let mut map = RecordMap::new();

    if snapshot_path.exists() {
      let bytes = tokio::fs::read(&snapshot_path)
        .await
        .map_err(|e| BrainError::store_unavailable(format!("cannot read snapshot: {e}")))?;
      let snapshot: Snapshot = serde_json::from_slice(&bytes)
        .map_err(|e| BrainError::store_unavailable(format!("corrupt snapshot: {e}")))?;

      if snapshot.dimension != config.embedding_dimension {
        return Err(BrainError::invalid_config(format!(
          "snapshot dimension {} does not match configured dimension {}",
          snapshot.dimension, config.embedding_dimension
        )));
      }

      for stored in snapshot.problems {
        map.insert(stored.record.id, Arc::new(RwLock::new(stored)));
      }
    }

    tracing::debug!(problems = map.len(), "memory store opened");

    Ok(Self {
      dimension: config.embedding_dimension,
      feedback_alpha: config.feedback_alpha,
      match_nudge: config.match_nudge,
      snapshot_path,
      records: RwLock::new(map),
      save_lock: Mutex::new(()),
    })
  }

  /// Nearest neighbors of `vector` by cosine similarity, at most `k`,
  /// ordered by the deterministic ranking contract.
  pub async fn lookup(
    &self,
    vector: &[f32],
    k: usize,
  ) -> Result<Vec<(ProblemRecord, f32)>, BrainError> {
    self.check_dimension(vector)?;

    let map = self.records.read().await;
    let mut matches = Vec::with_capacity(map.len());
    for stored in map.values() {
      let stored = stored.read().await;
      let similarity = cosine_similarity(vector, &stored.embedding.vector);
      matches.push((stored.record.clone(), similarity));
    }
    drop(map);

    rank_matches(&mut matches);
    matches.truncate(k);
    Ok(matches)
  }

  /// Insert a new problem, or fold it into the existing record when the
  /// canonical text already maps to one.
  pub async fn insert(
    &self,
    new: NewProblem,
    vector: Vec<f32>,
  ) -> Result<ProblemRecord, BrainError> {
    self.check_dimension(&vector)?;
    let record = self.upsert(new, vector).await;
    self.persist().await?;
    Ok(record)
  }

  /// Record that an existing problem matched a query: bumps usage and
  /// nudges confidence toward the observed similarity. Returns false when
  /// the id is unknown.
  pub async fn update_on_match(&self, id: Uuid, similarity: f32) -> Result<bool, BrainError> {
    let Some(entry) = self.entry(id).await else {
      return Ok(false);
    };

    {
      let mut stored = entry.write().await;
      let record = &mut stored.record;
      record.usage_count += 1;
      record.confidence_score = clamp01(
        record.confidence_score + (clamp01(similarity) - record.confidence_score) * self.match_nudge,
      );
      record.updated_at = Utc::now();
    }

    self.persist().await?;
    Ok(true)
  }

  /// Fold one feedback event into the record's success rate with an
  /// exponential moving average. Returns false when the id is unknown.
  pub async fn update_on_feedback(&self, id: Uuid, success: bool) -> Result<bool, BrainError> {
    let Some(entry) = self.entry(id).await else {
      return Ok(false);
    };

    {
      let mut stored = entry.write().await;
      let record = &mut stored.record;
      let observed = if success { 1.0 } else { 0.0 };
      record.success_rate =
        clamp01(record.success_rate * (1.0 - self.feedback_alpha) + observed * self.feedback_alpha);
      record.updated_at = Utc::now();
    }

    self.persist().await?;
    Ok(true)
  }

  /// Bulk-load problems, persisting once at the end. Used for the built-in
  /// catalog on first start.
  pub async fn seed(
    &self,
    problems: Vec<(NewProblem, Vec<f32>)>,
  ) -> Result<usize, BrainError> {
    let mut inserted = 0;
    for (new, vector) in problems {
      self.check_dimension(&vector)?;
      self.upsert(new, vector).await;
      inserted += 1;
    }
    self.persist().await?;
    Ok(inserted)
  }

  pub async fn is_empty(&self) -> bool {
    self.records.read().await.is_empty()
  }

  pub async fn len(&self) -> usize {
    self.records.read().await.len()
  }

  pub async fn stats(&self) -> StoreStats {
    let map = self.records.read().await;
    let mut stats = StoreStats {
      total_problems: map.len(),
      average_confidence: 0.0,
      average_success_rate: 0.0,
      total_usage: 0,
    };

    if map.is_empty() {
      return stats;
    }

    let mut confidence_sum = 0.0f32;
    let mut success_sum = 0.0f32;
    for stored in map.values() {
      let stored = stored.read().await;
      confidence_sum += stored.record.confidence_score;
      success_sum += stored.record.success_rate;
      stats.total_usage += stored.record.usage_count;
    }
    stats.average_confidence = confidence_sum / map.len() as f32;
    stats.average_success_rate = success_sum / map.len() as f32;
    stats
  }

  async fn entry(&self, id: Uuid) -> Option<Arc<RwLock<StoredProblem>>> {
    self.records.read().await.get(&id).cloned()
  }

  async fn upsert(&self, new: NewProblem, vector: Vec<f32>) -> ProblemRecord {
    let id = ProblemRecord::id_for(&new.problem_text);
    let now = Utc::now();

    let mut map = self.records.write().await;
    if let Some(existing) = map.get(&id) {
      let mut stored = existing.write().await;
      let record = &mut stored.record;

      // Re-learning an existing problem: a fresher, at-least-as-confident
      // answer replaces the payload; feedback history always survives.
      let new_confidence = clamp01(new.confidence_score);
      if new_confidence >= record.confidence_score {
        let mut steps = new.solution_steps;
        renumber_steps(&mut steps);
        record.solution_steps = steps;
        record.possible_causes = new.possible_causes;
        record.problem_type = new.problem_type;
      }
      record.confidence_score = record.confidence_score.max(new_confidence);
      record.error_codes.extend(new.error_codes);
      if record.device_category.is_none() {
        record.device_category = new.device_category;
      }
      record.updated_at = now;
      return record.clone();
    }

    let mut steps = new.solution_steps;
    renumber_steps(&mut steps);
    let record = ProblemRecord {
      id,
      problem_text: new.problem_text,
      problem_type: new.problem_type,
      device_category: new.device_category,
      error_codes: new.error_codes,
      possible_causes: new.possible_causes,
      solution_steps: steps,
      confidence_score: clamp01(new.confidence_score),
      success_rate: clamp01(new.success_rate),
      usage_count: 0,
      created_at: now,
      updated_at: now,
    };
    let embedding = EmbeddingRecord { problem_id: id, vector, created_at: now };
    map.insert(id, Arc::new(RwLock::new(StoredProblem { record: record.clone(), embedding })));
    record
  }

  fn check_dimension(&self, vector: &[f32]) -> Result<(), BrainError> {
    if vector.len() != self.dimension {
      return Err(BrainError::invalid_config(format!(
        "vector dimension {} does not match store dimension {}",
        vector.len(),
        self.dimension
      )));
    }
    Ok(())
  }

  async fn persist(&self) -> Result<(), BrainError> {
    let _guard = self.save_lock.lock().await;

    let map = self.records.read().await;
    let mut problems = Vec::with_capacity(map.len());
    for stored in map.values() {
      problems.push(stored.read().await.clone());
    }
    drop(map);

    let snapshot = Snapshot { dimension: self.dimension, problems };
    let bytes = serde_json::to_vec_pretty(&snapshot)
      .map_err(|e| BrainError::store_unavailable(format!("cannot encode snapshot: {e}")))?;

    let tmp_path = self.snapshot_path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &bytes)
      .await
      .map_err(|e| BrainError::store_unavailable(format!("cannot write snapshot: {e}")))?;
    tokio::fs::rename(&tmp_path, &self.snapshot_path)
      .await
      .map_err(|e| BrainError::store_unavailable(format!("cannot commit snapshot: {e}")))?;

    Ok(())
  }
}
