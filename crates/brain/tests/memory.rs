//! Memory store contract: lookup ordering, update semantics, persistence.

use std::collections::BTreeSet;
use tempfile::TempDir;
use uuid::Uuid;

use brain::embedding::{Embedder, HashingEmbedder};
use brain::error::BrainError;
use brain::memory::records::{NewProblem, ProblemRecord};
use brain::memory::MemoryStore;
use brain::types::SolutionStep;
use brain::BrainConfig;

const DIMENSION: usize = 64;

fn config() -> BrainConfig {
  BrainConfig { embedding_dimension: DIMENSION, ..Default::default() }
}

async fn embed(text: &str) -> Vec<f32> {
  HashingEmbedder::new(DIMENSION).embed(text).await.unwrap()
}

fn problem(text: &str, confidence: f32, success_rate: f32) -> NewProblem {
  NewProblem {
    problem_text: text.to_string(),
    problem_type: "test".to_string(),
    device_category: None,
    error_codes: BTreeSet::new(),
    possible_causes: vec!["a cause".to_string()],
    solution_steps: vec![SolutionStep::new(1, "do the thing")],
    confidence_score: confidence,
    success_rate,
  }
}

#[tokio::test]
async fn insert_then_lookup_round_trips_with_unit_similarity() {
  let dir = TempDir::new().unwrap();
  let store = MemoryStore::open(dir.path(), &config()).await.unwrap();

  let text = "phone will not turn on";
  let record = store.insert(problem(text, 0.9, 0.8), embed(text).await).await.unwrap();

  let matches = store.lookup(&embed(text).await, 3).await.unwrap();
  assert_eq!(matches.len(), 1);
  assert_eq!(matches[0].0.id, record.id);
  assert!((matches[0].1 - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn lookup_returns_at_most_k_in_descending_similarity() {
  let dir = TempDir::new().unwrap();
  let store = MemoryStore::open(dir.path(), &config()).await.unwrap();

  for text in [
    "tv screen is black",
    "tv has no sound at all",
    "phone battery drains quickly",
    "printer shows a paper jam",
  ] {
    store.insert(problem(text, 0.9, 0.8), embed(text).await).await.unwrap();
  }

  let matches = store.lookup(&embed("tv screen is black").await, 2).await.unwrap();
  assert_eq!(matches.len(), 2);
  assert!(matches[0].1 >= matches[1].1);
  assert_eq!(matches[0].0.problem_text, "tv screen is black");
}

#[tokio::test]
async fn match_update_bumps_usage_and_nudges_confidence() {
  let dir = TempDir::new().unwrap();
  let cfg = config();
  let store = MemoryStore::open(dir.path(), &cfg).await.unwrap();

  let text = "router keeps rebooting";
  let record = store.insert(problem(text, 0.5, 0.8), embed(text).await).await.unwrap();

  assert!(store.update_on_match(record.id, 1.0).await.unwrap());

  let matches = store.lookup(&embed(text).await, 1).await.unwrap();
  let updated = &matches[0].0;
  assert_eq!(updated.usage_count, 1);
  let expected = 0.5 + (1.0 - 0.5) * cfg.match_nudge;
  assert!((updated.confidence_score - expected).abs() < 1e-5);
  assert!(updated.updated_at >= record.updated_at);
}

#[tokio::test]
async fn feedback_update_is_an_exponential_moving_average() {
  let dir = TempDir::new().unwrap();
  let store = MemoryStore::open(dir.path(), &config()).await.unwrap();

  let text = "laptop fan is loud";
  let record = store.insert(problem(text, 0.9, 0.8), embed(text).await).await.unwrap();

  // 0.8 * 0.8 + 0 * 0.2 = 0.64
  assert!(store.update_on_feedback(record.id, false).await.unwrap());
  let matches = store.lookup(&embed(text).await, 1).await.unwrap();
  assert!((matches[0].0.success_rate - 0.64).abs() < 1e-5);

  // 0.64 * 0.8 + 1 * 0.2 = 0.712
  assert!(store.update_on_feedback(record.id, true).await.unwrap());
  let matches = store.lookup(&embed(text).await, 1).await.unwrap();
  assert!((matches[0].0.success_rate - 0.712).abs() < 1e-5);
}

#[tokio::test]
async fn updates_for_unknown_ids_report_not_found() {
  let dir = TempDir::new().unwrap();
  let store = MemoryStore::open(dir.path(), &config()).await.unwrap();

  assert!(!store.update_on_match(Uuid::new_v4(), 0.9).await.unwrap());
  assert!(!store.update_on_feedback(Uuid::new_v4(), true).await.unwrap());
}

#[tokio::test]
async fn scores_are_clamped_into_the_unit_interval() {
  let dir = TempDir::new().unwrap();
  let store = MemoryStore::open(dir.path(), &config()).await.unwrap();

  let text = "smart plug never pairs";
  let record = store.insert(problem(text, 3.0, -0.5), embed(text).await).await.unwrap();
  assert_eq!(record.confidence_score, 1.0);
  assert_eq!(record.success_rate, 0.0);
}

#[tokio::test]
async fn reinserting_the_same_problem_upserts_in_place() {
  let dir = TempDir::new().unwrap();
  let store = MemoryStore::open(dir.path(), &config()).await.unwrap();

  let text = "tv remote not working";
  let vector = embed(text).await;
  let first = store.insert(problem(text, 0.6, 0.5), vector.clone()).await.unwrap();
  store.update_on_feedback(first.id, true).await.unwrap();

  let mut refreshed = problem(text, 0.8, 0.5);
  refreshed.solution_steps =
    vec![SolutionStep::new(1, "replace the batteries"), SolutionStep::new(2, "re-pair the remote")];
  let second = store.insert(refreshed, vector).await.unwrap();

  assert_eq!(store.len().await, 1);
  assert_eq!(second.id, first.id);
  assert_eq!(second.confidence_score, 0.8);
  assert_eq!(second.solution_steps.len(), 2);
  // Feedback history survives re-learning
  assert!((second.success_rate - 0.6).abs() < 1e-5);
}

#[tokio::test]
async fn lower_confidence_reinsert_keeps_existing_payload() {
  let dir = TempDir::new().unwrap();
  let store = MemoryStore::open(dir.path(), &config()).await.unwrap();

  let text = "tv remote not working";
  let vector = embed(text).await;
  store.insert(problem(text, 0.9, 0.5), vector.clone()).await.unwrap();

  let mut weaker = problem(text, 0.4, 0.5);
  weaker.solution_steps = vec![SolutionStep::new(1, "shout at the remote")];
  let merged = store.insert(weaker, vector).await.unwrap();

  assert_eq!(merged.confidence_score, 0.9);
  assert_eq!(merged.solution_steps[0].description, "do the thing");
}

#[tokio::test]
async fn snapshot_survives_reopen() {
  let dir = TempDir::new().unwrap();
  let text = "printer shows a paper jam";

  {
    let store = MemoryStore::open(dir.path(), &config()).await.unwrap();
    store.insert(problem(text, 0.9, 0.8), embed(text).await).await.unwrap();
  }

  let reopened = MemoryStore::open(dir.path(), &config()).await.unwrap();
  assert_eq!(reopened.len().await, 1);
  let matches = reopened.lookup(&embed(text).await, 1).await.unwrap();
  assert!((matches[0].1 - 1.0).abs() < 1e-5);
  assert_eq!(matches[0].0.problem_text, text);
}

#[tokio::test]
async fn snapshot_with_wrong_dimension_refuses_to_load() {
  let dir = TempDir::new().unwrap();
  {
    let store = MemoryStore::open(dir.path(), &config()).await.unwrap();
    let text = "tv has no sound";
    store.insert(problem(text, 0.9, 0.8), embed(text).await).await.unwrap();
  }

  let other = BrainConfig { embedding_dimension: 128, ..Default::default() };
  let err = MemoryStore::open(dir.path(), &other).await.unwrap_err();
  assert!(matches!(err, BrainError::InvalidConfig(_)));
}

#[tokio::test]
async fn mismatched_vector_dimension_is_a_config_error() {
  let dir = TempDir::new().unwrap();
  let store = MemoryStore::open(dir.path(), &config()).await.unwrap();

  let err = store.lookup(&vec![0.0; 16], 3).await.unwrap_err();
  assert!(matches!(err, BrainError::InvalidConfig(_)));

  let err = store.insert(problem("text", 0.5, 0.5), vec![0.0; 16]).await.unwrap_err();
  assert!(matches!(err, BrainError::InvalidConfig(_)));
}

#[tokio::test]
async fn record_ids_collapse_identical_problem_texts() {
  assert_eq!(
    ProblemRecord::id_for("TV Remote Not Working"),
    ProblemRecord::id_for("tv remote not working")
  );
}

#[tokio::test]
async fn concurrent_updates_to_the_same_record_lose_nothing() {
  let dir = TempDir::new().unwrap();
  let store = std::sync::Arc::new(MemoryStore::open(dir.path(), &config()).await.unwrap());

  let text = "tv screen is black";
  let record = store.insert(problem(text, 0.9, 0.8), embed(text).await).await.unwrap();

  let mut handles = Vec::new();
  for _ in 0..20 {
    let store = store.clone();
    let id = record.id;
    handles.push(tokio::spawn(async move { store.update_on_match(id, 0.9).await }));
  }
  for handle in handles {
    assert!(handle.await.unwrap().unwrap());
  }

  let matches = store.lookup(&embed(text).await, 1).await.unwrap();
  assert_eq!(matches[0].0.usage_count, 20);
}
