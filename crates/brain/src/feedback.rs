//! Feedback ledger: maps a delivered query id to the record it was answered
//! from, for long enough to plausibly receive feedback.
//!
//! Entries are consumed on first submit and pruned lazily on expiry, so a
//! repeated or late submission is a no-op rather than a second reinforcement.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
struct LedgerEntry {
  record_id: Uuid,
  expires_at: DateTime<Utc>,
}

pub struct FeedbackLedger {
  ttl: ChronoDuration,
  entries: Mutex<HashMap<Uuid, LedgerEntry>>,
}

impl FeedbackLedger {
  pub fn new(ttl: Duration) -> Self {
    let ttl = ChronoDuration::from_std(ttl).unwrap_or_else(|_| ChronoDuration::seconds(900));
    Self { ttl, entries: Mutex::new(HashMap::new()) }
  }

  /// Remember which record answered `query_id`. Called at response time.
  pub fn register(&self, query_id: Uuid, record_id: Uuid) {
    let entry = LedgerEntry { record_id, expires_at: Utc::now() + self.ttl };
    let mut entries = self.entries.lock().expect("ledger lock poisoned");
    entries.insert(query_id, entry);
  }

  /// Resolve and consume the mapping for `query_id`. Returns `None` for
  /// unknown, already-consumed, or expired ids.
  pub fn take(&self, query_id: &Uuid) -> Option<Uuid> {
    let now = Utc::now();
    let mut entries = self.entries.lock().expect("ledger lock poisoned");
    entries.retain(|_, entry| entry.expires_at > now);
    entries.remove(query_id).map(|entry| entry.record_id)
  }

  #[cfg(test)]
  fn len(&self) -> usize {
    self.entries.lock().expect("ledger lock poisoned").len()
  }
}

/// Validate an optional 1-5 satisfaction score.
pub fn score_in_range(score: Option<u8>) -> bool {
  score.is_none_or(|s| (1..=5).contains(&s))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn register_then_take_resolves_once() {
    let ledger = FeedbackLedger::new(Duration::from_secs(60));
    let query_id = Uuid::new_v4();
    let record_id = Uuid::new_v4();

    ledger.register(query_id, record_id);
    assert_eq!(ledger.take(&query_id), Some(record_id));
    // Consumed: the second submission is a no-op
    assert_eq!(ledger.take(&query_id), None);
  }

  #[test]
  fn unknown_ids_resolve_to_none() {
    let ledger = FeedbackLedger::new(Duration::from_secs(60));
    assert_eq!(ledger.take(&Uuid::new_v4()), None);
  }

  #[test]
  fn expired_entries_are_pruned() {
    let ledger = FeedbackLedger::new(Duration::from_millis(1));
    let query_id = Uuid::new_v4();
    ledger.register(query_id, Uuid::new_v4());

    std::thread::sleep(Duration::from_millis(10));
    assert_eq!(ledger.take(&query_id), None);
    assert_eq!(ledger.len(), 0);
  }

  #[test]
  fn score_validation() {
    assert!(score_in_range(None));
    assert!(score_in_range(Some(1)));
    assert!(score_in_range(Some(5)));
    assert!(!score_in_range(Some(0)));
    assert!(!score_in_range(Some(6)));
  }
}
