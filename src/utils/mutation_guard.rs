use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::utils::error::AppError;

/// Stored outcome of a mutation, replayed for a repeated idempotency key
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedOutcome {
    pub status: u16,
    pub body: serde_json::Value,
}

struct LedgerEntry {
    outcome: RecordedOutcome,
    stored_at: Instant,
}

/// Serializes writes per record and remembers idempotency keys.
///
/// At most one mutation per record key is in flight; a concurrent second
/// write is rejected with `AppError::Conflict` rather than racing.
pub struct MutationGuard {
    in_flight: Mutex<HashSet<String>>,
    ledger: Mutex<HashMap<String, LedgerEntry>>,
    ttl: Duration,
}

/// Held while a write is running; releases the record on drop
pub struct MutationPermit<'a> {
    guard: &'a MutationGuard,
    record: String,
}

impl Drop for MutationPermit<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.guard.in_flight.lock() {
            in_flight.remove(&self.record);
        }
    }
}

impl MutationGuard {
    pub fn new(ttl: Duration) -> Self {
        MutationGuard {
            in_flight: Mutex::new(HashSet::new()),
            ledger: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// `record` is `<collection>/<id>`
    pub fn acquire(&self, record: &str) -> Result<MutationPermit<'_>, AppError> {
        let mut in_flight = self
            .in_flight
            .lock()
            .map_err(|_| AppError::Conflict("mutation guard poisoned".to_string()))?;

        if !in_flight.insert(record.to_string()) {
            log::warn!("⚠️ Concurrent write rejected for {}", record);
            return Err(AppError::Conflict(format!(
                "A write to {} is already in progress",
                record
            )));
        }

        Ok(MutationPermit {
            guard: self,
            record: record.to_string(),
        })
    }

    pub fn replay(&self, key: &str) -> Option<RecordedOutcome> {
        let ledger = self.ledger.lock().ok()?;
        ledger
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.outcome.clone())
    }

    pub fn record(&self, key: &str, outcome: RecordedOutcome) {
        if let Ok(mut ledger) = self.ledger.lock() {
            ledger.insert(
                key.to_string(),
                LedgerEntry {
                    outcome,
                    stored_at: Instant::now(),
                },
            );
        }
    }

    /// Drops ledger entries older than the TTL; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let ttl = self.ttl;
        match self.ledger.lock() {
            Ok(mut ledger) => {
                let before = ledger.len();
                ledger.retain(|_, entry| entry.stored_at.elapsed() < ttl);
                before - ledger.len()
            }
            Err(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_writer_conflicts_until_release() {
        let guard = MutationGuard::new(Duration::from_secs(60));

        let permit = guard.acquire("users/u1").unwrap();
        assert!(matches!(guard.acquire("users/u1"), Err(AppError::Conflict(_))));
        assert!(guard.acquire("users/u2").is_ok());

        drop(permit);
        assert!(guard.acquire("users/u1").is_ok());
    }

    #[test]
    fn test_replay_returns_recorded_outcome() {
        let guard = MutationGuard::new(Duration::from_secs(60));
        assert!(guard.replay("k1").is_none());

        let outcome = RecordedOutcome {
            status: 200,
            body: serde_json::json!({ "success": true }),
        };
        guard.record("k1", outcome.clone());
        assert_eq!(guard.replay("k1"), Some(outcome));
    }

    #[test]
    fn test_purge_expired_with_zero_ttl() {
        let guard = MutationGuard::new(Duration::from_secs(0));
        guard.record("k1", RecordedOutcome { status: 200, body: serde_json::Value::Null });

        assert!(guard.replay("k1").is_none());
        assert_eq!(guard.purge_expired(), 1);
        assert_eq!(guard.purge_expired(), 0);
    }
}
