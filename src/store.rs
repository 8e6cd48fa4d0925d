//! Thread-safe aggregation of fetch outcomes.
//!
//! [`ResultStore`] is the only object that several workers write to during a
//! batch. Results and failures live behind a single mutex that is held only
//! for the duration of one insert, never across an `.await`.

use crate::models::{FetchFailure, FetchOutcome};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, error};

#[derive(Debug, Default)]
struct Ledger {
    results: HashMap<String, String>,
    failures: Vec<FetchFailure>,
}

/// Shared sink for worker outcomes during one batch.
#[derive(Debug, Default)]
pub struct ResultStore {
    ledger: Mutex<Ledger>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        // Inserts are single map operations; a poisoned ledger is still consistent.
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a terminal outcome.
    pub fn record(&self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Success { url, content } => {
                self.record_success(url, content);
            }
            FetchOutcome::Failure(failure) => self.record_failure(failure),
        }
    }

    /// Store content for `url`. The first write wins; returns `false` if the
    /// URL was already recorded.
    pub fn record_success(&self, url: String, content: String) -> bool {
        let bytes = content.len();
        let mut ledger = self.lock();
        if ledger.results.contains_key(&url) {
            return false;
        }
        ledger.results.insert(url.clone(), content);
        drop(ledger);
        debug!(%url, bytes, "Recorded fetched page");
        true
    }

    pub fn record_failure(&self, failure: FetchFailure) {
        error!(
            url = %failure.url,
            attempts = failure.attempts,
            error = %failure.last_error,
            "Fetch permanently failed"
        );
        self.lock().failures.push(failure);
    }

    /// Move everything recorded so far into a [`FetchReport`].
    pub fn take_report(&self) -> FetchReport {
        let ledger = std::mem::take(&mut *self.lock());
        FetchReport {
            results: ledger.results,
            failures: ledger.failures,
        }
    }
}

/// What a batch produced: content for every URL that succeeded and an
/// explicit entry for every URL that did not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub results: HashMap<String, String>,
    pub failures: Vec<FetchFailure>,
}

impl FetchReport {
    pub fn failed_urls(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.url.as_str()).collect()
    }

    pub fn total(&self) -> usize {
        self.results.len() + self.failures.len()
    }

    /// `true` when no URL failed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use std::sync::Arc;

    #[test]
    fn test_first_write_wins() {
        let store = ResultStore::new();
        assert!(store.record_success("a".to_string(), "first".to_string()));
        assert!(!store.record_success("a".to_string(), "second".to_string()));
        let report = store.take_report();
        assert_eq!(report.results["a"], "first");
    }

    #[test]
    fn test_record_outcomes() {
        let store = ResultStore::new();
        store.record(FetchOutcome::Success {
            url: "a".to_string(),
            content: "<html/>".to_string(),
        });
        store.record(FetchOutcome::Failure(FetchFailure {
            url: "b".to_string(),
            last_error: FetchError::fatal("malformed url"),
            attempts: 1,
        }));

        let report = store.take_report();
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.failed_urls(), vec!["b"]);
        assert_eq!(report.total(), 2);
        assert!(!report.is_complete());
        assert_eq!(store.take_report().total(), 0);
    }

    #[test]
    fn test_concurrent_writers() {
        let store = Arc::new(ResultStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.record_success(format!("{t}-{i}"), "x".to_string());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.take_report().results.len(), 400);
    }
}
