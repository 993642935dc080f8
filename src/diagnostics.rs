//! Per-session delivery diagnostics.
//!
//! Cheap atomic counters updated on the dispatch thread and snapshotted on
//! demand, so callers can report what a session actually delivered.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Live counters shared with the dispatch thread.
#[derive(Debug)]
pub struct StreamStats {
    session_id: Uuid,
    started_at: Mutex<Option<DateTime<Utc>>>,
    samples_delivered: AtomicU64,
    invalid_samples: AtomicU64,
}

impl StreamStats {
    pub(crate) fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at: Mutex::new(None),
            samples_delivered: AtomicU64::new(0),
            invalid_samples: AtomicU64::new(0),
        }
    }

    /// Record the first stream start; later restarts keep the original time.
    pub(crate) fn mark_started(&self) {
        if let Ok(mut started) = self.started_at.lock() {
            started.get_or_insert_with(Utc::now);
        }
    }

    pub(crate) fn record_sample(&self, valid: bool) {
        self.samples_delivered.fetch_add(1, Ordering::Relaxed);
        if !valid {
            self.invalid_samples.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Point-in-time view of the counters.
    pub fn snapshot(&self) -> StreamStatsSnapshot {
        StreamStatsSnapshot {
            session_id: self.session_id,
            started_at: self.started_at.lock().map(|guard| *guard).unwrap_or(None),
            samples_delivered: self.samples_delivered.load(Ordering::Relaxed),
            invalid_samples: self.invalid_samples.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of a session's delivery counters.
#[derive(Debug, Clone, Serialize)]
pub struct StreamStatsSnapshot {
    pub session_id: Uuid,
    pub started_at: Option<DateTime<Utc>>,
    pub samples_delivered: u64,
    pub invalid_samples: u64,
}

impl StreamStatsSnapshot {
    /// One-line summary for CLI output.
    pub fn summary(&self) -> String {
        format!(
            "session {}: {} samples delivered ({} invalid)",
            self.session_id, self.samples_delivered, self.invalid_samples
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = StreamStats::new();
        stats.record_sample(true);
        stats.record_sample(false);
        stats.record_sample(true);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.samples_delivered, 3);
        assert_eq!(snapshot.invalid_samples, 1);
        assert!(snapshot.started_at.is_none());
    }

    #[test]
    fn started_at_is_set_once() {
        let stats = StreamStats::new();
        stats.mark_started();
        let first = stats.snapshot().started_at;
        assert!(first.is_some());

        stats.mark_started();
        assert_eq!(stats.snapshot().started_at, first);
    }

    #[test]
    fn summary_mentions_sample_counts() {
        let stats = StreamStats::new();
        stats.record_sample(true);
        let summary = stats.snapshot().summary();
        assert!(summary.contains("1 samples delivered"));
    }
}
