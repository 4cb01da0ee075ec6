//! "Last request wins" sequencing for recomputations.
//!
//! Every recomputation is issued a sequence number. A result is only
//! accepted if no newer request has been issued since; superseded results
//! are dropped, never merged.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Issues monotonically increasing sequence numbers for one cart.
#[derive(Debug, Default)]
pub struct SequenceGate {
    latest: AtomicU64,
}

impl SequenceGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next sequence number. The first one is 1.
    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Most recently issued sequence number (0 before the first).
    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, seq: u64) -> bool {
        seq == self.latest()
    }

    /// Keep `value` only if `seq` is still the latest request.
    pub fn accept<T>(&self, seq: u64, value: T) -> Option<T> {
        let latest = self.latest();
        if seq == latest {
            Some(value)
        } else {
            debug!(seq, latest, "discarding superseded result");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_issue_is_monotonic() {
        let gate = SequenceGate::new();
        assert_eq!(gate.latest(), 0);
        assert_eq!(gate.issue(), 1);
        assert_eq!(gate.issue(), 2);
        assert!(gate.is_current(2));
        assert!(!gate.is_current(1));
    }

    #[test]
    fn test_superseded_result_dropped() {
        let gate = SequenceGate::new();
        let first = gate.issue();
        let second = gate.issue();
        assert_eq!(gate.accept(first, "old"), None);
        assert_eq!(gate.accept(second, "new"), Some("new"));
    }

    #[tokio::test]
    async fn test_slow_older_request_loses() {
        let gate = Arc::new(SequenceGate::new());

        let slow_seq = gate.issue();
        let slow_gate = Arc::clone(&gate);
        let slow = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            slow_gate.accept(slow_seq, "stale total")
        });

        let fast_seq = gate.issue();
        let fast_gate = Arc::clone(&gate);
        let fast = tokio::spawn(async move { fast_gate.accept(fast_seq, "fresh total") });

        assert_eq!(fast.await.unwrap(), Some("fresh total"));
        assert_eq!(slow.await.unwrap(), None);
    }
}
