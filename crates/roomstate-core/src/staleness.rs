//! Out-of-order payload protection
//!
//! Concurrent fetches for the same entity can resolve in any order. When
//! enabled, a [`SequenceGuard`] remembers the highest sequence number
//! applied per entity and turns older payloads away. When disabled every
//! payload is applied in arrival order.

use crate::thread::{merge_threads, Thread, ThreadMergeOutcome};
use std::collections::HashMap;

/// Verdict of [`SequenceGuard::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Payload is newer than anything applied
    Apply,
    /// Payload is not newer than the applied one
    Stale {
        /// Sequence currently applied
        applied: u64,
    },
}

/// Last applied sequence number per entity id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceGuard {
    enabled: bool,
    applied: HashMap<String, u64>,
}

impl SequenceGuard {
    /// Guard that rejects stale payloads.
    pub fn new() -> Self {
        Self::with_enabled(true)
    }

    /// Guard honoring `enabled`; a disabled guard admits everything.
    pub fn with_enabled(enabled: bool) -> Self {
        Self {
            enabled,
            applied: HashMap::new(),
        }
    }

    /// Whether stale payloads are rejected.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Sequence last applied for `id`.
    pub fn applied(&self, id: &str) -> Option<u64> {
        self.applied.get(id).copied()
    }

    /// Decide whether a payload stamped `sequence` may be applied to `id`.
    ///
    /// Admitted sequences are recorded.
    pub fn admit(&mut self, id: &str, sequence: u64) -> Admission {
        if !self.enabled {
            return Admission::Apply;
        }
        match self.applied.get(id) {
            Some(&applied) if sequence <= applied => {
                tracing::warn!(id, sequence, applied, "rejected stale payload");
                Admission::Stale { applied }
            }
            _ => {
                self.applied.insert(id.to_string(), sequence);
                Admission::Apply
            }
        }
    }
}

/// [`merge_threads`] gated by `guard`.
///
/// Returns `None` when the payload is stale and `previous` was left as is.
pub fn merge_thread_sequenced(
    guard: &mut SequenceGuard,
    previous: &mut Thread,
    incoming: Thread,
    sequence: u64,
) -> Option<ThreadMergeOutcome> {
    let id = if incoming.id.is_empty() {
        previous.id.clone()
    } else {
        incoming.id.clone()
    };
    match guard.admit(&id, sequence) {
        Admission::Apply => Some(merge_threads(previous, incoming)),
        Admission::Stale { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_admits_only_newer_sequences() {
        let mut guard = SequenceGuard::new();
        assert_eq!(guard.admit("t", 2), Admission::Apply);
        assert_eq!(guard.admit("t", 1), Admission::Stale { applied: 2 });
        assert_eq!(guard.admit("t", 2), Admission::Stale { applied: 2 });
        assert_eq!(guard.admit("t", 3), Admission::Apply);
        assert_eq!(guard.admit("other", 1), Admission::Apply);
        assert_eq!(guard.applied("t"), Some(3));
    }

    #[test]
    fn test_disabled_guard_applies_everything() {
        let mut guard = SequenceGuard::with_enabled(false);
        assert_eq!(guard.admit("t", 5), Admission::Apply);
        assert_eq!(guard.admit("t", 1), Admission::Apply);
        assert_eq!(guard.applied("t"), None);
    }

    #[test]
    fn test_late_thread_payload_is_ignored() {
        let mut guard = SequenceGuard::new();
        let mut previous = Thread::from_raw(json!({"id": "t", "status": "open"})).unwrap();

        let newer = Thread::from_raw(json!({"id": "t", "status": "archived"})).unwrap();
        let older = Thread::from_raw(json!({"id": "t", "status": "open"})).unwrap();

        assert!(merge_thread_sequenced(&mut guard, &mut previous, newer, 2).is_some());
        assert!(merge_thread_sequenced(&mut guard, &mut previous, older, 1).is_none());
        assert_eq!(previous.status.as_deref(), Some("archived"));
    }
}
