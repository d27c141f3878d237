//! # Idempotent Log Merge
//!
//! A bounded FIFO with dedup-on-insert:
//!
//! - an entry whose ID is already present is ignored, and the very same
//!   snapshot is returned
//! - otherwise it is appended and the oldest entries are dropped until at
//!   most `max_entries` remain
//!
//! Redelivery and duplicate local computation are therefore no-ops. The
//! retained *set* does not depend on how concurrent writers interleave;
//! eviction order does, and that is accepted.

use std::iter;
use std::num::NonZeroUsize;

use xrift_shared::{Log, LogEntry};

/// Merges `entry` into `existing`, keeping at most `max_entries`.
#[must_use]
pub fn merge(existing: &Log, entry: LogEntry, max_entries: NonZeroUsize) -> Log {
    if existing.contains_id(&entry.id) {
        return existing.clone();
    }
    let overflow = (existing.len() + 1).saturating_sub(max_entries.get());
    existing
        .iter()
        .cloned()
        .chain(iter::once(entry))
        .skip(overflow)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use xrift_shared::LogKind;

    fn max(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn entry(id: &str, user_id: &str) -> LogEntry {
        LogEntry {
            id: id.to_owned(),
            kind: LogKind::Join,
            user_id: user_id.to_owned(),
            display_name: "Alice".to_owned(),
            avatar_url: None,
            timestamp: "10:00".to_owned(),
        }
    }

    #[test]
    fn test_merge_into_empty() {
        let merged = merge(&Log::new(), entry("join-user-1-0", "user-1"), max(20));
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0], entry("join-user-1-0", "user-1"));
    }

    #[test]
    fn test_duplicate_returns_same_snapshot() {
        let log: Log = vec![entry("join-user-1-0", "user-1")].into();
        let merged = merge(&log, entry("join-user-1-0", "user-1"), max(20));
        assert!(merged.is_same_snapshot(&log));
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_duplicate_id_wins_over_content() {
        let log: Log = vec![entry("join-user-1-0", "user-1")].into();
        let mut late = entry("join-user-1-0", "user-1");
        late.display_name = "Someone Else".into();
        let merged = merge(&log, late, max(20));
        assert!(merged.is_same_snapshot(&log));
        assert_eq!(merged[0].display_name, "Alice");
    }

    #[test]
    fn test_distinct_id_appends() {
        let log: Log = vec![entry("join-user-1-0", "user-1")].into();
        let merged = merge(&log, entry("leave-user-1-0", "user-1"), max(20));
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].id, "leave-user-1-0");
    }

    #[test]
    fn test_merge_twice_equals_once() {
        let log: Log = vec![entry("join-u1-0", "u1")].into();
        let once = merge(&log, entry("join-u2-0", "u2"), max(20));
        let twice = merge(&once, entry("join-u2-0", "u2"), max(20));
        assert!(twice.is_same_snapshot(&once));
    }

    #[test]
    fn test_evicts_oldest_first() {
        let log: Log = vec![
            entry("join-user-1-0", "user-1"),
            entry("join-user-2-0", "user-2"),
            entry("join-user-3-0", "user-3"),
        ]
        .into();
        let merged = merge(&log, entry("join-user-4-0", "user-4"), max(3));
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].id, "join-user-2-0");
        assert_eq!(merged[2].id, "join-user-4-0");
    }

    #[test]
    fn test_oversized_log_is_trimmed() {
        let log: Log = (0..5).map(|i| entry(&format!("join-u{i}-0"), &format!("u{i}"))).collect();
        let merged = merge(&log, entry("join-u9-0", "u9"), max(2));
        let ids: Vec<_> = merged.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["join-u4-0", "join-u9-0"]);
    }
}
