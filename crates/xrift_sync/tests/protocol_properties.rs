//! Property tests for the coordinator-free log protocol.

use std::num::NonZeroUsize;

use proptest::prelude::*;
use xrift_shared::{Log, LogEntry, LogKind, UserProfile};
use xrift_sync::{assign_id, create_entry, is_writer_among, merge, repair, CandidateSet, UserCache};

fn kind_strategy() -> impl Strategy<Value = LogKind> {
    prop_oneof![Just(LogKind::Join), Just(LogKind::Leave)]
}

/// Builds a log the way writers do: every entry gets its ID from the log
/// it was appended to.
fn build_log(events: &[(LogKind, String)], max: NonZeroUsize) -> Log {
    events.iter().fold(Log::new(), |log, (kind, user)| {
        let entry = create_entry(*kind, user, "Unknown", None, &log, "00:00".into());
        merge(&log, entry, max)
    })
}

proptest! {
    #[test]
    fn election_has_exactly_one_winner(ids in prop::collection::btree_set("[a-z0-9]{1,8}", 1..12)) {
        let candidates: Vec<Option<&str>> = ids.iter().map(|id| Some(id.as_str())).collect();
        let winners = ids
            .iter()
            .filter(|id| is_writer_among(candidates.iter().copied(), Some(id.as_str())))
            .count();
        prop_assert_eq!(winners, 1);
    }

    #[test]
    fn election_ignores_enumeration_order(mut ids in prop::collection::vec("[a-z]{1,4}", 1..10)) {
        let set: CandidateSet = ids.iter().cloned().collect();
        let writer = set.writer().map(str::to_owned);
        ids.reverse();
        let reversed: CandidateSet = ids.iter().cloned().collect();
        prop_assert_eq!(reversed.writer().map(str::to_owned), writer.clone());
        prop_assert!(is_writer_among(ids.iter().map(Some), writer.as_deref()));
    }

    #[test]
    fn merge_is_idempotent_and_bounded(
        events in prop::collection::vec((kind_strategy(), "u[0-4]"), 0..40),
        max in 1usize..10,
    ) {
        let max = NonZeroUsize::new(max).unwrap();
        let log = build_log(&events, max);
        prop_assert!(log.len() <= max.get());

        for entry in log.iter() {
            let again = merge(&log, entry.clone(), max);
            prop_assert!(again.is_same_snapshot(&log));
        }
    }

    #[test]
    fn ids_are_unique_within_a_log(events in prop::collection::vec((kind_strategy(), "u[0-4]"), 0..40)) {
        let log = build_log(&events, NonZeroUsize::new(64).unwrap());
        let mut ids: Vec<&str> = log.iter().map(|e| e.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        prop_assert_eq!(ids.len(), log.len());
    }

    #[test]
    fn repair_without_hits_is_same_snapshot(
        events in prop::collection::vec((kind_strategy(), "u[0-4]"), 0..20),
        known in prop::collection::vec("v[0-4]", 0..5),
    ) {
        let log = build_log(&events, NonZeroUsize::new(32).unwrap());
        let mut cache = UserCache::new();
        for id in &known {
            cache.observe(&UserProfile::new(id.clone(), "Somebody"));
        }
        prop_assert!(repair(&log, "Unknown", &cache).is_same_snapshot(&log));
    }
}

#[test]
fn replayed_write_from_second_client_is_noop() {
    let max = NonZeroUsize::new(20).unwrap();
    let candidates = ["A", "B"];

    // A wins the election for u3's arrival and writes.
    assert!(is_writer_among(candidates.map(Some), Some("A")));
    let written = create_entry(LogKind::Join, "u3", "Carol", None, &[], "09:00".into());
    let after_a = merge(&Log::new(), written, max);

    // B eventually sees A's log; its own attempt computes the same ID.
    assert!(!is_writer_among(candidates.map(Some), Some("B")));
    let stale_b: Vec<LogEntry> = Vec::new();
    let attempted = create_entry(LogKind::Join, "u3", "Carol", None, &stale_b, "09:01".into());
    assert_eq!(attempted.id, "join-u3-0");
    assert!(merge(&after_a, attempted, max).is_same_snapshot(&after_a));
}

#[test]
fn ids_advance_after_absorption() {
    let max = NonZeroUsize::new(20).unwrap();
    let mut log = Log::new();
    for expected in ["join-u1-0", "join-u1-1", "join-u1-2"] {
        assert_eq!(assign_id(LogKind::Join, "u1", &log), expected);
        let entry = create_entry(LogKind::Join, "u1", "Alice", None, &log, "00:00".into());
        log = merge(&log, entry, max);
    }
    assert_eq!(assign_id(LogKind::Leave, "u1", &log), "leave-u1-0");
}
