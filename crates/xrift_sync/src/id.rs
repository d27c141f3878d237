//! # Deterministic Entry IDs
//!
//! An entry's ID is `"{kind}-{user_id}-{n}"` where `n` counts the entries
//! already in the log with the same kind and user. It depends only on the
//! log's content, never on the clock or on which client computed it.
//!
//! Two different transitions computed from the same stale snapshot collide
//! and the later one is dropped by [`merge`](crate::merge). Writer election
//! keeps that from happening in practice.

use xrift_shared::{LogEntry, LogKind};

/// Computes the ID for a new `(kind, user_id)` entry against `existing`.
#[must_use]
pub fn assign_id(kind: LogKind, user_id: &str, existing: &[LogEntry]) -> String {
    let count = existing
        .iter()
        .filter(|entry| entry.kind == kind && entry.user_id == user_id)
        .count();
    format!("{kind}-{user_id}-{count}")
}

/// Builds a new entry whose ID is assigned against `existing`.
#[must_use]
pub fn create_entry(
    kind: LogKind,
    user_id: &str,
    display_name: &str,
    avatar_url: Option<&str>,
    existing: &[LogEntry],
    timestamp: String,
) -> LogEntry {
    LogEntry {
        id: assign_id(kind, user_id, existing),
        kind,
        user_id: user_id.to_owned(),
        display_name: display_name.to_owned(),
        avatar_url: avatar_url.map(str::to_owned),
        timestamp,
    }
}
