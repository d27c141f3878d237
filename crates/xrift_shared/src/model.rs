//! # Log Model
//!
//! The records every client reads from and writes to the synchronized-state
//! store.
//!
//! ## Persisted Shape
//!
//! ```text
//! [
//!   { "id": "join-u1-0", "type": "join", "userId": "u1",
//!     "displayName": "Alice", "avatarUrl": null, "timestamp": "09:05" },
//!   ...
//! ]
//! ```
//!
//! Field names are part of the wire contract with other clients. Do not
//! rename them.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_JOIN_LABEL, DEFAULT_LEAVE_LABEL};

/// Presence transition recorded by a log entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    /// User entered the instance.
    Join,
    /// User left the instance.
    Leave,
}

impl LogKind {
    /// Returns the wire name (`"join"` / `"leave"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Leave => "leave",
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One presence transition.
///
/// `id`, `kind`, `user_id` and `timestamp` never change once written.
/// `display_name` and `avatar_url` may be rewritten by a repair pass when
/// they were written with a fallback label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Deterministic identifier, unique within a log.
    pub id: String,
    /// Transition type.
    #[serde(rename = "type")]
    pub kind: LogKind,
    /// User the entry is about.
    pub user_id: String,
    /// Display name at creation, or the fallback label.
    pub display_name: String,
    /// Avatar image reference.
    pub avatar_url: Option<String>,
    /// Pre-formatted creation time.
    pub timestamp: String,
}

impl LogEntry {
    /// Returns the row label for this entry's kind.
    #[must_use]
    pub fn label<'a>(&self, labels: &'a Labels) -> &'a str {
        match self.kind {
            LogKind::Join => &labels.join,
            LogKind::Leave => &labels.leave,
        }
    }

    /// Returns a copy carrying a different name and avatar.
    #[must_use]
    pub fn relabeled(&self, display_name: &str, avatar_url: Option<&str>) -> Self {
        Self {
            display_name: display_name.to_owned(),
            avatar_url: avatar_url.map(str::to_owned),
            ..self.clone()
        }
    }
}

/// Immutable, cheaply cloned snapshot of an ordered log (oldest first).
///
/// Transformations that change nothing hand back the same snapshot, so
/// callers can use [`Log::is_same_snapshot`] to skip a re-sync.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<LogEntry>", into = "Vec<LogEntry>")]
pub struct Log(Arc<[LogEntry]>);

impl Log {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::from(Vec::new()))
    }

    /// Returns the entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.0
    }

    /// Returns true if both handles point at the same snapshot.
    #[must_use]
    pub fn is_same_snapshot(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Returns true if an entry with `id` is present.
    #[must_use]
    pub fn contains_id(&self, id: &str) -> bool {
        self.0.iter().any(|entry| entry.id == id)
    }

    /// Returns true if any entry still carries `label` as its name.
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.0.iter().any(|entry| entry.display_name == label)
    }
}

impl Default for Log {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Log {
    type Target = [LogEntry];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for Log {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl From<Vec<LogEntry>> for Log {
    fn from(entries: Vec<LogEntry>) -> Self {
        Self(Arc::from(entries))
    }
}

impl From<Log> for Vec<LogEntry> {
    fn from(log: Log) -> Self {
        log.0.to_vec()
    }
}

impl FromIterator<LogEntry> for Log {
    fn from_iter<I: IntoIterator<Item = LogEntry>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A user as reported by the platform's live user list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// User ID.
    pub id: String,
    /// Display name.
    pub display_name: String,
    /// Avatar image reference.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Guest account.
    #[serde(default)]
    pub is_guest: bool,
}

impl UserProfile {
    /// Creates a non-guest profile without an avatar.
    #[must_use]
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            avatar_url: None,
            is_guest: false,
        }
    }

    /// Sets the avatar reference.
    #[must_use]
    pub fn with_avatar(mut self, avatar_url: impl Into<String>) -> Self {
        self.avatar_url = Some(avatar_url.into());
        self
    }
}

/// Row labels for join and leave entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    /// Label for join rows.
    pub join: String,
    /// Label for leave rows.
    pub leave: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            join: DEFAULT_JOIN_LABEL.to_owned(),
            leave: DEFAULT_LEAVE_LABEL.to_owned(),
        }
    }
}
