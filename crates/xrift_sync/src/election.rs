//! # Implicit Writer Election
//!
//! Every client enumerates the same candidate set and picks its smallest
//! ID. The client holding that ID is the writer. No election messages, no
//! timeouts, no heartbeats.
//!
//! ## Candidate Sets
//!
//! ```text
//! transition for user S:   { local } ∪ remote \ { S }
//! repair pass:             { local } ∪ remote
//! ```
//!
//! The subject of a transition is excluded so that a user who just joined
//! never writes about their own arrival. The local client is always
//! included, so the last user left in an instance still elects itself.
//!
//! IDs are ordered by UTF-16 code units, the order browser clients sort
//! strings in. This matches byte order except when an ID mixes characters
//! above U+FFFF with ones in U+E000..=U+FFFF, where byte order would pick a
//! different writer than a browser client in the same instance.
//!
//! When two clients hold different roster snapshots both may briefly
//! believe they are elected; merge dedup by ID absorbs the duplicate write.

use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Compares two IDs in election order (UTF-16 code units).
#[must_use]
pub fn election_order(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

/// ID stored in election order.
#[derive(Clone, Debug, PartialEq, Eq)]
struct ElectionKey(String);

impl Ord for ElectionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        election_order(&self.0, &other.0)
    }
}

impl PartialOrd for ElectionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Returns true if `my_id` is the smallest ID among the present candidates.
///
/// Absent candidates are skipped. An absent or empty `my_id` is never
/// elected, nor is anyone when no candidate is present.
#[must_use]
pub fn is_writer_among<I, S>(candidates: I, my_id: Option<&str>) -> bool
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let Some(my_id) = my_id.filter(|id| !id.is_empty()) else {
        return false;
    };
    candidates
        .into_iter()
        .flatten()
        .min_by(|a, b| election_order(a.as_ref(), b.as_ref()))
        .is_some_and(|first| AsRef::<str>::as_ref(&first) == my_id)
}

/// The IDs considered present at one decision point. Never persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CandidateSet {
    ids: BTreeSet<ElectionKey>,
}

impl CandidateSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a candidate.
    pub fn insert(&mut self, id: impl Into<String>) {
        self.ids.insert(ElectionKey(id.into()));
    }

    /// Removes the subject of a transition.
    #[must_use]
    pub fn without(mut self, subject: &str) -> Self {
        self.ids.remove(&ElectionKey(subject.to_owned()));
        self
    }

    /// Returns the elected writer, if any.
    #[must_use]
    pub fn writer(&self) -> Option<&str> {
        self.ids.first().map(|key| key.0.as_str())
    }

    /// Returns true if `my_id` is the elected writer.
    #[must_use]
    pub fn elects(&self, my_id: Option<&str>) -> bool {
        is_writer_among(self.ids.iter().map(|key| Some(key.0.as_str())), my_id)
    }

    /// Returns true if `id` is a candidate.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(&ElectionKey(id.to_owned()))
    }

    /// Number of candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if there are no candidates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterates candidates in election order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(|key| key.0.as_str())
    }
}

impl<S: Into<String>> FromIterator<S> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(|id| ElectionKey(id.into())).collect(),
        }
    }
}
