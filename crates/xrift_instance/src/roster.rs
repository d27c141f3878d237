//! # Roster Snapshot
//!
//! Point-in-time view of who this client believes is present. Every
//! decision takes one explicitly; nothing reads a live user list.

use serde::{Deserialize, Serialize};
use xrift_shared::UserProfile;
use xrift_sync::CandidateSet;

/// This client's view of the instance's users at one moment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSnapshot {
    /// The local user, once the platform has identified them.
    pub local: Option<UserProfile>,
    /// Every other user this client currently knows about.
    pub remote: Vec<UserProfile>,
}

impl RosterSnapshot {
    /// Builds a snapshot.
    #[must_use]
    pub fn new(local: Option<UserProfile>, remote: Vec<UserProfile>) -> Self {
        Self { local, remote }
    }

    /// A snapshot where only the local user is known.
    #[must_use]
    pub fn alone(local: UserProfile) -> Self {
        Self::new(Some(local), Vec::new())
    }

    /// Local user ID.
    #[must_use]
    pub fn local_id(&self) -> Option<&str> {
        self.local.as_ref().map(|user| user.id.as_str())
    }

    /// True if any remote user is known.
    #[must_use]
    pub fn has_remote_users(&self) -> bool {
        !self.remote.is_empty()
    }

    /// Local user (if known) followed by the remote users.
    pub fn users(&self) -> impl Iterator<Item = &UserProfile> {
        self.local.iter().chain(&self.remote)
    }

    /// Candidates for writing about `subject`'s transition: every remote
    /// user except the subject, plus the local user.
    ///
    /// The local user is kept even when it is the subject, so a client
    /// that sees itself reported can still elect itself.
    #[must_use]
    pub fn transition_candidates(&self, subject: &str) -> CandidateSet {
        let mut candidates: CandidateSet = self
            .remote
            .iter()
            .map(|user| user.id.as_str())
            .filter(|id| *id != subject)
            .collect();
        if let Some(local) = self.local_id() {
            candidates.insert(local);
        }
        candidates
    }

    /// Candidates for maintenance writes: everyone known.
    #[must_use]
    pub fn all_candidates(&self) -> CandidateSet {
        self.users().map(|user| user.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(local: &str, remote: &[&str]) -> RosterSnapshot {
        RosterSnapshot::new(
            Some(UserProfile::new(local, local.to_uppercase())),
            remote.iter().map(|id| UserProfile::new(*id, id.to_uppercase())).collect(),
        )
    }

    #[test]
    fn test_transition_candidates_exclude_subject() {
        let view = roster("b", &["a", "u3"]);
        let candidates = view.transition_candidates("a");
        assert_eq!(candidates.iter().collect::<Vec<_>>(), ["b", "u3"]);
        assert!(candidates.elects(Some("b")));
    }

    #[test]
    fn test_local_user_always_candidate() {
        let view = roster("a", &[]);
        assert!(view.transition_candidates("a").elects(Some("a")));
        assert_eq!(view.all_candidates().len(), 1);
    }

    #[test]
    fn test_unknown_local_user() {
        let view = RosterSnapshot::new(None, vec![UserProfile::new("a", "A")]);
        assert_eq!(view.local_id(), None);
        assert!(!view.transition_candidates("x").elects(None));
        assert_eq!(view.users().count(), 1);
    }

    #[test]
    fn test_all_candidates_include_everyone() {
        let view = roster("c", &["a", "b"]);
        assert_eq!(view.all_candidates().writer(), Some("a"));
        assert!(view.has_remote_users());
        assert!(!RosterSnapshot::alone(UserProfile::new("z", "Z")).has_remote_users());
    }
}
