//! # Stale-Cache Repair
//!
//! A writer may have to log a transition before the user's name is known
//! locally, and writes the fallback label instead. Once the name shows up
//! in the local [`UserCache`], [`repair`] rewrites those entries.
//!
//! The same primitive serves two callers:
//!
//! - **read-time enrichment**: applied to every displayed snapshot, never
//!   persisted
//! - **write-time repair**: applied by the elected writer and persisted so
//!   every observer sees the fix
//!
//! An actor with no cache entry keeps the fallback label until a later pass
//! finds one.

use std::collections::HashMap;

use xrift_shared::{Log, UserProfile};

/// Best-known name and avatar for a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedProfile {
    /// Display name.
    pub display_name: String,
    /// Avatar image reference.
    pub avatar_url: Option<String>,
}

/// Local, per-client memory of user metadata.
///
/// Users vanish from the live list the moment they leave, so the cache
/// keeps what was last seen. Never shared between clients.
#[derive(Clone, Debug, Default)]
pub struct UserCache {
    profiles: HashMap<String, CachedProfile>,
}

impl UserCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the latest metadata for a user.
    pub fn observe(&mut self, user: &UserProfile) {
        self.profiles.insert(
            user.id.clone(),
            CachedProfile {
                display_name: user.display_name.clone(),
                avatar_url: user.avatar_url.clone(),
            },
        );
    }

    /// Records every user in `users`.
    pub fn observe_all<'a>(&mut self, users: impl IntoIterator<Item = &'a UserProfile>) {
        for user in users {
            self.observe(user);
        }
    }

    /// Looks up a user.
    #[must_use]
    pub fn get(&self, user_id: &str) -> Option<&CachedProfile> {
        self.profiles.get(user_id)
    }

    /// Returns true if the user has been seen.
    #[must_use]
    pub fn contains(&self, user_id: &str) -> bool {
        self.profiles.contains_key(user_id)
    }

    /// Number of users seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Returns true if no user has been seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Replaces fallback-labeled entries with cached metadata.
///
/// Returns the same snapshot when no entry both carries `fallback` and has
/// a cache hit. Otherwise only those entries change; `id`, `kind`,
/// `user_id` and `timestamp` are never touched.
#[must_use]
pub fn repair(log: &Log, fallback: &str, cache: &UserCache) -> Log {
    let needs_repair = log
        .iter()
        .any(|entry| entry.display_name == fallback && cache.contains(&entry.user_id));
    if !needs_repair {
        return log.clone();
    }
    log.iter()
        .map(|entry| {
            if entry.display_name != fallback {
                return entry.clone();
            }
            match cache.get(&entry.user_id) {
                Some(cached) => entry.relabeled(&cached.display_name, cached.avatar_url.as_deref()),
                None => entry.clone(),
            }
        })
        .collect()
}
