//! # Entry-Log Tracker
//!
//! Per-client driver of the presence log. Every client in the instance runs
//! one; at most one of them writes for any given transition.
//!
//! ## Phases
//!
//! ```text
//! Uninitialized ──local user known──▶ SelfAnnounced ──next observe──▶ Steady
//!       │                                                              ▲
//!       └──────── already logged / others present ─────────────────────┘
//! ```
//!
//! - The first occupant writes its own join entry, since nobody else is
//!   around to do it. This is the only write a client makes about itself.
//! - Every presence transition is written by the client that sorts first
//!   among the remaining users.
//! - Fallback-labeled entries are fixed on display right away and persisted
//!   by the client that sorts first among everyone present.
//!
//! ## Snapshots
//!
//! Entry IDs are counted against the log as of the last [`observe`] or the
//! start of the current [`pump`], never against writes made since. A
//! notification delivered twice in one batch therefore lands on the same ID
//! and is absorbed. So is a leave-and-rejoin of one user within a single
//! batch; the rejoin gets its own row once the next batch starts.
//!
//! [`observe`]: EntryLogTracker::observe
//! [`pump`]: EntryLogTracker::pump

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use chrono::Local;
use tracing::{debug, info};
use xrift_shared::{ClockFormat, Log, LogEntry, LogKind, PresenceEvent, TimestampFormat, UserProfile};
use xrift_sync::{create_entry, merge, repair, UserCache};

use crate::config::EntryLogConfig;
use crate::error::InstanceResult;
use crate::events::PresenceFeed;
use crate::roster::RosterSnapshot;
use crate::store::{InstanceState, SyncedState};

/// Callback run with each entry this client writes.
pub type EntryHook = Box<dyn FnMut(&LogEntry) + Send>;

/// Where a tracker is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackerPhase {
    /// Local user not known yet.
    Uninitialized,
    /// Wrote its own join entry as the first occupant.
    SelfAnnounced,
    /// Reacting to remote transitions only.
    Steady,
}

/// Counters for what this client did to the log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrackerStats {
    /// Entries written that changed the log.
    pub authored: u64,
    /// Entries whose ID was already present.
    pub absorbed: u64,
    /// Transitions left to another client.
    pub deferred: u64,
    /// Persisted repair passes.
    pub repaired: u64,
}

/// Maintains one entry-log board for the local client.
pub struct EntryLogTracker {
    config: EntryLogConfig,
    capacity: NonZeroUsize,
    logs: InstanceState<Log>,
    view: Log,
    cache: UserCache,
    phase: TrackerPhase,
    formatter: Box<dyn TimestampFormat>,
    on_join: Option<EntryHook>,
    on_leave: Option<EntryHook>,
    stats: TrackerStats,
}

impl EntryLogTracker {
    /// Creates a tracker storing its log in `store`.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::InvalidConfig`](crate::InstanceError::InvalidConfig)
    /// if `config` does not validate, or propagates store decode failures.
    pub fn new(config: EntryLogConfig, store: Arc<dyn SyncedState>) -> InstanceResult<Self> {
        config.validate()?;
        let capacity = config.capacity()?;
        let logs = InstanceState::new(store, config.state_key(), Log::new());
        let view = logs.get()?;
        Ok(Self {
            config,
            capacity,
            logs,
            view,
            cache: UserCache::new(),
            phase: TrackerPhase::Uninitialized,
            formatter: Box::new(ClockFormat),
            on_join: None,
            on_leave: None,
            stats: TrackerStats::default(),
        })
    }

    /// Replaces the timestamp format.
    #[must_use]
    pub fn with_formatter(mut self, formatter: impl TimestampFormat + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    /// Runs `hook` for every join entry this client writes.
    #[must_use]
    pub fn on_join(mut self, hook: impl FnMut(&LogEntry) + Send + 'static) -> Self {
        self.on_join = Some(Box::new(hook));
        self
    }

    /// Runs `hook` for every leave entry this client writes.
    #[must_use]
    pub fn on_leave(mut self, hook: impl FnMut(&LogEntry) + Send + 'static) -> Self {
        self.on_leave = Some(Box::new(hook));
        self
    }

    /// Board settings.
    #[must_use]
    pub fn config(&self) -> &EntryLogConfig {
        &self.config
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> TrackerPhase {
        self.phase
    }

    /// Write counters.
    #[must_use]
    pub fn stats(&self) -> TrackerStats {
        self.stats
    }

    /// Metadata remembered so far.
    #[must_use]
    pub fn cache(&self) -> &UserCache {
        &self.cache
    }

    /// The log as persisted, without display repair.
    ///
    /// # Errors
    ///
    /// Propagates store decode failures.
    pub fn persisted(&self) -> InstanceResult<Log> {
        self.logs.get()
    }

    /// Per-render pass: remembers metadata, announces the first occupant,
    /// persists repairs when elected, and returns the log for display.
    ///
    /// # Errors
    ///
    /// Propagates store (de)serialization failures.
    pub fn observe(&mut self, roster: &RosterSnapshot) -> InstanceResult<Log> {
        self.cache.observe_all(roster.users());

        match (self.phase, &roster.local) {
            (TrackerPhase::Uninitialized, Some(local)) => self.announce_self(local, roster)?,
            (TrackerPhase::SelfAnnounced, _) => self.phase = TrackerPhase::Steady,
            _ => {}
        }

        self.persist_repair(roster)?;

        self.view = self.logs.get()?;
        Ok(repair(&self.view, &self.config.display_name_fallback, &self.cache))
    }

    /// Handles one presence transition. Returns the entry written, or
    /// `None` when another client is responsible or the local user is not
    /// known yet.
    ///
    /// # Errors
    ///
    /// Propagates store (de)serialization failures.
    pub fn handle(&mut self, event: &PresenceEvent, roster: &RosterSnapshot) -> InstanceResult<Option<LogEntry>> {
        self.cache.observe_all(roster.users());

        let Some(local_id) = roster.local_id() else {
            debug!(subject = event.user_id(), "Local user unknown, ignoring transition");
            return Ok(None);
        };
        let subject = event.user_id();
        let candidates = roster.transition_candidates(subject);
        if !candidates.elects(Some(local_id)) {
            self.stats.deferred += 1;
            debug!(
                subject,
                kind = %event.kind(),
                writer = candidates.writer().unwrap_or_default(),
                "Not elected"
            );
            return Ok(None);
        }

        let (display_name, avatar_url) = match self.cache.get(subject) {
            Some(cached) => (cached.display_name.clone(), cached.avatar_url.clone()),
            None => {
                debug!(subject, "No metadata cached, writing fallback name");
                (self.config.display_name_fallback.clone(), None)
            }
        };
        let entry = create_entry(
            event.kind(),
            subject,
            &display_name,
            avatar_url.as_deref(),
            &self.view,
            self.timestamp(),
        );
        let current = self.logs.get()?;
        self.commit(&current, &entry)?;
        Ok(Some(entry))
    }

    /// Drains `feed` and handles each transition in delivery order, all
    /// against the log as it stood when the batch started.
    ///
    /// # Errors
    ///
    /// Stops at the first store failure.
    pub fn pump(&mut self, feed: &PresenceFeed, roster: &RosterSnapshot) -> InstanceResult<Vec<LogEntry>> {
        self.view = self.logs.get()?;
        let mut written = Vec::new();
        for event in feed.drain() {
            if let Some(entry) = self.handle(&event, roster)? {
                written.push(entry);
            }
        }
        Ok(written)
    }

    fn announce_self(&mut self, local: &UserProfile, roster: &RosterSnapshot) -> InstanceResult<()> {
        let current = self.logs.get()?;
        let already_joined = current
            .iter()
            .any(|entry| entry.kind == LogKind::Join && entry.user_id == local.id);
        if already_joined || roster.has_remote_users() {
            self.phase = TrackerPhase::Steady;
            return Ok(());
        }

        let entry = create_entry(
            LogKind::Join,
            &local.id,
            &local.display_name,
            local.avatar_url.as_deref(),
            &current,
            self.timestamp(),
        );
        self.commit(&current, &entry)?;
        self.phase = TrackerPhase::SelfAnnounced;
        info!(user = %local.id, "First occupant announced itself");
        Ok(())
    }

    fn persist_repair(&mut self, roster: &RosterSnapshot) -> InstanceResult<()> {
        let fallback = self.config.display_name_fallback.as_str();
        let current = self.logs.get()?;
        if !current.has_label(fallback) || !roster.all_candidates().elects(roster.local_id()) {
            return Ok(());
        }
        let fixed = repair(&current, fallback, &self.cache);
        if !fixed.is_same_snapshot(&current) {
            self.logs.set(&fixed)?;
            self.stats.repaired += 1;
            info!(key = self.logs.key(), "Persisted repaired display names");
        }
        Ok(())
    }

    fn commit(&mut self, current: &Log, entry: &LogEntry) -> InstanceResult<()> {
        let merged = merge(current, entry.clone(), self.capacity);
        if merged.is_same_snapshot(current) {
            self.stats.absorbed += 1;
            debug!(id = %entry.id, "Entry already logged");
        } else {
            self.logs.set(&merged)?;
            self.stats.authored += 1;
            info!(id = %entry.id, user = %entry.user_id, len = merged.len(), "Entry written");
        }

        let hook = match entry.kind {
            LogKind::Join => self.on_join.as_mut(),
            LogKind::Leave => self.on_leave.as_mut(),
        };
        if let Some(hook) = hook {
            hook(entry);
        }
        Ok(())
    }

    fn timestamp(&self) -> String {
        self.formatter.format(&Local::now())
    }
}

impl fmt::Debug for EntryLogTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryLogTracker")
            .field("key", &self.logs.key())
            .field("phase", &self.phase)
            .field("stats", &self.stats)
            .field("cached_users", &self.cache.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStateStore;
    use chrono::DateTime;
    use parking_lot::Mutex;

    fn fixed_clock(_: &DateTime<Local>) -> String {
        "12:00".to_owned()
    }

    fn tracker(store: &Arc<LocalStateStore>) -> EntryLogTracker {
        EntryLogTracker::new(EntryLogConfig::default(), store.clone())
            .unwrap()
            .with_formatter(fixed_clock)
    }

    fn user(id: &str) -> UserProfile {
        UserProfile::new(id, id.to_uppercase())
    }

    fn roster(local: &str, remote: &[&str]) -> RosterSnapshot {
        RosterSnapshot::new(Some(user(local)), remote.iter().map(|id| user(id)).collect())
    }

    #[test]
    fn test_uninitialized_until_local_user_known() {
        let store = Arc::new(LocalStateStore::new());
        let mut t = tracker(&store);

        let shown = t.observe(&RosterSnapshot::default()).unwrap();
        assert!(shown.is_empty());
        assert_eq!(t.phase(), TrackerPhase::Uninitialized);
        assert_eq!(t.handle(&PresenceEvent::joined("x"), &RosterSnapshot::default()).unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_first_occupant_announces_once() {
        let store = Arc::new(LocalStateStore::new());
        let mut t = tracker(&store);

        let shown = t.observe(&roster("a", &[])).unwrap();
        assert_eq!(t.phase(), TrackerPhase::SelfAnnounced);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].id, "join-a-0");
        assert_eq!(shown[0].display_name, "A");
        assert_eq!(shown[0].timestamp, "12:00");

        let shown = t.observe(&roster("a", &[])).unwrap();
        assert_eq!(t.phase(), TrackerPhase::Steady);
        assert_eq!(shown.len(), 1);
        assert_eq!(t.stats().authored, 1);
    }

    #[test]
    fn test_no_self_announce_with_company() {
        let store = Arc::new(LocalStateStore::new());
        let mut t = tracker(&store);
        t.observe(&roster("b", &["a"])).unwrap();
        assert_eq!(t.phase(), TrackerPhase::Steady);
        assert!(t.persisted().unwrap().is_empty());
    }

    #[test]
    fn test_no_self_announce_when_already_logged() {
        let store = Arc::new(LocalStateStore::new());
        tracker(&store).observe(&roster("a", &[])).unwrap();

        let mut rejoined = tracker(&store);
        rejoined.observe(&roster("a", &[])).unwrap();
        assert_eq!(rejoined.phase(), TrackerPhase::Steady);
        assert_eq!(rejoined.persisted().unwrap().len(), 1);
    }

    #[test]
    fn test_elected_client_writes_transition() {
        let store = Arc::new(LocalStateStore::new());
        let mut t = tracker(&store);
        let view = roster("a", &["b", "u3"]);

        let entry = t.handle(&PresenceEvent::joined("u3"), &view).unwrap().unwrap();
        assert_eq!(entry.id, "join-u3-0");
        assert_eq!(entry.display_name, "U3");
        assert_eq!(t.persisted().unwrap().len(), 1);
    }

    #[test]
    fn test_non_elected_client_defers() {
        let store = Arc::new(LocalStateStore::new());
        let mut t = tracker(&store);
        let view = roster("b", &["a", "u3"]);

        assert_eq!(t.handle(&PresenceEvent::joined("u3"), &view).unwrap(), None);
        assert_eq!(t.stats().deferred, 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_leaver_excluded_from_election() {
        let store = Arc::new(LocalStateStore::new());
        let mut t = tracker(&store);
        // "a" sorts first but is the one leaving; it is still in this stale roster.
        let view = roster("b", &["a", "c"]);

        let entry = t.handle(&PresenceEvent::left("a"), &view).unwrap().unwrap();
        assert_eq!(entry.id, "leave-a-0");
        assert_eq!(entry.display_name, "A");
    }

    #[test]
    fn test_fallback_then_persisted_repair() {
        let store = Arc::new(LocalStateStore::new());
        let mut t = tracker(&store);

        // Joiner not in the roster yet.
        let entry = t.handle(&PresenceEvent::joined("u9"), &roster("a", &[])).unwrap().unwrap();
        assert_eq!(entry.display_name, "Unknown");

        let shown = t.observe(&roster("a", &["u9"])).unwrap();
        assert_eq!(shown[0].display_name, "U9");
        assert_eq!(t.persisted().unwrap()[0].display_name, "U9");
        assert_eq!(t.stats().repaired, 1);
    }

    #[test]
    fn test_non_writer_repairs_display_only() {
        let store = Arc::new(LocalStateStore::new());
        let mut writer = tracker(&store);
        writer.handle(&PresenceEvent::joined("u9"), &roster("a", &[])).unwrap();

        let mut reader = tracker(&store);
        let shown = reader.observe(&roster("b", &["a", "u9"])).unwrap();
        assert_eq!(shown[0].display_name, "U9");
        assert_eq!(reader.persisted().unwrap()[0].display_name, "Unknown");
        assert_eq!(reader.stats().repaired, 0);
    }

    #[test]
    fn test_hooks_fire_for_written_entries() {
        let store = Arc::new(LocalStateStore::new());
        let joins = Arc::new(Mutex::new(Vec::new()));
        let leaves = Arc::new(Mutex::new(Vec::new()));
        let (j, l) = (joins.clone(), leaves.clone());
        let mut t = tracker(&store)
            .on_join(move |entry| j.lock().push(entry.id.clone()))
            .on_leave(move |entry| l.lock().push(entry.id.clone()));

        t.observe(&roster("a", &[])).unwrap();
        t.handle(&PresenceEvent::joined("b"), &roster("a", &["b"])).unwrap();
        t.handle(&PresenceEvent::left("b"), &roster("a", &["b"])).unwrap();
        t.handle(&PresenceEvent::left("b"), &roster("z", &["a", "b"])).unwrap();

        assert_eq!(*joins.lock(), ["join-a-0", "join-b-0"]);
        assert_eq!(*leaves.lock(), ["leave-b-0"]);
    }

    #[test]
    fn test_replayed_transition_is_absorbed() {
        let store = Arc::new(LocalStateStore::new());
        let mut t = tracker(&store);
        let view = roster("a", &["u3"]);
        let before = t.persisted().unwrap();

        t.handle(&PresenceEvent::joined("u3"), &view).unwrap();
        let after = t.persisted().unwrap();

        // A second client computing from the old snapshot lands on the same ID.
        let replay = create_entry(LogKind::Join, "u3", "U3", None, &before, "12:01".into());
        assert_eq!(replay.id, "join-u3-0");
        assert!(merge(&after, replay, t.capacity).is_same_snapshot(&after));

        // A duplicate notification before the next observe is absorbed too.
        let again = t.handle(&PresenceEvent::joined("u3"), &view).unwrap().unwrap();
        assert_eq!(again.id, "join-u3-0");
        assert_eq!(t.persisted().unwrap().len(), 1);
        assert_eq!(t.stats().absorbed, 1);

        // Once observed, a real rejoin counts forward.
        t.observe(&view).unwrap();
        let rejoin = t.handle(&PresenceEvent::joined("u3"), &view).unwrap().unwrap();
        assert_eq!(rejoin.id, "join-u3-1");
    }

    #[test]
    fn test_duplicate_delivery_in_one_batch_writes_one_row() {
        use crate::events::LocalEventBus;

        let store = Arc::new(LocalStateStore::new());
        let bus = LocalEventBus::new();
        let feed = PresenceFeed::subscribe(&bus);
        let mut t = tracker(&store);
        let view = roster("a", &["u3"]);
        t.observe(&view).unwrap();

        let (name, payload) = PresenceEvent::joined("u3").encode();
        bus.deliver(name, &payload);
        bus.deliver(name, &payload);

        let written: Vec<String> = t.pump(&feed, &view).unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(written, ["join-u3-0", "join-u3-0"]);
        let persisted = t.persisted().unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].id, "join-u3-0");
        assert_eq!(t.stats().authored, 1);
        assert_eq!(t.stats().absorbed, 1);
    }

    #[test]
    fn test_pump_handles_feed_in_order() {
        use crate::events::{LocalEventBus, WorldEvents as _};

        let store = Arc::new(LocalStateStore::new());
        let bus = LocalEventBus::new();
        let feed = PresenceFeed::subscribe(&bus);
        let mut t = tracker(&store);
        let view = roster("a", &["b"]);

        for event in [PresenceEvent::joined("b"), PresenceEvent::left("b"), PresenceEvent::joined("b")] {
            let (name, payload) = event.encode();
            bus.deliver(name, &payload);
        }
        bus.emit("unrelated", serde_json::json!({})).unwrap();

        let written: Vec<String> = t.pump(&feed, &view).unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(written, ["join-b-0", "leave-b-0", "join-b-0"]);
        assert_eq!(t.persisted().unwrap().len(), 2);

        // The next batch sees both rows and counts the rejoin forward.
        let (name, payload) = PresenceEvent::joined("b").encode();
        bus.deliver(name, &payload);
        let written: Vec<String> = t.pump(&feed, &view).unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(written, ["join-b-1"]);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let store: Arc<dyn SyncedState> = Arc::new(LocalStateStore::new());
        let config = EntryLogConfig {
            max_entries: 0,
            ..EntryLogConfig::default()
        };
        assert!(EntryLogTracker::new(config, store).is_err());
    }
}
