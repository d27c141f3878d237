//! Many clients, one entry log, random churn.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};
use xrift_shared::{Log, PresenceEvent, UserProfile};

use super::replica::{DeliveryConditions, ReplicaHub, ReplicaStore};
use crate::config::SimulationConfig;
use crate::entry_log::{EntryLogTracker, TrackerStats};
use crate::error::{InstanceError, InstanceResult};
use crate::events::{LocalEventBus, PresenceFeed};
use crate::roster::RosterSnapshot;

/// Rounds of react-and-relay allowed after churn stops.
pub const SETTLE_ROUNDS: usize = 16;

/// Outcome of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConvergenceReport {
    /// Churn steps taken.
    pub steps: usize,
    /// Joins simulated.
    pub joins: usize,
    /// Leaves simulated.
    pub leaves: usize,
    /// Presence notifications delivered twice.
    pub duplicate_notifications: usize,
    /// Clients online at the end.
    pub online_clients: usize,
    /// Summed tracker counters across every session.
    pub trackers: TrackerStats,
    /// Writes that reached the hub.
    pub store_writes: u64,
    /// Updates relayed, duplicates included.
    pub updates_delivered: u64,
    /// Duplicate relays.
    pub updates_redelivered: u64,
    /// Relays ignored as older than what a replica held.
    pub updates_superseded: u64,
    /// Rounds needed to go quiet after churn.
    pub settle_rounds: usize,
    /// Every online replica holds the same log.
    pub converged: bool,
    /// Entries in the final log.
    pub final_log_len: usize,
    /// Entries sharing an ID with an earlier entry.
    pub duplicate_ids: usize,
    /// Entries repeating an earlier entry's user, kind and timestamp; one
    /// transition logged twice.
    pub duplicate_rows: usize,
    /// Entries still carrying the fallback name.
    pub fallback_entries: usize,
}

struct Session {
    store: Arc<ReplicaStore>,
    bus: LocalEventBus,
    feed: PresenceFeed,
    tracker: EntryLogTracker,
}

struct SimClient {
    profile: UserProfile,
    session: Option<Session>,
}

/// Drives trackers on replicated stores through random join/leave churn.
pub struct ConvergenceSimulation {
    config: SimulationConfig,
    hub: ReplicaHub,
    clients: Vec<SimClient>,
    rng: ChaCha8Rng,
    clock: Arc<AtomicUsize>,
    last_joiner: Option<usize>,
    closed: TrackerStats,
    report: ConvergenceReport,
}

fn add_stats(total: &mut TrackerStats, stats: TrackerStats) {
    total.authored += stats.authored;
    total.absorbed += stats.absorbed;
    total.deferred += stats.deferred;
    total.repaired += stats.repaired;
}

impl ConvergenceSimulation {
    /// Sets up `config.clients` offline clients.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::InvalidConfig`] for out-of-range settings.
    pub fn new(config: SimulationConfig) -> InstanceResult<Self> {
        config.validate()?;
        let conditions = DeliveryConditions {
            redeliver_percent: config.redeliver_percent,
            reorder: config.reorder,
        };
        let clients = (0..config.clients)
            .map(|i| SimClient {
                profile: UserProfile::new(format!("user-{i:03}"), format!("User {i}")),
                session: None,
            })
            .collect();
        Ok(Self {
            hub: ReplicaHub::new(conditions, config.seed),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            clients,
            clock: Arc::new(AtomicUsize::new(0)),
            last_joiner: None,
            closed: TrackerStats::default(),
            report: ConvergenceReport::default(),
        })
    }

    /// Steps taken so far.
    #[must_use]
    pub fn current_step(&self) -> usize {
        self.report.steps
    }

    /// Clients currently online.
    #[must_use]
    pub fn online(&self) -> usize {
        self.clients.iter().filter(|client| client.session.is_some()).count()
    }

    /// Toggles one random client and lets everyone react. Returns false once
    /// every churn event has run.
    ///
    /// # Errors
    ///
    /// Propagates tracker store failures.
    pub fn step(&mut self) -> InstanceResult<bool> {
        if self.report.steps >= self.config.churn_events {
            return Ok(false);
        }
        self.report.steps += 1;
        self.clock.store(self.report.steps, Ordering::Relaxed);

        let index = self.rng.gen_range(0..self.clients.len());
        if self.clients[index].session.is_some() {
            self.leave(index);
        } else {
            self.join(index)?;
        }

        self.react(true)?;
        self.hub.deliver();
        Ok(true)
    }

    /// Runs every churn step, settles, and reports.
    ///
    /// # Errors
    ///
    /// Propagates tracker store failures.
    pub fn run(&mut self) -> InstanceResult<ConvergenceReport> {
        while self.step()? {}
        self.settle()?;
        self.finish()
    }

    /// Fresh rosters everywhere until a round makes no writes.
    ///
    /// # Errors
    ///
    /// Propagates tracker store failures.
    pub fn settle(&mut self) -> InstanceResult<usize> {
        self.last_joiner = None;
        for round in 1..=SETTLE_ROUNDS {
            let before = self.hub.stats().received + self.hub.pending() as u64;
            self.react(false)?;
            self.hub.deliver();
            self.report.settle_rounds = round;
            if self.hub.stats().received == before && self.hub.pending() == 0 {
                return Ok(round);
            }
        }
        warn!(rounds = SETTLE_ROUNDS, "Log still changing after settle rounds");
        Ok(SETTLE_ROUNDS)
    }

    /// Checks replicas against the hub and summarises the final log.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::Decode`] if the relayed log is malformed.
    pub fn finish(&mut self) -> InstanceResult<ConvergenceReport> {
        let key = self.config.entry_log.state_key();
        let log: Log = match self.hub.authoritative(&key) {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|source| InstanceError::Decode { key: key.clone(), source })?,
            None => Log::new(),
        };

        let mut seen = HashSet::with_capacity(log.len());
        let duplicate_ids = log.iter().filter(|entry| !seen.insert(entry.id.as_str())).count();
        let mut rows = HashSet::with_capacity(log.len());
        let duplicate_rows = log
            .iter()
            .filter(|entry| !rows.insert((entry.user_id.as_str(), entry.kind, entry.timestamp.as_str())))
            .count();
        let fallback = &self.config.entry_log.display_name_fallback;

        let mut trackers = self.closed;
        for session in self.clients.iter().filter_map(|client| client.session.as_ref()) {
            add_stats(&mut trackers, session.tracker.stats());
        }
        let hub = self.hub.stats();

        let report = &mut self.report;
        report.online_clients = self.clients.iter().filter(|client| client.session.is_some()).count();
        report.trackers = trackers;
        report.store_writes = hub.received;
        report.updates_delivered = hub.delivered;
        report.updates_redelivered = hub.redelivered;
        report.updates_superseded = hub.superseded;
        report.converged = self.hub.pending() == 0 && self.hub.is_converged(&key);
        report.final_log_len = log.len();
        report.duplicate_ids = duplicate_ids;
        report.duplicate_rows = duplicate_rows;
        report.fallback_entries = log.iter().filter(|entry| entry.display_name == *fallback).count();

        info!(
            converged = report.converged,
            entries = report.final_log_len,
            duplicate_ids,
            duplicate_rows,
            "Simulation finished"
        );
        Ok(report.clone())
    }

    fn join(&mut self, index: usize) -> InstanceResult<()> {
        let store = self.hub.connect();
        let clock = Arc::clone(&self.clock);
        let tracker = EntryLogTracker::new(self.config.entry_log.clone(), store.clone())?
            .with_formatter(move |_: &DateTime<Local>| format!("t{:04}", clock.load(Ordering::Relaxed)));
        let bus = LocalEventBus::new();
        let feed = PresenceFeed::subscribe(&bus);

        let user_id = self.clients[index].profile.id.clone();
        self.clients[index].session = Some(Session {
            store,
            bus,
            feed,
            tracker,
        });
        self.last_joiner = Some(index);
        self.report.joins += 1;
        debug!(user = %user_id, step = self.report.steps, "Client joined");

        self.notify_others(index, &PresenceEvent::joined(user_id));
        Ok(())
    }

    fn leave(&mut self, index: usize) {
        if let Some(session) = self.clients[index].session.take() {
            add_stats(&mut self.closed, session.tracker.stats());
            self.hub.disconnect(session.store.id());
        }
        if self.last_joiner == Some(index) {
            self.last_joiner = None;
        }
        self.report.leaves += 1;
        let user_id = self.clients[index].profile.id.clone();
        debug!(user = %user_id, step = self.report.steps, "Client left");

        self.notify_others(index, &PresenceEvent::left(user_id));
    }

    fn notify_others(&mut self, subject: usize, event: &PresenceEvent) {
        let (name, payload) = event.encode();
        for (index, client) in self.clients.iter().enumerate() {
            let Some(session) = client.session.as_ref().filter(|_| index != subject) else {
                continue;
            };
            session.bus.deliver(name, &payload);
            if self.config.duplicate_percent > 0 && self.rng.gen_range(0..100u8) < self.config.duplicate_percent {
                session.bus.deliver(name, &payload);
                self.report.duplicate_notifications += 1;
            }
        }
    }

    fn roster_for(&mut self, viewer: usize, allow_stale: bool) -> RosterSnapshot {
        let hide = match self.last_joiner {
            Some(joiner)
                if allow_stale
                    && joiner != viewer
                    && self.rng.gen_range(0..100u8) < self.config.stale_roster_percent =>
            {
                Some(joiner)
            }
            _ => None,
        };
        let remote = self
            .clients
            .iter()
            .enumerate()
            .filter(|(index, client)| *index != viewer && Some(*index) != hide && client.session.is_some())
            .map(|(_, client)| client.profile.clone())
            .collect();
        RosterSnapshot::new(Some(self.clients[viewer].profile.clone()), remote)
    }

    fn react(&mut self, allow_stale: bool) -> InstanceResult<()> {
        for index in 0..self.clients.len() {
            if self.clients[index].session.is_none() {
                continue;
            }
            let roster = self.roster_for(index, allow_stale);
            if let Some(session) = self.clients[index].session.as_mut() {
                session.tracker.pump(&session.feed, &roster)?;
                session.tracker.observe(&roster)?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ConvergenceSimulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvergenceSimulation")
            .field("step", &self.report.steps)
            .field("online", &self.online())
            .field("hub", &self.hub)
            .finish_non_exhaustive()
    }
}
