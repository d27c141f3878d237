//! Replicated last-write-wins store with a relay hub.
//!
//! Each client holds a [`ReplicaStore`]. Writes apply locally at once and
//! travel to the [`ReplicaHub`] over a channel; [`ReplicaHub::deliver`]
//! relays them to every other connected replica, optionally duplicated and
//! shuffled. Every write carries a sequence number from one shared clock,
//! and a replica keeps the highest-sequenced value per key, so delivery
//! order never matters.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::Value;
use tracing::{trace, warn};

use crate::store::SyncedState;

/// Identifies a replica within one hub.
pub type ReplicaId = usize;

/// One write on its way between replicas.
#[derive(Clone, Debug, PartialEq)]
pub struct StateUpdate {
    /// Replica that wrote it.
    pub origin: ReplicaId,
    /// Position in the global write order.
    pub seq: u64,
    /// State key.
    pub key: String,
    /// New value.
    pub value: Value,
}

#[derive(Clone, Debug)]
struct Versioned {
    seq: u64,
    value: Value,
}

fn apply_lww(states: &mut HashMap<String, Versioned>, update: &StateUpdate) -> bool {
    match states.get(&update.key) {
        Some(current) if current.seq >= update.seq => false,
        _ => {
            states.insert(
                update.key.clone(),
                Versioned {
                    seq: update.seq,
                    value: update.value.clone(),
                },
            );
            true
        }
    }
}

fn roll(rng: &mut ChaCha8Rng, percent: u8) -> bool {
    percent > 0 && rng.gen_range(0..100u8) < percent
}

// ============================================================================
// REPLICA
// ============================================================================

/// One client's copy of the synchronized state.
pub struct ReplicaStore {
    id: ReplicaId,
    clock: Arc<AtomicU64>,
    states: RwLock<HashMap<String, Versioned>>,
    outbox: Sender<StateUpdate>,
    writes: AtomicU64,
}

impl ReplicaStore {
    /// Replica identifier.
    #[must_use]
    pub fn id(&self) -> ReplicaId {
        self.id
    }

    /// Writes made through this replica.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    fn apply(&self, update: &StateUpdate) -> bool {
        apply_lww(&mut self.states.write(), update)
    }
}

impl SyncedState for ReplicaStore {
    fn read(&self, key: &str) -> Option<Value> {
        self.states.read().get(key).map(|versioned| versioned.value.clone())
    }

    fn write(&self, key: &str, value: Value) {
        let update = StateUpdate {
            origin: self.id,
            seq: self.clock.fetch_add(1, Ordering::Relaxed) + 1,
            key: key.to_owned(),
            value,
        };
        self.apply(&update);
        self.writes.fetch_add(1, Ordering::Relaxed);
        if self.outbox.send(update).is_err() {
            warn!(replica = self.id, key, "Hub gone, write stays local");
        }
    }
}

impl fmt::Debug for ReplicaStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicaStore")
            .field("id", &self.id)
            .field("keys", &self.states.read().len())
            .field("writes", &self.writes())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// HUB
// ============================================================================

/// How the hub mistreats updates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliveryConditions {
    /// Chance (percent) an update reaches a replica twice.
    pub redeliver_percent: u8,
    /// Shuffle each replica's batch.
    pub reorder: bool,
}

impl DeliveryConditions {
    /// In-order, exactly once.
    pub const PERFECT: Self = Self {
        redeliver_percent: 0,
        reorder: false,
    };
}

/// Relay counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HubStats {
    /// Writes received from replicas.
    pub received: u64,
    /// Updates handed to replicas, duplicates included.
    pub delivered: u64,
    /// Extra copies sent.
    pub redelivered: u64,
    /// Deliveries ignored because the replica already held newer data.
    pub superseded: u64,
}

/// Relays writes between connected replicas and keeps the latest value of
/// every key for replicas that connect later.
pub struct ReplicaHub {
    clock: Arc<AtomicU64>,
    inbox: Receiver<StateUpdate>,
    outbox: Sender<StateUpdate>,
    replicas: Vec<Arc<ReplicaStore>>,
    authoritative: HashMap<String, Versioned>,
    next_id: ReplicaId,
    conditions: DeliveryConditions,
    rng: ChaCha8Rng,
    stats: HubStats,
}

impl ReplicaHub {
    /// Creates a hub with no replicas.
    #[must_use]
    pub fn new(conditions: DeliveryConditions, seed: u64) -> Self {
        let (outbox, inbox) = unbounded();
        Self {
            clock: Arc::new(AtomicU64::new(0)),
            inbox,
            outbox,
            replicas: Vec::new(),
            authoritative: HashMap::new(),
            next_id: 0,
            conditions,
            rng: ChaCha8Rng::seed_from_u64(seed),
            stats: HubStats::default(),
        }
    }

    /// Connects a new replica, seeded with the latest relayed state.
    pub fn connect(&mut self) -> Arc<ReplicaStore> {
        let replica = Arc::new(ReplicaStore {
            id: self.next_id,
            clock: Arc::clone(&self.clock),
            states: RwLock::new(self.authoritative.clone()),
            outbox: self.outbox.clone(),
            writes: AtomicU64::new(0),
        });
        self.next_id += 1;
        self.replicas.push(Arc::clone(&replica));
        trace!(replica = replica.id, keys = self.authoritative.len(), "Replica connected");
        replica
    }

    /// Stops relaying to `id`. Writes it already sent still go out.
    pub fn disconnect(&mut self, id: ReplicaId) {
        self.replicas.retain(|replica| replica.id != id);
        trace!(replica = id, "Replica disconnected");
    }

    /// Connected replicas.
    #[must_use]
    pub fn replicas(&self) -> &[Arc<ReplicaStore>] {
        &self.replicas
    }

    /// Writes waiting to be relayed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    /// Relay counters.
    #[must_use]
    pub fn stats(&self) -> HubStats {
        self.stats
    }

    /// Latest relayed value of `key`.
    #[must_use]
    pub fn authoritative(&self, key: &str) -> Option<&Value> {
        self.authoritative.get(key).map(|versioned| &versioned.value)
    }

    /// Relays every pending write. Returns the number of deliveries.
    pub fn deliver(&mut self) -> usize {
        let updates: Vec<StateUpdate> = self.inbox.try_iter().collect();
        if updates.is_empty() {
            return 0;
        }
        self.stats.received += updates.len() as u64;
        for update in &updates {
            apply_lww(&mut self.authoritative, update);
        }

        let mut delivered = 0;
        for replica in &self.replicas {
            let mut batch: Vec<&StateUpdate> = Vec::with_capacity(updates.len());
            for update in updates.iter().filter(|update| update.origin != replica.id) {
                batch.push(update);
                if roll(&mut self.rng, self.conditions.redeliver_percent) {
                    batch.push(update);
                    self.stats.redelivered += 1;
                }
            }
            if self.conditions.reorder {
                batch.shuffle(&mut self.rng);
            }
            for update in batch {
                if !replica.apply(update) {
                    self.stats.superseded += 1;
                }
                delivered += 1;
            }
        }
        self.stats.delivered += delivered as u64;
        delivered
    }

    /// True if every connected replica holds the relayed value of `key`.
    #[must_use]
    pub fn is_converged(&self, key: &str) -> bool {
        let expected = self.authoritative(key);
        self.replicas
            .iter()
            .all(|replica| replica.read(key).as_ref() == expected)
    }
}

impl fmt::Debug for ReplicaHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicaHub")
            .field("replicas", &self.replicas.len())
            .field("pending", &self.inbox.len())
            .field("conditions", &self.conditions)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_write_visible_locally_then_relayed() {
        let mut hub = ReplicaHub::new(DeliveryConditions::PERFECT, 1);
        let a = hub.connect();
        let b = hub.connect();

        a.write("k", json!(1));
        assert_eq!(a.read("k"), Some(json!(1)));
        assert_eq!(b.read("k"), None);
        assert_eq!(hub.pending(), 1);

        assert_eq!(hub.deliver(), 1);
        assert_eq!(b.read("k"), Some(json!(1)));
        assert!(hub.is_converged("k"));
    }

    #[test]
    fn test_last_write_wins_despite_reordering() {
        let conditions = DeliveryConditions {
            redeliver_percent: 100,
            reorder: true,
        };
        let mut hub = ReplicaHub::new(conditions, 7);
        let a = hub.connect();
        let b = hub.connect();
        let c = hub.connect();

        a.write("k", json!("first"));
        b.write("k", json!("second"));
        a.write("k", json!("third"));
        hub.deliver();

        for replica in [&a, &b, &c] {
            assert_eq!(replica.read("k"), Some(json!("third")));
        }
        assert!(hub.is_converged("k"));
        assert!(hub.stats().redelivered > 0);
        assert!(hub.stats().superseded > 0);
    }

    #[test]
    fn test_late_replica_is_seeded() {
        let mut hub = ReplicaHub::new(DeliveryConditions::PERFECT, 3);
        let a = hub.connect();
        a.write("k", json!(42));
        hub.deliver();

        let late = hub.connect();
        assert_eq!(late.read("k"), Some(json!(42)));
    }

    #[test]
    fn test_disconnected_replica_writes_still_relayed() {
        let mut hub = ReplicaHub::new(DeliveryConditions::PERFECT, 3);
        let a = hub.connect();
        let b = hub.connect();

        a.write("k", json!("bye"));
        hub.disconnect(a.id());
        hub.deliver();

        assert_eq!(b.read("k"), Some(json!("bye")));
        assert_eq!(hub.replicas().len(), 1);
        assert_eq!(a.writes(), 1);
    }
}
