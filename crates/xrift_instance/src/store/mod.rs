//! # Synchronized-State Store
//!
//! A per-key, eventually-consistent key/value store shared by every client
//! in an instance. The platform injects the real implementation; when none
//! is injected [`LocalStateStore`] keeps state on this client only.
//!
//! ## Guarantees Assumed
//!
//! - A client observes its own successive writes to a key in program order.
//! - Nothing else. Other clients' writes arrive late, in any order, and the
//!   store applies them last-write-wins.
//!
//! ## Layers
//!
//! ```text
//! SyncState<T>      Global → InstanceState<T>, Local → client-only cell
//!      │
//! InstanceState<T>  typed get / set / update on one key
//!      │
//! dyn SyncedState   raw JSON values by key
//! ```

mod instance_state;
mod sync_mode;

pub use instance_state::InstanceState;
pub use sync_mode::{SyncMode, SyncState};

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

/// Raw access to the instance's synchronized state.
pub trait SyncedState: Send + Sync {
    /// Returns the current value for `key`, if any was ever written.
    fn read(&self, key: &str) -> Option<Value>;

    /// Requests a write. Visible to this client's next read immediately;
    /// visible to other clients eventually.
    fn write(&self, key: &str, value: Value);
}

/// In-memory store used when no platform store is injected.
#[derive(Debug, Default)]
pub struct LocalStateStore {
    states: RwLock<HashMap<String, Value>>,
}

impl LocalStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.read().len()
    }

    /// Returns true if nothing was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.read().is_empty()
    }
}

impl SyncedState for LocalStateStore {
    fn read(&self, key: &str) -> Option<Value> {
        self.states.read().get(key).cloned()
    }

    fn write(&self, key: &str, value: Value) {
        self.states.write().insert(key.to_owned(), value);
    }
}
