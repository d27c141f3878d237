//! Global or client-local state behind one handle.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{InstanceState, SyncedState};
use crate::error::InstanceResult;

/// Where a component keeps its state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Shared with every client in the instance.
    #[default]
    Global,
    /// Kept on this client only.
    Local,
}

/// State handle whose storage follows a [`SyncMode`].
#[derive(Debug)]
pub enum SyncState<T> {
    /// Backed by the synchronized-state store.
    Global(InstanceState<T>),
    /// Backed by a client-local cell.
    Local(RwLock<T>),
}

impl<T> SyncState<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Creates a handle for `key` in the given mode.
    pub fn new(mode: SyncMode, store: Arc<dyn SyncedState>, key: impl Into<String>, initial: T) -> Self {
        match mode {
            SyncMode::Global => Self::Global(InstanceState::new(store, key, initial)),
            SyncMode::Local => Self::Local(RwLock::new(initial)),
        }
    }

    /// Mode this handle was created with.
    #[must_use]
    pub fn mode(&self) -> SyncMode {
        match self {
            Self::Global(_) => SyncMode::Global,
            Self::Local(_) => SyncMode::Local,
        }
    }

    /// Returns the current value.
    ///
    /// # Errors
    ///
    /// Propagates decode failures of global state.
    pub fn get(&self) -> InstanceResult<T> {
        match self {
            Self::Global(state) => state.get(),
            Self::Local(cell) => Ok(cell.read().clone()),
        }
    }

    /// Replaces the value.
    ///
    /// # Errors
    ///
    /// Propagates encode failures of global state.
    pub fn set(&self, value: T) -> InstanceResult<()> {
        match self {
            Self::Global(state) => state.set(&value),
            Self::Local(cell) => {
                *cell.write() = value;
                Ok(())
            }
        }
    }

    /// Computes the next value from the current one and stores it.
    ///
    /// # Errors
    ///
    /// Propagates decode and encode failures of global state.
    pub fn update<F>(&self, next: F) -> InstanceResult<T>
    where
        F: FnOnce(&T) -> T,
    {
        match self {
            Self::Global(state) => state.update(next),
            Self::Local(cell) => {
                let mut guard = cell.write();
                let value = next(&guard);
                *guard = value.clone();
                Ok(value)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStateStore;

    #[test]
    fn test_global_is_visible_to_other_handles() {
        let store: Arc<dyn SyncedState> = Arc::new(LocalStateStore::new());
        let a = SyncState::new(SyncMode::Global, store.clone(), "volume", 1u8);
        let b = SyncState::new(SyncMode::Global, store, "volume", 1u8);
        a.set(3).unwrap();
        assert_eq!(b.get().unwrap(), 3);
        assert_eq!(a.mode(), SyncMode::Global);
    }

    #[test]
    fn test_local_never_touches_store() {
        let store = Arc::new(LocalStateStore::new());
        let local = SyncState::new(SyncMode::Local, store.clone(), "volume", 1u8);
        local.update(|v| v + 1).unwrap();
        assert_eq!(local.get().unwrap(), 2);
        assert!(store.is_empty());
        assert_eq!(local.mode(), SyncMode::Local);
    }

    #[test]
    fn test_mode_wire_names() {
        assert_eq!(serde_json::to_value(SyncMode::Global).unwrap(), "global");
        assert_eq!(serde_json::from_value::<SyncMode>("local".into()).unwrap(), SyncMode::Local);
    }
}
