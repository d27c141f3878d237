//! Typed handle on one key of the synchronized-state store.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::SyncedState;
use crate::error::{InstanceError, InstanceResult};

/// Instance-wide state stored under one key.
///
/// Reads fall back to the initial value until anyone writes the key.
/// [`update`](Self::update) is a read-modify-write against this client's
/// current view; concurrent updates from other clients resolve
/// last-write-wins in the store.
pub struct InstanceState<T> {
    key: String,
    initial: T,
    store: Arc<dyn SyncedState>,
}

impl<T> InstanceState<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Binds `key` in `store`, defaulting to `initial`.
    pub fn new(store: Arc<dyn SyncedState>, key: impl Into<String>, initial: T) -> Self {
        Self {
            key: key.into(),
            initial,
            store,
        }
    }

    /// State key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the current value.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::Decode`] if the stored value has the wrong shape.
    pub fn get(&self) -> InstanceResult<T> {
        match self.store.read(&self.key) {
            Some(value) => serde_json::from_value(value).map_err(|source| InstanceError::Decode {
                key: self.key.clone(),
                source,
            }),
            None => Ok(self.initial.clone()),
        }
    }

    /// Replaces the value.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::Encode`] if `value` cannot be serialized.
    pub fn set(&self, value: &T) -> InstanceResult<()> {
        let encoded = serde_json::to_value(value).map_err(|source| InstanceError::Encode {
            key: self.key.clone(),
            source,
        })?;
        self.store.write(&self.key, encoded);
        Ok(())
    }

    /// Computes the next value from the current one and writes it.
    ///
    /// # Errors
    ///
    /// Propagates decode and encode failures.
    pub fn update<F>(&self, next: F) -> InstanceResult<T>
    where
        F: FnOnce(&T) -> T,
    {
        let value = next(&self.get()?);
        self.set(&value)?;
        Ok(value)
    }
}

impl<T> fmt::Debug for InstanceState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceState").field("key", &self.key).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStateStore;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct DoorState {
        is_open: bool,
        opened_by: Option<String>,
    }

    fn closed() -> DoorState {
        DoorState {
            is_open: false,
            opened_by: None,
        }
    }

    #[test]
    fn test_initial_until_written() {
        let store = Arc::new(LocalStateStore::new());
        let door = InstanceState::new(store.clone(), "main-door", closed());
        assert_eq!(door.get().unwrap(), closed());
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_and_update() {
        let store = Arc::new(LocalStateStore::new());
        let door = InstanceState::new(store.clone(), "main-door", closed());

        door.set(&DoorState {
            is_open: true,
            opened_by: Some("player-123".into()),
        })
        .unwrap();
        assert_eq!(
            store.read("main-door"),
            Some(json!({ "isOpen": true, "openedBy": "player-123" }))
        );

        let toggled = door
            .update(|prev| DoorState {
                is_open: !prev.is_open,
                ..prev.clone()
            })
            .unwrap();
        assert!(!toggled.is_open);
        assert_eq!(door.get().unwrap(), toggled);
    }

    #[test]
    fn test_two_handles_share_the_key() {
        let store: Arc<dyn SyncedState> = Arc::new(LocalStateStore::new());
        let a = InstanceState::new(store.clone(), "counter", 0u32);
        let b = InstanceState::new(store, "counter", 0u32);
        a.set(&7).unwrap();
        assert_eq!(b.get().unwrap(), 7);
    }

    #[test]
    fn test_foreign_shape_is_decode_error() {
        let store = Arc::new(LocalStateStore::new());
        store.write("counter", json!("not a number"));
        let counter = InstanceState::new(store, "counter", 0u32);
        assert!(matches!(counter.get(), Err(InstanceError::Decode { key, .. }) if key == "counter"));
    }
}
