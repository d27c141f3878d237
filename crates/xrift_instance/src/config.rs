//! # Configuration
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration. Loading always validates.
//!
//! ```toml
//! state_namespace = "lobby-board"
//! max_entries = 50
//! display_name_fallback = "???"
//!
//! [labels]
//! join = "joined"
//! leave = "left"
//! ```

use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use xrift_shared::{
    logs_state_key, Labels, DEFAULT_DISPLAY_NAME_FALLBACK, DEFAULT_MAX_ENTRIES, DEFAULT_STATE_NAMESPACE,
};

use crate::error::{InstanceError, InstanceResult};

fn read_toml<T: DeserializeOwned>(path: &Path) -> InstanceResult<T> {
    let raw = fs::read_to_string(path).map_err(|source| InstanceError::ConfigIo {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&raw)?)
}

// ============================================================================
// ENTRY LOG
// ============================================================================

/// Settings for one entry-log board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryLogConfig {
    /// Namespace of the state key; distinguishes several boards.
    pub state_namespace: String,
    /// Entries retained, oldest dropped first.
    pub max_entries: usize,
    /// Name written when a user's metadata is not known yet.
    pub display_name_fallback: String,
    /// Row labels.
    pub labels: Labels,
}

impl Default for EntryLogConfig {
    fn default() -> Self {
        Self {
            state_namespace: DEFAULT_STATE_NAMESPACE.to_owned(),
            max_entries: DEFAULT_MAX_ENTRIES,
            display_name_fallback: DEFAULT_DISPLAY_NAME_FALLBACK.to_owned(),
            labels: Labels::default(),
        }
    }
}

impl EntryLogConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns a parse error or [`InstanceError::InvalidConfig`].
    pub fn from_toml_str(raw: &str) -> InstanceResult<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an I/O, parse or validation error.
    pub fn from_path(path: impl AsRef<Path>) -> InstanceResult<Self> {
        let config: Self = read_toml(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> InstanceResult<()> {
        if self.max_entries == 0 {
            return Err(InstanceError::InvalidConfig("max_entries must be at least 1".into()));
        }
        if self.state_namespace.is_empty() {
            return Err(InstanceError::InvalidConfig("state_namespace must not be empty".into()));
        }
        if self.display_name_fallback.is_empty() {
            return Err(InstanceError::InvalidConfig(
                "display_name_fallback must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Retention bound.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::InvalidConfig`] when `max_entries` is zero.
    pub fn capacity(&self) -> InstanceResult<NonZeroUsize> {
        NonZeroUsize::new(self.max_entries)
            .ok_or_else(|| InstanceError::InvalidConfig("max_entries must be at least 1".into()))
    }

    /// Key the log is stored under.
    #[must_use]
    pub fn state_key(&self) -> String {
        logs_state_key(&self.state_namespace)
    }
}

// ============================================================================
// SIMULATION
// ============================================================================

/// Settings for the replicated-store convergence simulation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Distinct users that come and go.
    pub clients: usize,
    /// Join/leave transitions to simulate.
    pub churn_events: usize,
    /// Chance (percent) a presence notification is delivered twice.
    pub duplicate_percent: u8,
    /// Chance (percent) a store update is delivered twice.
    pub redeliver_percent: u8,
    /// Chance (percent) a client's roster lags behind the newest joiner.
    pub stale_roster_percent: u8,
    /// Shuffle store updates before delivering them.
    pub reorder: bool,
    /// RNG seed.
    pub seed: u64,
    /// Board under test.
    pub entry_log: EntryLogConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            clients: 8,
            churn_events: 200,
            duplicate_percent: 10,
            redeliver_percent: 10,
            stale_roster_percent: 20,
            reorder: true,
            seed: 0x5EED,
            entry_log: EntryLogConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns a parse error or [`InstanceError::InvalidConfig`].
    pub fn from_toml_str(raw: &str) -> InstanceResult<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an I/O, parse or validation error.
    pub fn from_path(path: impl AsRef<Path>) -> InstanceResult<Self> {
        let config: Self = read_toml(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> InstanceResult<()> {
        if self.clients == 0 {
            return Err(InstanceError::InvalidConfig("clients must be at least 1".into()));
        }
        for (name, percent) in [
            ("duplicate_percent", self.duplicate_percent),
            ("redeliver_percent", self.redeliver_percent),
            ("stale_roster_percent", self.stale_roster_percent),
        ] {
            if percent > 100 {
                return Err(InstanceError::InvalidConfig(format!("{name} must be at most 100")));
            }
        }
        self.entry_log.validate()
    }
}
