//! # Instance Error Types
//!
//! Errors raised at the platform boundary: (de)serializing persisted state,
//! emitting events and loading configuration. The log protocol itself never
//! fails.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in instance plumbing.
#[derive(Error, Debug)]
pub enum InstanceError {
    /// A value could not be encoded for the store.
    #[error("failed to encode state {key}: {source}")]
    Encode {
        /// State key.
        key: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A stored value did not have the expected shape.
    #[error("failed to decode state {key}: {source}")]
    Decode {
        /// State key.
        key: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// World code tried to emit a platform-owned event.
    #[error("event {0} is reserved by the platform")]
    ReservedEvent(String),

    /// The event bus behind a subscription is gone.
    #[error("event channel closed")]
    ChannelClosed,

    /// Configuration values are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for the expected type.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Result type for instance operations.
pub type InstanceResult<T> = Result<T, InstanceError>;
