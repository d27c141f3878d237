//! # XRIFT Shared
//!
//! Common types used by every client taking part in an instance.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on:
//! - a synchronized-state store implementation
//! - an event bus implementation
//! - anything that reads the clock on its own
//!
//! If you need platform plumbing, put it in `xrift_instance`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod error;
pub mod events;
pub mod model;
pub mod timestamp;

pub use constants::{
    is_platform_event, logs_state_key, DEFAULT_DISPLAY_NAME_FALLBACK, DEFAULT_MAX_ENTRIES,
    DEFAULT_STATE_NAMESPACE, PLATFORM_EVENTS, USER_JOINED_EVENT, USER_LEFT_EVENT,
};
pub use error::{DecodeError, DecodeResult};
pub use events::PresenceEvent;
pub use model::{Labels, Log, LogEntry, LogKind, UserProfile};
pub use timestamp::{ClockFormat, TimestampFormat};
