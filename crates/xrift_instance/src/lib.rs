//! # XRIFT Instance - Shared World State
//!
//! The platform side of a world instance as components see it: a
//! synchronized key/value store, a world event bus, and snapshots of who is
//! present. On top of those sit the presence entry log and the tag board.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      EntryLogTracker                       │
//! │  observe(roster)        self-announce, repair, display log │
//! │  handle(event, roster)  elect, assign id, merge, persist   │
//! └───────┬──────────────────────┬──────────────────────┬──────┘
//!         │                      │                      │
//! ┌───────▼────────┐    ┌────────▼───────┐    ┌─────────▼────────┐
//! │  PresenceFeed  │    │ RosterSnapshot │    │  InstanceState   │
//! │dyn WorldEvents │    │ injected view  │    │ dyn SyncedState  │
//! └────────────────┘    └────────────────┘    └──────────────────┘
//! ```
//!
//! The protocol itself lives in `xrift_sync`; this crate only feeds it
//! snapshots and persists what it returns.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod entry_log;
pub mod error;
pub mod events;
pub mod roster;
pub mod simulation;
pub mod store;
pub mod tag_board;

pub use config::{EntryLogConfig, SimulationConfig};
pub use entry_log::{EntryHook, EntryLogTracker, TrackerPhase, TrackerStats};
pub use error::{InstanceError, InstanceResult};
pub use events::{LocalEventBus, PresenceFeed, Subscription, WorldEvent, WorldEvents};
pub use roster::RosterSnapshot;
pub use store::{InstanceState, LocalStateStore, SyncMode, SyncState, SyncedState};
pub use tag_board::{Tag, TagBoard};
