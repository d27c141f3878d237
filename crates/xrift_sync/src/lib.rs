//! # XRIFT Sync - Coordinator-Free Log Agreement
//!
//! Lets independent clients with stale, eventually-consistent views of who
//! is present agree on who writes a presence entry, and merge whatever
//! they write into one order-stable log.
//!
//! ## Pipeline
//!
//! ```text
//!  presence transition
//!          │
//!          ▼
//!  ┌────────────────┐   not elected
//!  │ is_writer_among│ ─────────────▶ (do nothing)
//!  └───────┬────────┘
//!          │ elected
//!          ▼
//!  ┌────────────────┐     ┌──────────────┐     ┌──────────────┐
//!  │   assign_id    │ ──▶ │    merge     │ ──▶ │    repair    │
//!  │ kind-user-count│     │ dedup + trim │     │ fallback fix │
//!  └────────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Two clients reacting to the same transition compute the same ID, so a
//! second write is always a no-op.
//!
//! ## Example
//!
//! ```rust
//! use std::num::NonZeroUsize;
//! use xrift_shared::{Log, LogKind};
//! use xrift_sync::{create_entry, is_writer_among, merge};
//!
//! let log = Log::new();
//! let max = NonZeroUsize::new(20).unwrap();
//!
//! if is_writer_among([Some("a"), Some("b")], Some("a")) {
//!     let entry = create_entry(LogKind::Join, "u3", "Carol", None, &log, "09:00".into());
//!     let log = merge(&log, entry, max);
//!     assert_eq!(log[0].id, "join-u3-0");
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod election;
pub mod id;
pub mod merge;
pub mod repair;

pub use election::{election_order, is_writer_among, CandidateSet};
pub use id::{assign_id, create_entry};
pub use merge::merge;
pub use repair::{repair, CachedProfile, UserCache};
