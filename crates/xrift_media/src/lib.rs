//! # XRIFT Media - Live Video State
//!
//! Everyone in an instance watches the same live stream: the URL, play
//! state and reload counter are shared through the synchronized-state
//! store. Volume, buffering and retry timers stay on each client.
//!
//! ## Shared vs Local
//!
//! ```text
//!   shared (live-video-{id})          local
//! ┌─────────────────────────┐   ┌──────────────────┐
//! │ url                     │   │ volume           │
//! │ playing                 │   │ buffering        │
//! │ reload_key ─┐           │   │ retry deadline   │
//! └─────────────┼───────────┘   └──────────────────┘
//!               └──▶ ?_ck={reload_key} on the stream URL
//! ```
//!
//! Bumping `reload_key` changes the stream URL for every client, which
//! forces a fresh playlist fetch past any cache.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod format;
pub mod live_video;
pub mod recovery;

pub use format::{append_cache_key, format_time, is_hls_url};
pub use live_video::{LiveVideoPlayer, LiveVideoState, PlayerOptions, RETRY_DELAY};
pub use recovery::{RecoveryTracker, MAX_RECOVERY_ATTEMPTS, RECOVERY_THROTTLE};
