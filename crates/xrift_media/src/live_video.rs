//! # Live Video Player State
//!
//! Live streams drop out while segments are still being produced. An error
//! schedules one reload [`RETRY_DELAY`] later; further errors while that
//! reload is pending are ignored. Retries never give up on their own.
//! Playback resuming clears the retrying flag but leaves a scheduled reload
//! in place; only a URL change or an explicit stop cancels it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use xrift_instance::{InstanceResult, SyncMode, SyncState, SyncedState};

use crate::format::append_cache_key;

/// Delay between a stream error and the reload it triggers.
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Player state shared by every client.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveVideoState {
    /// Stream being shown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Playing or paused.
    pub playing: bool,
    /// Bumped to force every client to reload the stream.
    pub reload_key: u64,
}

/// Construction options for [`LiveVideoPlayer`].
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerOptions {
    /// Stream shown before anyone picks one.
    pub initial_url: Option<String>,
    /// Start playing.
    pub initial_playing: bool,
    /// Local volume, 0.0 to 1.0.
    pub initial_volume: f32,
    /// Share state with the instance or keep it local.
    pub sync: SyncMode,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            initial_url: None,
            initial_playing: false,
            initial_volume: 1.0,
            sync: SyncMode::Global,
        }
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// One live video screen as seen by the local client.
#[derive(Debug)]
pub struct LiveVideoPlayer {
    state: SyncState<LiveVideoState>,
    volume: f32,
    buffering: bool,
    retrying: bool,
    retry_at: Option<Instant>,
}

impl LiveVideoPlayer {
    /// Creates a player whose state lives under `live-video-{id}`.
    pub fn new(store: Arc<dyn SyncedState>, id: &str, options: PlayerOptions) -> Self {
        let initial = LiveVideoState {
            url: options.initial_url.filter(|url| !url.is_empty()),
            playing: options.initial_playing,
            reload_key: 0,
        };
        Self {
            state: SyncState::new(options.sync, store, format!("live-video-{id}"), initial),
            volume: clamp_volume(options.initial_volume),
            buffering: false,
            retrying: false,
            retry_at: None,
        }
    }

    /// Current shared state.
    ///
    /// # Errors
    ///
    /// Propagates store decode failures.
    pub fn state(&self) -> InstanceResult<LiveVideoState> {
        self.state.get()
    }

    /// URL to hand the decoder, cache-keyed by the reload counter.
    ///
    /// # Errors
    ///
    /// Propagates store decode failures.
    pub fn stream_url(&self) -> InstanceResult<Option<String>> {
        let state = self.state.get()?;
        Ok(state.url.map(|url| append_cache_key(&url, state.reload_key)))
    }

    /// Local volume.
    #[must_use]
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// True while the decoder waits for data.
    #[must_use]
    pub fn is_buffering(&self) -> bool {
        self.buffering
    }

    /// True from a stream error until playback resumes or the reload fires.
    #[must_use]
    pub fn is_retrying(&self) -> bool {
        self.retrying
    }

    /// True while a reload is scheduled.
    #[must_use]
    pub fn has_pending_reload(&self) -> bool {
        self.retry_at.is_some()
    }

    /// Switches every client to `url`. An empty URL clears the stream and
    /// pauses.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn change_url(&mut self, url: &str) -> InstanceResult<LiveVideoState> {
        let next = self.state.update(|prev| LiveVideoState {
            url: (!url.is_empty()).then(|| url.to_owned()),
            playing: !url.is_empty(),
            ..prev.clone()
        })?;
        self.retrying = false;
        self.retry_at = None;
        debug!(url, "Live video URL changed");
        Ok(next)
    }

    /// Flips play/pause for every client.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn toggle_play(&mut self) -> InstanceResult<LiveVideoState> {
        self.state.update(|prev| LiveVideoState {
            playing: !prev.playing,
            ..prev.clone()
        })
    }

    /// Clears the stream for every client and forces a reload.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn stop(&mut self) -> InstanceResult<LiveVideoState> {
        let next = self.state.update(|prev| LiveVideoState {
            url: None,
            playing: false,
            reload_key: prev.reload_key + 1,
        })?;
        self.buffering = false;
        self.retrying = false;
        self.retry_at = None;
        Ok(next)
    }

    /// Sets the local volume, clamped to 0.0..=1.0.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_volume(volume);
    }

    /// Reports decoder buffering. Playback resuming clears the retrying
    /// flag; an already scheduled reload still fires.
    pub fn set_buffering(&mut self, buffering: bool) {
        self.buffering = buffering;
        if !buffering {
            self.retrying = false;
        }
    }

    /// Reports a stream error at `now`. Ignored while retrying; otherwise
    /// schedules a reload and returns true. A reload still pending from an
    /// earlier error keeps its due time.
    pub fn report_error(&mut self, now: Instant, message: &str) -> bool {
        if self.retrying {
            return false;
        }
        warn!(error = message, delay_ms = RETRY_DELAY.as_millis(), "Live video error, retrying");
        self.retrying = true;
        self.buffering = true;
        self.retry_at.get_or_insert(now + RETRY_DELAY);
        true
    }

    /// Fires a due reload. Returns whether one fired.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn poll(&mut self, now: Instant) -> InstanceResult<bool> {
        match self.retry_at {
            Some(due) if now >= due => {
                self.retry_at = None;
                self.retrying = false;
                let next = self.state.update(|prev| LiveVideoState {
                    reload_key: prev.reload_key + 1,
                    ..prev.clone()
                })?;
                debug!(reload_key = next.reload_key, "Live video reloaded");
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
