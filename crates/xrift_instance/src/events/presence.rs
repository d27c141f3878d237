//! Presence transitions decoded once at the platform boundary.

use tracing::warn;
use xrift_shared::{PresenceEvent, PLATFORM_EVENTS};

use super::{Subscription, WorldEvents};

/// Typed stream of `user-joined` / `user-left` notifications.
///
/// Both names share one subscription, so joins and leaves come out in the
/// order the platform delivered them.
#[derive(Debug)]
pub struct PresenceFeed {
    subscription: Subscription,
}

impl PresenceFeed {
    /// Subscribes to both presence events on `events`.
    pub fn subscribe(events: &dyn WorldEvents) -> Self {
        Self {
            subscription: events.subscribe_all(&PLATFORM_EVENTS),
        }
    }

    /// Decodes every queued notification. Malformed payloads are logged and
    /// skipped.
    pub fn drain(&self) -> Vec<PresenceEvent> {
        self.subscription
            .drain()
            .into_iter()
            .filter_map(|event| match PresenceEvent::decode(&event.name, &event.payload) {
                Ok(presence) => Some(presence),
                Err(error) => {
                    warn!(event = %event.name, %error, "Dropping undecodable presence event");
                    None
                }
            })
            .collect()
    }

    /// Number of notifications waiting to be drained.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.subscription.pending()
    }
}
