//! Presence events delivered by the platform.
//!
//! Payloads arrive loosely typed. They are decoded exactly once, here, into
//! [`PresenceEvent`]; nothing downstream inspects raw payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{USER_JOINED_EVENT, USER_LEFT_EVENT};
use crate::error::{DecodeError, DecodeResult};
use crate::model::LogKind;

/// A user joined or left the instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PresenceEvent {
    /// User entered the instance.
    Joined {
        /// User that joined.
        user_id: String,
        /// Guest account.
        is_guest: bool,
    },
    /// User left the instance.
    Left {
        /// User that left.
        user_id: String,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserJoinedPayload {
    user_id: String,
    #[serde(default)]
    is_guest: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserLeftPayload {
    user_id: String,
}

impl PresenceEvent {
    /// Creates a join event for a non-guest user.
    #[must_use]
    pub fn joined(user_id: impl Into<String>) -> Self {
        Self::Joined {
            user_id: user_id.into(),
            is_guest: false,
        }
    }

    /// Creates a leave event.
    #[must_use]
    pub fn left(user_id: impl Into<String>) -> Self {
        Self::Left {
            user_id: user_id.into(),
        }
    }

    /// Decodes a platform payload received on `event_name`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnknownEvent`] for non-presence events and
    /// [`DecodeError::Payload`] when the payload lacks a `userId`.
    pub fn decode(event_name: &str, payload: &Value) -> DecodeResult<Self> {
        let payload_error = |source| DecodeError::Payload {
            event: event_name.to_owned(),
            source,
        };
        match event_name {
            USER_JOINED_EVENT => {
                let data = UserJoinedPayload::deserialize(payload).map_err(payload_error)?;
                Ok(Self::Joined {
                    user_id: data.user_id,
                    is_guest: data.is_guest,
                })
            }
            USER_LEFT_EVENT => {
                let data = UserLeftPayload::deserialize(payload).map_err(payload_error)?;
                Ok(Self::Left {
                    user_id: data.user_id,
                })
            }
            other => Err(DecodeError::UnknownEvent(other.to_owned())),
        }
    }

    /// Encodes this event as the platform would deliver it.
    #[must_use]
    pub fn encode(&self) -> (&'static str, Value) {
        match self {
            Self::Joined { user_id, is_guest } => (
                USER_JOINED_EVENT,
                serde_json::json!({ "userId": user_id, "isGuest": is_guest }),
            ),
            Self::Left { user_id } => (USER_LEFT_EVENT, serde_json::json!({ "userId": user_id })),
        }
    }

    /// Returns the user the transition is about.
    #[must_use]
    pub fn user_id(&self) -> &str {
        match self {
            Self::Joined { user_id, .. } | Self::Left { user_id } => user_id,
        }
    }

    /// Returns the log kind this transition produces.
    #[must_use]
    pub const fn kind(&self) -> LogKind {
        match self {
            Self::Joined { .. } => LogKind::Join,
            Self::Left { .. } => LogKind::Leave,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_joined() {
        let event =
            PresenceEvent::decode("user-joined", &json!({ "userId": "u3", "isGuest": true })).unwrap();
        assert_eq!(
            event,
            PresenceEvent::Joined {
                user_id: "u3".into(),
                is_guest: true
            }
        );
        assert_eq!(event.kind(), LogKind::Join);
    }

    #[test]
    fn test_decode_left_ignores_extra_fields() {
        let event =
            PresenceEvent::decode("user-left", &json!({ "userId": "u3", "reason": "timeout" })).unwrap();
        assert_eq!(event, PresenceEvent::left("u3"));
        assert_eq!(event.user_id(), "u3");
    }

    #[test]
    fn test_decode_rejects_unknown_event() {
        let err = PresenceEvent::decode("reaction", &json!({ "userId": "u3" })).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownEvent(name) if name == "reaction"));
    }

    #[test]
    fn test_decode_rejects_missing_user() {
        let err = PresenceEvent::decode("user-joined", &json!({ "isGuest": false })).unwrap_err();
        assert!(matches!(err, DecodeError::Payload { .. }));
    }

    #[test]
    fn test_encode_decodes_back() {
        let event = PresenceEvent::joined("u9");
        let (name, payload) = event.encode();
        assert_eq!(PresenceEvent::decode(name, &payload).unwrap(), event);
    }
}
