//! # Boundary Error Types
//!
//! Errors raised while decoding payloads handed over by the platform.
//! Nothing past the boundary ever sees an undecoded payload.

use thiserror::Error;

/// Errors that can occur while decoding platform payloads.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The event name is not a presence event.
    #[error("not a presence event: {0}")]
    UnknownEvent(String),

    /// The payload did not match the event's shape.
    #[error("malformed payload for {event}: {source}")]
    Payload {
        /// Event the payload arrived on.
        event: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for decoding operations.
pub type DecodeResult<T> = Result<T, DecodeError>;
