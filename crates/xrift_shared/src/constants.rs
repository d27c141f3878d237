//! Instance-wide constants.
//!
//! Every client must agree on these. Changing the namespace or the event
//! names splits an instance into clients that cannot see each other's logs.

/// Default namespace for entry-log state keys.
pub const DEFAULT_STATE_NAMESPACE: &str = "entry-log";

/// Suffix appended to the namespace to form the log's state key.
pub const LOGS_KEY_SUFFIX: &str = "logs";

/// Default number of retained log entries.
pub const DEFAULT_MAX_ENTRIES: usize = 20;

/// Label written when a user's display name is not known yet.
pub const DEFAULT_DISPLAY_NAME_FALLBACK: &str = "Unknown";

/// Default label for join rows.
pub const DEFAULT_JOIN_LABEL: &str = "入室";

/// Default label for leave rows.
pub const DEFAULT_LEAVE_LABEL: &str = "退室";

/// Platform event fired when a user enters the instance.
pub const USER_JOINED_EVENT: &str = "user-joined";

/// Platform event fired when a user leaves the instance.
pub const USER_LEFT_EVENT: &str = "user-left";

/// Events owned by the platform. World code may listen but never emit.
pub const PLATFORM_EVENTS: [&str; 2] = [USER_JOINED_EVENT, USER_LEFT_EVENT];

/// Returns true if `event_name` is reserved by the platform.
#[must_use]
pub fn is_platform_event(event_name: &str) -> bool {
    PLATFORM_EVENTS.contains(&event_name)
}

/// Builds the state key for a log namespace (`"{namespace}-logs"`).
#[must_use]
pub fn logs_state_key(namespace: &str) -> String {
    format!("{namespace}-{LOGS_KEY_SUFFIX}")
}
