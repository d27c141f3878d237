//! Stream URL and playback-time helpers.

/// True if `url` looks like an HLS playlist.
#[must_use]
pub fn is_hls_url(url: &str) -> bool {
    url.contains(".m3u8") || url.contains("application/vnd.apple.mpegurl")
}

/// Appends a cache-busting `_ck` query parameter.
#[must_use]
pub fn append_cache_key(url: &str, cache_key: u64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}_ck={cache_key}")
}

/// Formats a playback position as `M:SS`. Negative and non-finite
/// positions show as `0:00`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_time(seconds: f64) -> String {
    let whole = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", whole / 60, whole % 60)
}
