//! Timestamp utilities

use chrono::Utc;

/// Current time as unix milliseconds (cache expiry column unit)
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Absolute expiry timestamp (unix millis) for an entry written now with `ttl`
///
/// Saturates instead of overflowing for absurdly large TTLs.
pub fn expiry_from_now(ttl: std::time::Duration) -> i64 {
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now_millis().saturating_add(ttl_ms)
}
