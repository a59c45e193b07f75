use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix time in microseconds.
///
/// Write timestamps and the slot freshness table both use this clock, so the
/// fresh/stale comparison is between values from the same source.
pub fn now_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}
