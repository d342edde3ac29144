//! Key layout for session-ordered logs.
//!
//! Log keys are `<len>:<session_id>:<nanos>:<uuid>`:
//! - `len` is the byte length of the session id, zero-padded to 8 digits;
//! - `nanos` is zero-padded to 20 digits.
//!
//! The length segment makes a session prefix unique even when ids contain
//! `:` (`work` never matches `work:alice`). A range over the prefix yields
//! entries in insertion-time order, and the uuid suffix keeps keys unique
//! within the same nanosecond.

use chrono::Utc;
use uuid::Uuid;

/// Width of the zero-padded timestamp segment.
const TIMESTAMP_WIDTH: usize = 20;

/// Width of the zero-padded session-length segment.
const LENGTH_WIDTH: usize = 8;

/// Current timestamp in nanoseconds.
pub fn now_ns() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(0)
}

/// Build a fresh log key for `session_id` at `timestamp_ns`.
pub fn log_key(session_id: &str, timestamp_ns: i64) -> String {
    format!(
        "{}{:0width$}:{}",
        session_prefix(session_id),
        timestamp_ns.max(0),
        Uuid::new_v4().simple(),
        width = TIMESTAMP_WIDTH
    )
}

/// Prefix shared by every key of a session and by no other session's keys.
pub fn session_prefix(session_id: &str) -> String {
    format!(
        "{:0width$}:{}:",
        session_id.len(),
        session_id,
        width = LENGTH_WIDTH
    )
}

/// Exclusive upper bound for a prefix scan.
///
/// Given `"00000002:s1:"` returns `"00000002:s1;"` (next byte after `:`).
pub fn prefix_end_bound(prefix: &str) -> String {
    let mut bytes = prefix.as_bytes().to_vec();
    if let Some(last) = bytes.last_mut() {
        *last = last.saturating_add(1);
    }

    String::from_utf8(bytes).unwrap_or_else(|_| format!("{}\x7F", prefix))
}

/// Extract the timestamp segment from a log key.
pub fn timestamp_from_key(key: &str) -> Option<i64> {
    let mut parts = key.rsplitn(3, ':');
    let _uuid = parts.next()?;
    parts.next()?.parse().ok()
}
