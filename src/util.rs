//! Small helpers shared by the history buffer and the restart handoff.

use std::time::{SystemTime, UNIX_EPOCH};

/// Cut `s` down to `max_chars` characters, marking the cut with `...`.
///
/// Counts characters, not bytes, so multi-byte text (CJK, emoji) is never split
/// in the middle of a code point.
///
/// ```
/// use silibot::util::truncate_with_ellipsis;
///
/// assert_eq!(truncate_with_ellipsis("hello", 10), "hello");
/// assert_eq!(truncate_with_ellipsis("hello world", 5), "hello...");
/// assert_eq!(truncate_with_ellipsis("重启机器人", 2), "重启...");
/// ```
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", s[..idx].trim_end()),
        None => s.to_string(),
    }
}

/// Milliseconds since the Unix epoch. Clock skew before 1970 reads as zero.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

/// Seconds since the Unix epoch.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Render a millisecond span as seconds with two decimals (`12.34s`).
pub fn format_elapsed_ms(elapsed_ms: i64) -> String {
    let clamped = elapsed_ms.max(0);
    format!("{}.{:02}s", clamped / 1000, (clamped % 1000) / 10)
}
