//! Small time helpers used across layers.

use chrono::Utc;

/// Current Unix epoch seconds.
#[must_use]
pub fn epoch_secs() -> i64 {
    Utc::now().timestamp()
}

/// Format seconds as `M:SS` (`95.0` → `"1:35"`).
#[must_use]
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as i64;
    let mins = total / 60;
    let secs = total % 60;
    format!("{mins}:{secs:02}")
}
