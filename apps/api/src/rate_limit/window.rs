use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Window length: 24 hours.
pub const WINDOW_MS: i64 = 86_400_000;
const MINUTE_MS: i64 = 60_000;

pub const RATE_LIMITS_COLLECTION: &str = "rateLimits";

/// Stored call history for one (user, operation) pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitWindow {
    /// Epoch milliseconds of admitted calls, oldest first.
    #[serde(default)]
    pub call_timestamps: Vec<i64>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_access: Option<DateTime<Utc>>,
}

impl RateLimitWindow {
    pub fn document_id(user_id: &str, operation: &str) -> String {
        format!("{user_id}:{operation}")
    }

    /// Drops calls that are no longer inside the trailing window ending at `now_ms`.
    /// A call made exactly 24h ago has left the window.
    pub fn prune(&mut self, now_ms: i64) {
        let cutoff = now_ms - WINDOW_MS;
        self.call_timestamps.retain(|&ts| ts > cutoff);
    }

    /// Whole minutes (rounded up) until the oldest call in the window expires.
    /// Zero when the window is empty or the oldest call has already expired.
    pub fn minutes_to_reset(&self, now_ms: i64) -> i64 {
        self.call_timestamps
            .iter()
            .min()
            .map_or(0, |&oldest| ceil_minutes(oldest + WINDOW_MS - now_ms))
    }
}

fn ceil_minutes(ms: i64) -> i64 {
    if ms <= 0 {
        0
    } else {
        (ms + MINUTE_MS - 1) / MINUTE_MS
    }
}
