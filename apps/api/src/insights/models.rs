use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Aggregation period selected by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Week,
    Month,
    Year,
}

impl Timeframe {
    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::Week => "week",
            Timeframe::Month => "month",
            Timeframe::Year => "year",
        }
    }

    /// First instant included in the period ending at `now`.
    /// Month and year use calendar arithmetic, clamping to the end of a
    /// shorter month (Mar 31 minus one month is Feb 29 in a leap year).
    pub fn start_from(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let start = match self {
            Timeframe::Week => now.checked_sub_signed(Duration::days(7)),
            Timeframe::Month => now.checked_sub_months(Months::new(1)),
            Timeframe::Year => now.checked_sub_months(Months::new(12)),
        };
        start.unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "week" => Ok(Timeframe::Week),
            "month" => Ok(Timeframe::Month),
            "year" => Ok(Timeframe::Year),
            other => Err(format!(
                "Invalid timeframe '{other}'. Must be one of: week, month, year."
            )),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One mood observation as stored in the `moods` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodEntry {
    pub user_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub mood_type: String,
    pub value: f64,
    /// Any JSON number. New entries are recorded in whole minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Fields written by other clients that this service does not interpret.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// The mood type and raw value of a single extreme observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodExtreme {
    #[serde(rename = "type")]
    pub mood_type: String,
    pub value: f64,
}

/// Statistics over one caller's entries for a period. Recomputed per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodInsights {
    pub period: Timeframe,
    pub entries_count: usize,
    /// Mean of every entry's value (not the mean of the per-type means).
    pub average_mood: f64,
    pub mood_averages: BTreeMap<String, f64>,
    pub mood_counts: BTreeMap<String, usize>,
    pub top_mood: String,
    pub highest_mood: MoodExtreme,
    pub lowest_mood: MoodExtreme,
    /// UTC calendar date (YYYY-MM-DD) → mean value that day.
    pub moods_by_day: BTreeMap<String, f64>,
}
