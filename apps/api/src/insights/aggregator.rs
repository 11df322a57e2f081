//! Turns a mood series into `MoodInsights`.
//!
//! - `averageMood` weights every entry equally; `moodAverages` weights each
//!   mood type equally. They differ whenever group sizes differ.
//! - `topMood` is the type with the highest mean. Ties go to the
//!   lexicographically smallest type name.
//! - `highestMood` / `lowestMood` are single raw observations. Ties go to the
//!   earliest entry in the series.
//! - `moodsByDay` buckets by the UTC calendar date of each timestamp.

use std::collections::BTreeMap;

use super::models::{MoodEntry, MoodExtreme, MoodInsights, Timeframe};

#[derive(Default)]
struct Tally {
    sum: f64,
    count: usize,
}

impl Tally {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

/// `None` means "not enough data", which is distinct from a series of zeros.
pub fn aggregate(series: &[MoodEntry], timeframe: Timeframe) -> Option<MoodInsights> {
    let first = series.first()?;

    let mut overall = Tally::default();
    let mut by_type: BTreeMap<&str, Tally> = BTreeMap::new();
    let mut by_day: BTreeMap<String, Tally> = BTreeMap::new();
    let mut highest = first;
    let mut lowest = first;

    for entry in series {
        overall.add(entry.value);
        by_type.entry(entry.mood_type.as_str()).or_default().add(entry.value);
        by_day
            .entry(entry.timestamp.date_naive().format("%Y-%m-%d").to_string())
            .or_default()
            .add(entry.value);

        if entry.value > highest.value {
            highest = entry;
        }
        if entry.value < lowest.value {
            lowest = entry;
        }
    }

    let mood_averages: BTreeMap<String, f64> = by_type
        .iter()
        .map(|(mood, tally)| (mood.to_string(), tally.mean()))
        .collect();
    let mood_counts = by_type
        .iter()
        .map(|(mood, tally)| (mood.to_string(), tally.count))
        .collect();

    // BTreeMap iterates in key order; strict `>` keeps the first (smallest) name on ties.
    let mut top: Option<(&String, f64)> = None;
    for (mood, &avg) in &mood_averages {
        if top.map_or(true, |(_, best)| avg > best) {
            top = Some((mood, avg));
        }
    }
    let top_mood = top.map(|(mood, _)| mood.clone())?;

    Some(MoodInsights {
        period: timeframe,
        entries_count: series.len(),
        average_mood: overall.mean(),
        top_mood,
        mood_counts,
        highest_mood: MoodExtreme {
            mood_type: highest.mood_type.clone(),
            value: highest.value,
        },
        lowest_mood: MoodExtreme {
            mood_type: lowest.mood_type.clone(),
            value: lowest.value,
        },
        moods_by_day: by_day
            .into_iter()
            .map(|(day, tally)| (day, tally.mean()))
            .collect(),
        mood_averages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn entry(mood: &str, value: f64, at: DateTime<Utc>) -> MoodEntry {
        MoodEntry {
            user_id: "u1".to_string(),
            timestamp: at,
            mood_type: mood.to_string(),
            value,
            duration_minutes: None,
            notes: None,
            extra: BTreeMap::new(),
        }
    }

    fn day(d: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_series_is_not_enough_data() {
        assert_eq!(aggregate(&[], Timeframe::Week), None);
    }

    #[test]
    fn test_worked_example() {
        let series = vec![
            entry("Joy", 80.0, day(1, 9)),
            entry("Joy", 60.0, day(1, 18)),
            entry("Fear", 10.0, day(2, 7)),
        ];
        let insights = aggregate(&series, Timeframe::Month).unwrap();

        assert_eq!(insights.period, Timeframe::Month);
        assert_eq!(insights.entries_count, 3);
        assert!((insights.average_mood - 50.0).abs() < 1e-9);
        assert_eq!(
            insights.mood_averages,
            BTreeMap::from([("Fear".to_string(), 10.0), ("Joy".to_string(), 70.0)])
        );
        assert_eq!(insights.top_mood, "Joy");
        assert_eq!(
            insights.highest_mood,
            MoodExtreme {
                mood_type: "Joy".to_string(),
                value: 80.0
            }
        );
        assert_eq!(
            insights.lowest_mood,
            MoodExtreme {
                mood_type: "Fear".to_string(),
                value: 10.0
            }
        );
        assert_eq!(
            insights.moods_by_day,
            BTreeMap::from([("2024-01-01".to_string(), 70.0), ("2024-01-02".to_string(), 10.0)])
        );
        assert_eq!(insights.mood_counts.get("Joy"), Some(&2));
    }

    #[test]
    fn test_overall_mean_differs_from_mean_of_type_means() {
        let series = vec![
            entry("Calm", 90.0, day(3, 8)),
            entry("Calm", 90.0, day(3, 9)),
            entry("Calm", 90.0, day(3, 10)),
            entry("Sad", 10.0, day(3, 11)),
        ];
        let insights = aggregate(&series, Timeframe::Week).unwrap();
        // (90 * 3 + 10) / 4 = 70, whereas (90 + 10) / 2 = 50.
        assert!((insights.average_mood - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_counts_and_mean_match_series() {
        let values = [12.5, 99.0, 0.0, 47.25, 63.0];
        let series: Vec<_> = values
            .iter()
            .enumerate()
            .map(|(i, v)| entry(if i % 2 == 0 { "A" } else { "B" }, *v, day(5, i as u32)))
            .collect();
        let insights = aggregate(&series, Timeframe::Year).unwrap();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        assert_eq!(insights.entries_count, values.len());
        assert!((insights.average_mood - mean).abs() < 1e-9);
    }

    #[test]
    fn test_top_mood_tie_goes_to_smallest_name() {
        let series = vec![
            entry("Zest", 50.0, day(1, 1)),
            entry("Awe", 50.0, day(1, 2)),
            entry("Calm", 20.0, day(1, 3)),
        ];
        assert_eq!(aggregate(&series, Timeframe::Week).unwrap().top_mood, "Awe");
    }

    #[test]
    fn test_extreme_tie_goes_to_earliest_entry() {
        let series = vec![
            entry("Hope", 75.0, day(1, 1)),
            entry("Joy", 75.0, day(1, 2)),
            entry("Fear", 5.0, day(1, 3)),
            entry("Dread", 5.0, day(1, 4)),
        ];
        let insights = aggregate(&series, Timeframe::Week).unwrap();
        assert_eq!(insights.highest_mood.mood_type, "Hope");
        assert_eq!(insights.lowest_mood.mood_type, "Fear");
    }

    #[test]
    fn test_all_zero_values_still_produce_insights() {
        let series = vec![entry("Numb", 0.0, day(9, 0))];
        let insights = aggregate(&series, Timeframe::Week).unwrap();
        assert_eq!(insights.average_mood, 0.0);
        assert_eq!(insights.top_mood, "Numb");
    }

    #[test]
    fn test_days_bucket_by_utc_date() {
        let series = vec![
            entry("Joy", 40.0, Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap()),
            entry("Joy", 60.0, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()),
        ];
        let insights = aggregate(&series, Timeframe::Week).unwrap();
        assert_eq!(insights.moods_by_day.len(), 2);
        assert_eq!(insights.moods_by_day["2024-01-01"], 40.0);
    }
}
