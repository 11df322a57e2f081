use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::insights::reader::MOODS_COLLECTION;
use crate::insights::MoodEntry;
use crate::store::{DocumentStore, FieldUpdate};

pub const USERS_COLLECTION: &str = "users";
const MAX_MOOD_TYPE_LEN: usize = 64;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMoodEntry {
    pub mood_type: String,
    pub value: f64,
    /// RFC 3339; defaults to the server clock.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordedMood {
    pub id: Uuid,
    #[serde(flatten)]
    pub entry: MoodEntry,
}

fn validate(new: &NewMoodEntry) -> Result<String, AppError> {
    let mood_type = new.mood_type.trim();
    if mood_type.is_empty() {
        return Err(AppError::InvalidArgument("moodType cannot be empty".to_string()));
    }
    if mood_type.chars().count() > MAX_MOOD_TYPE_LEN {
        return Err(AppError::InvalidArgument(format!(
            "moodType must be at most {MAX_MOOD_TYPE_LEN} characters"
        )));
    }
    if !(0.0..=100.0).contains(&new.value) {
        return Err(AppError::InvalidArgument(format!(
            "value must be between 0 and 100, got {}",
            new.value
        )));
    }
    Ok(mood_type.to_string())
}

/// Stores a new entry for `user_id` and stamps the user's profile with
/// `lastMoodEntryAt`, clearing any pending mood reminder.
///
/// Once the entry is stored the call succeeds. A failed profile stamp is
/// logged and left for the next recorded entry to repair.
pub async fn record_mood(
    store: &dyn DocumentStore,
    user_id: &str,
    new: NewMoodEntry,
    now: DateTime<Utc>,
) -> Result<RecordedMood, AppError> {
    let mood_type = validate(&new)?;
    let mut extra = new.extra;
    // Ownership comes from the caller identity, never from the body.
    extra.remove("userId");

    let entry = MoodEntry {
        user_id: user_id.to_string(),
        timestamp: new.timestamp.unwrap_or(now),
        mood_type,
        value: new.value,
        duration_minutes: new.duration_minutes.map(f64::from),
        notes: new.notes.filter(|n| !n.trim().is_empty()),
        extra,
    };
    let id = Uuid::new_v4();
    let data = serde_json::to_value(&entry).map_err(|e| AppError::Internal(e.into()))?;
    store.set(MOODS_COLLECTION, &id.to_string(), data).await?;

    let mut profile = BTreeMap::new();
    profile.insert(
        "lastMoodEntryAt".to_string(),
        FieldUpdate::Set(json!(entry.timestamp.timestamp_millis())),
    );
    profile.insert("moodReminderPending".to_string(), FieldUpdate::Delete);
    if let Err(e) = store.update(USERS_COLLECTION, user_id, profile).await {
        warn!(user_id, mood_id = %id, error = %e, "failed to stamp profile after recording mood");
    }

    info!(user_id, mood_id = %id, mood_type = %entry.mood_type, "mood recorded");
    Ok(RecordedMood { id, entry })
}
