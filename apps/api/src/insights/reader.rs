use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::models::{MoodEntry, Timeframe};
use crate::store::{Direction, DocumentStore, FilterOp, Query, StoreError};

pub const MOODS_COLLECTION: &str = "moods";

/// Returns the caller's entries with `timestamp >= timeframe start`, oldest first.
/// An empty series is a normal result. Documents that no longer decode as a
/// `MoodEntry` are skipped with a warning rather than failing the whole read.
pub async fn fetch_series(
    store: &dyn DocumentStore,
    user_id: &str,
    timeframe: Timeframe,
    now: DateTime<Utc>,
) -> Result<Vec<MoodEntry>, StoreError> {
    let start = timeframe.start_from(now);
    let query = Query::collection(MOODS_COLLECTION)
        .filter("userId", FilterOp::Eq, user_id)
        .filter("timestamp", FilterOp::Gte, start.timestamp_millis())
        .order_by("timestamp", Direction::Ascending);

    let documents = store.query(&query).await?;
    let mut series = Vec::with_capacity(documents.len());
    for doc in documents {
        match serde_json::from_value::<MoodEntry>(doc.data) {
            Ok(entry) => series.push(entry),
            Err(e) => warn!(doc_id = %doc.id, error = %e, "skipping malformed mood entry"),
        }
    }

    debug!(user_id, %timeframe, entries = series.len(), "fetched mood series");
    Ok(series)
}
