//! Axum route handlers for the Moods API.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};

use crate::auth::Caller;
use crate::clock::Clock;
use crate::errors::AppError;
use crate::moods::{record_mood, NewMoodEntry, RecordedMood};
use crate::state::AppState;

/// POST /api/v1/moods
///
/// Identity is checked before the body, and a body that does not decode as a
/// mood entry is reported as `invalid-argument`.
pub async fn handle_record_mood(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<NewMoodEntry>, JsonRejection>,
) -> Result<(StatusCode, Json<RecordedMood>), AppError> {
    let user_id = caller.user_id()?;
    let Json(req) = body.map_err(|rejection| AppError::InvalidArgument(rejection.body_text()))?;
    let recorded = record_mood(state.store.as_ref(), user_id, req, state.clock.now()).await?;
    Ok((StatusCode::CREATED, Json(recorded)))
}
