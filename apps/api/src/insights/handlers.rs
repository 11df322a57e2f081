//! Axum route handlers for the Insights API.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::auth::Caller;
use crate::errors::AppError;
use crate::insights::service::InsightsResponse;
use crate::rate_limit::QuotaStatus;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InsightsRequest {
    pub timeframe: Option<String>,
}

/// POST /api/v1/insights/mood
///
/// A missing or unreadable body is treated as a missing timeframe so the
/// caller gets `invalid-argument` rather than an extractor rejection.
pub async fn handle_generate_insights(
    State(state): State<AppState>,
    caller: Caller,
    body: Option<Json<InsightsRequest>>,
) -> Result<Json<InsightsResponse>, AppError> {
    let timeframe = body.and_then(|Json(req)| req.timeframe);
    let response = state
        .insights
        .generate(caller.0.as_deref(), timeframe.as_deref())
        .await?;
    Ok(Json(response))
}

/// GET /api/v1/insights/quota
pub async fn handle_insights_quota(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<QuotaStatus>, AppError> {
    Ok(Json(state.insights.quota(caller.0.as_deref()).await?))
}
