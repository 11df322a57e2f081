pub mod health;

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::insights::handlers as insights;
use crate::moods::handlers as moods;
use crate::state::AppState;

/// Routes plus the request-level layers. A request still running after
/// `REQUEST_TIMEOUT_SECS` is answered with 408 Request Timeout.
pub fn build_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);
    Router::new()
        .route("/health", get(health::health_handler))
        // Insights API
        .route("/api/v1/insights/mood", post(insights::handle_generate_insights))
        .route("/api/v1/insights/quota", get(insights::handle_insights_quota))
        // Moods API
        .route("/api/v1/moods", post(moods::handle_record_mood))
        .with_state(state)
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()) // TODO: restrict origins once the mobile app's web build has a fixed domain
}
