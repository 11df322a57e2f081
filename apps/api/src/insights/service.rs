use std::num::NonZeroU32;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument};

use super::aggregator::aggregate;
use super::models::{MoodInsights, Timeframe};
use super::reader::fetch_series;
use crate::clock::Clock;
use crate::errors::AppError;
use crate::rate_limit::{QuotaStatus, RateLimiter};
use crate::store::DocumentStore;

/// Rate-limit key for insights generation.
pub const INSIGHTS_OPERATION: &str = "generateMoodInsights";

pub const NOT_ENOUGH_DATA: &str = "Not enough data to generate insights.";
pub const INSIGHTS_GENERATED: &str = "Insights generated successfully.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightsResponse {
    pub success: bool,
    pub insights: Option<MoodInsights>,
    pub message: String,
}

/// Orchestrates one insights request. Holds no per-request state.
pub struct InsightsService {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    limiter: RateLimiter,
    daily_quota: NonZeroU32,
}

impl InsightsService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        limiter: RateLimiter,
        daily_quota: NonZeroU32,
    ) -> Self {
        Self {
            store,
            clock,
            limiter,
            daily_quota,
        }
    }

    /// Validation runs before the store is touched; the rate limit is checked
    /// before any mood data is read.
    #[instrument(skip(self))]
    pub async fn generate(
        &self,
        user_id: Option<&str>,
        timeframe: Option<&str>,
    ) -> Result<InsightsResponse, AppError> {
        let user_id = user_id.ok_or(AppError::Unauthenticated)?;
        let timeframe: Timeframe = timeframe
            .ok_or_else(|| {
                AppError::InvalidArgument(
                    "Missing timeframe. Must be one of: week, month, year.".to_string(),
                )
            })?
            .parse()
            .map_err(AppError::InvalidArgument)?;

        let admission = self
            .limiter
            .check_and_record(user_id, INSIGHTS_OPERATION, self.daily_quota)
            .await?;
        if !admission.allowed {
            return Err(AppError::ResourceExhausted {
                minutes_to_reset: admission.minutes_to_reset,
            });
        }

        let series = fetch_series(self.store.as_ref(), user_id, timeframe, self.clock.now()).await?;
        let Some(insights) = aggregate(&series, timeframe) else {
            info!(%timeframe, "no mood entries in period");
            return Ok(InsightsResponse {
                success: true,
                insights: None,
                message: NOT_ENOUGH_DATA.to_string(),
            });
        };

        info!(%timeframe, entries = insights.entries_count, "insights generated");
        Ok(InsightsResponse {
            success: true,
            insights: Some(insights),
            message: INSIGHTS_GENERATED.to_string(),
        })
    }

    pub async fn quota(&self, user_id: Option<&str>) -> Result<QuotaStatus, AppError> {
        let user_id = user_id.ok_or(AppError::Unauthenticated)?;
        Ok(self
            .limiter
            .quota_status(user_id, INSIGHTS_OPERATION, self.daily_quota)
            .await?)
    }
}
