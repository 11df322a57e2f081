use std::sync::Arc;

use crate::clock::Clock;
use crate::config::Config;
use crate::insights::InsightsService;
use crate::rate_limit::RateLimiter;
use crate::store::DocumentStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable document store. `PgStore` in production, `MemoryStore` in tests.
    pub store: Arc<dyn DocumentStore>,
    pub clock: Arc<dyn Clock>,
    pub insights: Arc<InsightsService>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        let limiter = RateLimiter::new(
            store.clone(),
            clock.clone(),
            config.rate_limit_failure_policy,
            config.transaction_max_attempts,
        );
        let insights = Arc::new(InsightsService::new(
            store.clone(),
            clock.clone(),
            limiter,
            config.insights_daily_quota,
        ));
        Self {
            store,
            clock,
            insights,
            config,
        }
    }
}
