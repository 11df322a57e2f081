use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::window::{RateLimitWindow, RATE_LIMITS_COLLECTION};
use crate::clock::Clock;
use crate::store::{run_transaction, DocumentStore, StoreError, TxnDecision};

/// What to do when the store cannot answer an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Surface the failure; the call is denied.
    #[default]
    Closed,
    /// Log and admit without recording the call.
    Open,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "closed" | "deny" => Ok(FailurePolicy::Closed),
            "open" | "allow" => Ok(FailurePolicy::Open),
            other => Err(format!("unknown rate limit failure policy '{other}' (expected 'closed' or 'open')")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    pub minutes_to_reset: i64,
}

impl Admission {
    fn admitted() -> Self {
        Self {
            allowed: true,
            minutes_to_reset: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatus {
    pub limit: u32,
    pub used: u32,
    pub remaining: u32,
    pub minutes_to_reset: i64,
}

/// Per-(user, operation) sliding-window limiter backed by the document store.
pub struct RateLimiter {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    policy: FailurePolicy,
    max_attempts: u32,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        policy: FailurePolicy,
        max_attempts: u32,
    ) -> Self {
        Self {
            store,
            clock,
            policy,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Admits the call and records it if fewer than `max_calls` calls landed in
    /// the trailing 24 hours. A rejected call leaves the window untouched.
    pub async fn check_and_record(
        &self,
        user_id: &str,
        operation: &str,
        max_calls: NonZeroU32,
    ) -> Result<Admission, StoreError> {
        match self.admit(user_id, operation, max_calls).await {
            Ok(admission) => Ok(admission),
            Err(e) => match self.policy {
                FailurePolicy::Closed => Err(e),
                FailurePolicy::Open => {
                    warn!(user_id, operation, error = %e, "rate limit store failed, admitting (fail-open)");
                    Ok(Admission::admitted())
                }
            },
        }
    }

    async fn admit(
        &self,
        user_id: &str,
        operation: &str,
        max_calls: NonZeroU32,
    ) -> Result<Admission, StoreError> {
        let doc_id = RateLimitWindow::document_id(user_id, operation);
        let limit = max_calls.get() as usize;

        let admission = run_transaction(
            self.store.as_ref(),
            RATE_LIMITS_COLLECTION,
            &doc_id,
            self.max_attempts,
            |current| {
                // Read "now" per attempt so a retried transaction never records a stale instant.
                let now = self.clock.now();
                let now_ms = now.timestamp_millis();
                let mut window: RateLimitWindow = match current {
                    Some(data) => serde_json::from_value(data.clone())?,
                    None => RateLimitWindow::default(),
                };
                window.prune(now_ms);

                if window.call_timestamps.len() >= limit {
                    return Ok(TxnDecision::Skip(Admission {
                        allowed: false,
                        minutes_to_reset: window.minutes_to_reset(now_ms),
                    }));
                }

                window.call_timestamps.push(now_ms);
                window.last_access = Some(now);
                Ok(TxnDecision::Write {
                    data: serde_json::to_value(&window)?,
                    output: Admission::admitted(),
                })
            },
        )
        .await?;

        if admission.allowed {
            debug!(user_id, operation, "call admitted");
        } else {
            info!(
                user_id,
                operation,
                minutes_to_reset = admission.minutes_to_reset,
                "rate limit exceeded"
            );
        }
        Ok(admission)
    }

    /// Current usage of the window without recording anything.
    pub async fn quota_status(
        &self,
        user_id: &str,
        operation: &str,
        max_calls: NonZeroU32,
    ) -> Result<QuotaStatus, StoreError> {
        let doc_id = RateLimitWindow::document_id(user_id, operation);
        let now_ms = self.clock.now().timestamp_millis();

        let mut window: RateLimitWindow = match self.store.get(RATE_LIMITS_COLLECTION, &doc_id).await? {
            Some(doc) => serde_json::from_value(doc.data)?,
            None => RateLimitWindow::default(),
        };
        window.prune(now_ms);

        let limit = max_calls.get();
        let used = u32::try_from(window.call_timestamps.len()).unwrap_or(u32::MAX);
        let minutes_to_reset = if used >= limit {
            window.minutes_to_reset(now_ms)
        } else {
            0
        };
        Ok(QuotaStatus {
            limit,
            used,
            remaining: limit.saturating_sub(used),
            minutes_to_reset,
        })
    }
}
