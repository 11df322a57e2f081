//! Optimistic read-modify-write on a single document.
//!
//! The decision closure sees the document as read and either asks for a write
//! or finishes without one. A write is committed with `compare_and_swap`; if
//! another writer got there first the whole cycle runs again against the
//! fresh document. No lock is held between the read and the write.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use super::{DocumentStore, StoreError};

const BACKOFF_BASE_MS: u64 = 2;
const BACKOFF_CAP_MS: u64 = 64;

/// Outcome of one pass of a transaction's decision closure.
#[derive(Debug)]
pub enum TxnDecision<T> {
    /// Commit `data` and return `output` once the write lands.
    Write { data: Value, output: T },
    /// Nothing to write; return `output` immediately.
    Skip(T),
}

fn backoff(attempt: u32) -> Duration {
    let ms = BACKOFF_BASE_MS.saturating_mul(1 << attempt.min(16).saturating_sub(1));
    Duration::from_millis(ms.min(BACKOFF_CAP_MS))
}

pub async fn run_transaction<T, F>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
    max_attempts: u32,
    mut decide: F,
) -> Result<T, StoreError>
where
    F: FnMut(Option<&Value>) -> Result<TxnDecision<T>, StoreError>,
{
    for attempt in 0..max_attempts {
        if attempt > 0 {
            let delay = backoff(attempt);
            debug!(
                collection,
                id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "transaction conflict, retrying"
            );
            tokio::time::sleep(delay).await;
        }

        let current = store.get(collection, id).await?;
        let expected_version = current.as_ref().map(|doc| doc.version);

        match decide(current.as_ref().map(|doc| &doc.data))? {
            TxnDecision::Skip(output) => return Ok(output),
            TxnDecision::Write { data, output } => {
                if store
                    .compare_and_swap(collection, id, expected_version, data)
                    .await?
                {
                    return Ok(output);
                }
            }
        }
    }

    Err(StoreError::Contention {
        collection: collection.to_string(),
        id: id.to_string(),
        attempts: max_attempts,
    })
}
