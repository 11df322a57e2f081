//! Document store — the persistence seam for everything the API reads or writes.
//!
//! Documents are JSON objects addressed by `(collection, id)` and carry a
//! monotonically increasing `version`. The version is what makes optimistic
//! transactions possible: `compare_and_swap` only writes when the version read
//! is still current, and `run_transaction` retries the read-decide-write cycle
//! until it commits.
//!
//! Backends:
//! - `MemoryStore` — process-local, used in tests and `STORE_BACKEND=memory`.
//! - `PgStore` — PostgreSQL `jsonb` documents via sqlx.
//!
//! `AppState` holds an `Arc<dyn DocumentStore>`, chosen at startup via config.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod memory;
pub mod postgres;
pub mod transaction;

#[cfg(test)]
pub mod testing;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use transaction::{run_transaction, TxnDecision};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Document encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Unsupported filter on field '{field}': {reason}")]
    UnsupportedFilter { field: String, reason: String },

    #[error("Transaction on {collection}/{id} did not commit after {attempts} attempts")]
    Contention {
        collection: String,
        id: String,
        attempts: u32,
    },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// A stored document together with its concurrency version.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedDocument {
    pub id: String,
    pub version: i64,
    pub data: Value,
}

/// Per-field change applied by `DocumentStore::update`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Set(Value),
    Delete,
}

// The full operator set backs both stores; the mood reader only needs Eq and Gte.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl FilterOp {
    pub fn sql(self) -> &'static str {
        match self {
            FilterOp::Eq => " = ",
            FilterOp::Lt => " < ",
            FilterOp::Lte => " <= ",
            FilterOp::Gt => " > ",
            FilterOp::Gte => " >= ",
        }
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            FilterOp::Eq => ordering == Ordering::Equal,
            FilterOp::Lt => ordering == Ordering::Less,
            FilterOp::Lte => ordering != Ordering::Greater,
            FilterOp::Gt => ordering == Ordering::Greater,
            FilterOp::Gte => ordering != Ordering::Less,
        }
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    /// True when the document's field exists, is comparable with the filter
    /// value, and satisfies the operator.
    pub fn matches(&self, data: &Value) -> bool {
        data.get(&self.field)
            .and_then(|actual| compare_values(actual, &self.value))
            .is_some_and(|ordering| self.op.accepts(ordering))
    }
}

/// Collection query: equality and range filters, one ordering key, optional limit.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    #[allow(dead_code)]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Compares two JSON scalars of the same kind. Mixed kinds are incomparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// The document store trait. Implement this to swap persistence backends
/// without touching the rate limiter, reader, or handlers.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<VersionedDocument>, StoreError>;

    /// Unconditional write; replaces the whole document.
    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError>;

    /// Merges field changes into the document, creating it if absent.
    /// `FieldUpdate::Delete` removes the field.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: BTreeMap<String, FieldUpdate>,
    ) -> Result<(), StoreError>;

    /// Writes `data` only if the stored version equals `expected_version`
    /// (`None` = the document must not exist yet). Returns whether it wrote.
    async fn compare_and_swap(
        &self,
        collection: &str,
        id: &str,
        expected_version: Option<i64>,
        data: Value,
    ) -> Result<bool, StoreError>;

    async fn query(&self, query: &Query) -> Result<Vec<VersionedDocument>, StoreError>;
}
