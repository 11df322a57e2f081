//! Test doubles for `DocumentStore`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{DocumentStore, FieldUpdate, MemoryStore, Query, StoreError, VersionedDocument};

/// Counts every call that reaches the store.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    accesses: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accesses(&self) -> usize {
        self.accesses.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.accesses.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<VersionedDocument>, StoreError> {
        self.touch();
        self.inner.get(collection, id).await
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        self.touch();
        self.inner.set(collection, id, data).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: BTreeMap<String, FieldUpdate>,
    ) -> Result<(), StoreError> {
        self.touch();
        self.inner.update(collection, id, fields).await
    }

    async fn compare_and_swap(
        &self,
        collection: &str,
        id: &str,
        expected_version: Option<i64>,
        data: Value,
    ) -> Result<bool, StoreError> {
        self.touch();
        self.inner
            .compare_and_swap(collection, id, expected_version, data)
            .await
    }

    async fn query(&self, query: &Query) -> Result<Vec<VersionedDocument>, StoreError> {
        self.touch();
        self.inner.query(query).await
    }
}

/// Every operation fails as if the backend were unreachable.
pub struct FailingStore;

fn unavailable() -> StoreError {
    StoreError::Unavailable("connection refused (10.0.0.5:5432)".to_string())
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn get(&self, _: &str, _: &str) -> Result<Option<VersionedDocument>, StoreError> {
        Err(unavailable())
    }

    async fn set(&self, _: &str, _: &str, _: Value) -> Result<(), StoreError> {
        Err(unavailable())
    }

    async fn update(&self, _: &str, _: &str, _: BTreeMap<String, FieldUpdate>) -> Result<(), StoreError> {
        Err(unavailable())
    }

    async fn compare_and_swap(&self, _: &str, _: &str, _: Option<i64>, _: Value) -> Result<bool, StoreError> {
        Err(unavailable())
    }

    async fn query(&self, _: &Query) -> Result<Vec<VersionedDocument>, StoreError> {
        Err(unavailable())
    }
}

/// Simulates a concurrent writer: the next `conflicts` compare-and-swaps are
/// beaten by an unconditional write of `interloper`, and report failure.
pub struct InterferingStore {
    inner: MemoryStore,
    conflicts: AtomicU32,
    interloper: Value,
}

impl InterferingStore {
    pub fn new(conflicts: u32, interloper: Value) -> Self {
        Self {
            inner: MemoryStore::new(),
            conflicts: AtomicU32::new(conflicts),
            interloper,
        }
    }
}

#[async_trait]
impl DocumentStore for InterferingStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<VersionedDocument>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        self.inner.set(collection, id, data).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: BTreeMap<String, FieldUpdate>,
    ) -> Result<(), StoreError> {
        self.inner.update(collection, id, fields).await
    }

    async fn compare_and_swap(
        &self,
        collection: &str,
        id: &str,
        expected_version: Option<i64>,
        data: Value,
    ) -> Result<bool, StoreError> {
        let interfere = self
            .conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if interfere {
            self.inner.set(collection, id, self.interloper.clone()).await?;
        }
        self.inner
            .compare_and_swap(collection, id, expected_version, data)
            .await
    }

    async fn query(&self, query: &Query) -> Result<Vec<VersionedDocument>, StoreError> {
        self.inner.query(query).await
    }
}

/// Answers like `MemoryStore`, but only after `delay` on every call.
pub struct SlowStore {
    inner: MemoryStore,
    delay: Duration,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryStore::new(),
            delay,
        }
    }
}

#[async_trait]
impl DocumentStore for SlowStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<VersionedDocument>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(collection, id).await
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.set(collection, id, data).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: BTreeMap<String, FieldUpdate>,
    ) -> Result<(), StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.update(collection, id, fields).await
    }

    async fn compare_and_swap(
        &self,
        collection: &str,
        id: &str,
        expected_version: Option<i64>,
        data: Value,
    ) -> Result<bool, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner
            .compare_and_swap(collection, id, expected_version, data)
            .await
    }

    async fn query(&self, query: &Query) -> Result<Vec<VersionedDocument>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.query(query).await
    }
}

/// `MemoryStore` whose field-level `update` always fails.
#[derive(Default)]
pub struct UpdateFailingStore {
    pub inner: MemoryStore,
}

#[async_trait]
impl DocumentStore for UpdateFailingStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<VersionedDocument>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        self.inner.set(collection, id, data).await
    }

    async fn update(&self, _: &str, _: &str, _: BTreeMap<String, FieldUpdate>) -> Result<(), StoreError> {
        Err(unavailable())
    }

    async fn compare_and_swap(
        &self,
        collection: &str,
        id: &str,
        expected_version: Option<i64>,
        data: Value,
    ) -> Result<bool, StoreError> {
        self.inner
            .compare_and_swap(collection, id, expected_version, data)
            .await
    }

    async fn query(&self, query: &Query) -> Result<Vec<VersionedDocument>, StoreError> {
        self.inner.query(query).await
    }
}
