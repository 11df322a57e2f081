use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{compare_values, Direction, DocumentStore, FieldUpdate, Query, StoreError, VersionedDocument};

type Key = (String, String);

/// Process-local document store. Each call takes the lock once and releases it
/// before returning, so a read followed by a `compare_and_swap` can race with
/// other tasks exactly like a remote store would.
#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<Key, VersionedDocument>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Key, VersionedDocument>>, StoreError> {
        self.documents
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

fn key(collection: &str, id: &str) -> Key {
    (collection.to_string(), id.to_string())
}

fn next_version(current: Option<&VersionedDocument>) -> i64 {
    current.map_or(1, |doc| doc.version + 1)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<VersionedDocument>, StoreError> {
        Ok(self.lock()?.get(&key(collection, id)).cloned())
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        let mut documents = self.lock()?;
        let key = key(collection, id);
        let version = next_version(documents.get(&key));
        documents.insert(
            key,
            VersionedDocument {
                id: id.to_string(),
                version,
                data,
            },
        );
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: BTreeMap<String, FieldUpdate>,
    ) -> Result<(), StoreError> {
        let mut documents = self.lock()?;
        let key = key(collection, id);
        let existing = documents.get(&key);
        let version = next_version(existing);

        let mut object = match existing.map(|doc| &doc.data) {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        for (field, change) in fields {
            match change {
                FieldUpdate::Set(value) => {
                    object.insert(field, value);
                }
                FieldUpdate::Delete => {
                    object.remove(&field);
                }
            }
        }

        documents.insert(
            key,
            VersionedDocument {
                id: id.to_string(),
                version,
                data: Value::Object(object),
            },
        );
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        collection: &str,
        id: &str,
        expected_version: Option<i64>,
        data: Value,
    ) -> Result<bool, StoreError> {
        let mut documents = self.lock()?;
        let key = key(collection, id);
        let current = documents.get(&key).map(|doc| doc.version);
        if current != expected_version {
            return Ok(false);
        }
        documents.insert(
            key,
            VersionedDocument {
                id: id.to_string(),
                version: current.unwrap_or(0) + 1,
                data,
            },
        );
        Ok(true)
    }

    async fn query(&self, query: &Query) -> Result<Vec<VersionedDocument>, StoreError> {
        let documents = self.lock()?;
        let mut results: Vec<VersionedDocument> = documents
            .iter()
            .filter(|((collection, _), _)| *collection == query.collection)
            .map(|(_, doc)| doc)
            .filter(|doc| query.filters.iter().all(|f| f.matches(&doc.data)))
            .cloned()
            .collect();
        drop(documents);

        // Equal keys fall back to the document id so results never depend on
        // hash order.
        match &query.order_by {
            Some((field, direction)) => results.sort_by(|a, b| {
                let ordering = match (a.data.get(field), b.data.get(field)) {
                    (Some(x), Some(y)) => compare_values(x, y).unwrap_or(std::cmp::Ordering::Equal),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                }
                .then_with(|| a.id.cmp(&b.id));
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            }),
            None => results.sort_by(|a, b| a.id.cmp(&b.id)),
        }
        if let Some(limit) = query.limit {
            results.truncate(limit);
        }
        Ok(results)
    }
}
