use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, Result, StateRecord, StateStoreError, Version,
    store::{StateStore, validate_record_for_save},
};

type RecordKey = (String, AggregateId);

#[derive(Debug, Clone)]
struct StoredRecord {
    record: StateRecord,
    deleted: bool,
}

/// In-memory state store for tests and local runs.
///
/// Cloning shares the underlying map, so every clone observes the same records.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStateStore {
    records: Arc<RwLock<HashMap<RecordKey, StoredRecord>>>,
}

impl InMemoryStateStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live (non-deleted) records.
    pub async fn record_count(&self) -> usize {
        self.records
            .read()
            .await
            .values()
            .filter(|stored| !stored.deleted)
            .count()
    }

    /// Removes every record, deleted or not.
    pub async fn clear(&self) {
        self.records.write().await.clear();
    }
}

fn conflict(aggregate_id: AggregateId, expected: Version, actual: Version) -> StateStoreError {
    metrics::counter!("state_store_conflicts_total").increment(1);
    StateStoreError::ConcurrencyConflict {
        aggregate_id,
        expected,
        actual,
    }
}

fn check_version(
    current: Option<&StoredRecord>,
    record: &StateRecord,
    expected_version: Version,
) -> Result<()> {
    let actual = current.map_or(Version::initial(), |stored| stored.record.version);
    let deleted = current.is_some_and(|stored| stored.deleted);

    if deleted || actual != expected_version {
        return Err(conflict(record.aggregate_id, expected_version, actual));
    }
    Ok(())
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
    ) -> Result<Option<StateRecord>> {
        let records = self.records.read().await;
        Ok(records
            .get(&(aggregate_type.to_string(), aggregate_id))
            .filter(|stored| !stored.deleted)
            .map(|stored| stored.record.clone()))
    }

    #[tracing::instrument(
        skip(self, record),
        fields(aggregate_type = %record.aggregate_type, aggregate_id = %record.aggregate_id)
    )]
    async fn save(&self, record: StateRecord, expected_version: Version) -> Result<Version> {
        validate_record_for_save(&record, expected_version)?;

        let key = (record.aggregate_type.clone(), record.aggregate_id);
        let mut records = self.records.write().await;
        check_version(records.get(&key), &record, expected_version)?;

        let version = record.version;
        records.insert(
            key,
            StoredRecord {
                record,
                deleted: false,
            },
        );
        tracing::debug!(%version, "state saved");

        Ok(version)
    }

    #[tracing::instrument(skip(self, writes), fields(records = writes.len()))]
    async fn save_all(&self, writes: Vec<(StateRecord, Version)>) -> Result<Vec<Version>> {
        for (record, expected_version) in &writes {
            validate_record_for_save(record, *expected_version)?;
        }

        let mut records = self.records.write().await;
        let mut staged: HashMap<RecordKey, StoredRecord> = HashMap::new();
        let mut versions = Vec::with_capacity(writes.len());

        for (record, expected_version) in writes {
            let key = (record.aggregate_type.clone(), record.aggregate_id);
            let current = staged.get(&key).or_else(|| records.get(&key));
            check_version(current, &record, expected_version)?;

            versions.push(record.version);
            staged.insert(
                key,
                StoredRecord {
                    record,
                    deleted: false,
                },
            );
        }

        records.extend(staged);
        tracing::debug!(?versions, "states saved");
        Ok(versions)
    }

    async fn delete(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
        expected_version: Version,
    ) -> Result<()> {
        let mut records = self.records.write().await;
        let stored = records
            .get_mut(&(aggregate_type.to_string(), aggregate_id))
            .filter(|stored| !stored.deleted);

        match stored {
            Some(stored) if stored.record.version == expected_version => {
                stored.deleted = true;
                Ok(())
            }
            Some(stored) => Err(conflict(
                aggregate_id,
                expected_version,
                stored.record.version,
            )),
            None => Err(conflict(aggregate_id, expected_version, Version::initial())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(aggregate_id: AggregateId, version: i64, value: i32) -> StateRecord {
        let now = Utc::now();
        StateRecord {
            aggregate_id,
            aggregate_type: "Order".to_string(),
            version: Version::new(version),
            created_at: now,
            updated_at: now,
            state: serde_json::json!({ "value": value }),
        }
    }

    #[tokio::test]
    async fn save_new_and_load() {
        let store = InMemoryStateStore::new();
        let id = AggregateId::new();

        let version = store
            .save(record(id, 2, 10), Version::initial())
            .await
            .unwrap();
        assert_eq!(version, Version::new(2));

        let loaded = store.load("Order", id).await.unwrap().unwrap();
        assert_eq!(loaded.version, Version::new(2));
        assert_eq!(loaded.state["value"], 10);
        assert_eq!(store.record_count().await, 1);
    }

    #[tokio::test]
    async fn load_missing_returns_none() {
        let store = InMemoryStateStore::new();
        assert!(store.load("Order", AggregateId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn load_is_scoped_by_aggregate_type() {
        let store = InMemoryStateStore::new();
        let id = AggregateId::new();
        store
            .save(record(id, 1, 1), Version::initial())
            .await
            .unwrap();

        assert!(store.load("Kitchen", id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_with_matching_version_overwrites() {
        let store = InMemoryStateStore::new();
        let id = AggregateId::new();
        store
            .save(record(id, 1, 1), Version::initial())
            .await
            .unwrap();

        store
            .save(record(id, 3, 2), Version::new(1))
            .await
            .unwrap();

        let loaded = store.load("Order", id).await.unwrap().unwrap();
        assert_eq!(loaded.version, Version::new(3));
        assert_eq!(loaded.state["value"], 2);
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let store = InMemoryStateStore::new();
        let id = AggregateId::new();
        store
            .save(record(id, 1, 1), Version::initial())
            .await
            .unwrap();
        store
            .save(record(id, 2, 2), Version::new(1))
            .await
            .unwrap();

        // A second writer that also loaded version 1.
        let result = store.save(record(id, 2, 99), Version::new(1)).await;
        match result {
            Err(StateStoreError::ConcurrencyConflict {
                expected, actual, ..
            }) => {
                assert_eq!(expected, Version::new(1));
                assert_eq!(actual, Version::new(2));
            }
            other => panic!("expected conflict, got {other:?}"),
        }

        let loaded = store.load("Order", id).await.unwrap().unwrap();
        assert_eq!(loaded.state["value"], 2);
    }

    #[tokio::test]
    async fn creating_an_existing_aggregate_is_a_conflict() {
        let store = InMemoryStateStore::new();
        let id = AggregateId::new();
        store
            .save(record(id, 1, 1), Version::initial())
            .await
            .unwrap();

        let result = store.save(record(id, 1, 2), Version::initial()).await;
        assert!(result.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn delete_hides_record_and_blocks_later_saves() {
        let store = InMemoryStateStore::new();
        let id = AggregateId::new();
        store
            .save(record(id, 1, 1), Version::initial())
            .await
            .unwrap();

        store.delete("Order", id, Version::new(1)).await.unwrap();
        assert!(store.load("Order", id).await.unwrap().is_none());
        assert_eq!(store.record_count().await, 0);

        let result = store.save(record(id, 2, 2), Version::new(1)).await;
        assert!(result.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn delete_with_stale_version_is_a_conflict() {
        let store = InMemoryStateStore::new();
        let id = AggregateId::new();
        store
            .save(record(id, 2, 1), Version::initial())
            .await
            .unwrap();

        let result = store.delete("Order", id, Version::new(1)).await;
        assert!(result.unwrap_err().is_conflict());
        assert!(store.load("Order", id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn save_all_writes_every_record() {
        let store = InMemoryStateStore::new();
        let (a, b) = (AggregateId::new(), AggregateId::new());
        store
            .save(record(a, 1, 1), Version::initial())
            .await
            .unwrap();

        let versions = store
            .save_all(vec![
                (record(a, 2, 2), Version::new(1)),
                (record(b, 1, 1), Version::initial()),
            ])
            .await
            .unwrap();

        assert_eq!(versions, [Version::new(2), Version::new(1)]);
        assert_eq!(store.load("Order", a).await.unwrap().unwrap().state["value"], 2);
        assert_eq!(store.record_count().await, 2);
    }

    #[tokio::test]
    async fn save_all_writes_nothing_when_a_later_record_conflicts() {
        let store = InMemoryStateStore::new();
        let (a, b) = (AggregateId::new(), AggregateId::new());
        store
            .save(record(a, 1, 1), Version::initial())
            .await
            .unwrap();
        store
            .save(record(b, 2, 1), Version::initial())
            .await
            .unwrap();

        let result = store
            .save_all(vec![
                (record(a, 2, 2), Version::new(1)),
                (record(b, 2, 2), Version::new(1)),
            ])
            .await;

        assert!(result.unwrap_err().is_conflict());
        let a_stored = store.load("Order", a).await.unwrap().unwrap();
        assert_eq!(a_stored.version, Version::new(1));
        assert_eq!(a_stored.state["value"], 1);
    }

    #[tokio::test]
    async fn save_all_checks_repeated_keys_in_order() {
        let store = InMemoryStateStore::new();
        let id = AggregateId::new();

        let versions = store
            .save_all(vec![
                (record(id, 1, 1), Version::initial()),
                (record(id, 2, 2), Version::new(1)),
            ])
            .await
            .unwrap();
        assert_eq!(versions, [Version::first(), Version::new(2)]);

        let result = store
            .save_all(vec![
                (record(id, 3, 3), Version::new(2)),
                (record(id, 3, 4), Version::new(2)),
            ])
            .await;
        assert!(result.unwrap_err().is_conflict());
        assert_eq!(
            store.load("Order", id).await.unwrap().unwrap().version,
            Version::new(2)
        );
    }

    #[tokio::test]
    async fn clones_share_records() {
        let store = InMemoryStateStore::new();
        let other = store.clone();
        let id = AggregateId::new();
        store
            .save(record(id, 1, 1), Version::initial())
            .await
            .unwrap();

        assert!(other.load("Order", id).await.unwrap().is_some());
        other.clear().await;
        assert_eq!(store.record_count().await, 0);
    }

    #[tokio::test]
    async fn arc_dyn_store_delegates() {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
        let id = AggregateId::new();
        store
            .save(record(id, 1, 1), Version::initial())
            .await
            .unwrap();
        assert!(store.load("Order", id).await.unwrap().is_some());
    }
}
