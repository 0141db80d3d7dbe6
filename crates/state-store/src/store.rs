use std::sync::Arc;

use async_trait::async_trait;

use crate::{AggregateId, Result, StateRecord, StateStoreError, Version};

/// Storage for aggregate state records.
///
/// Implementations are shared across concurrent operations and must be
/// thread-safe. The version column is the only coordination between writers.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the current record for an aggregate.
    ///
    /// Returns None if the aggregate was never saved or has been deleted.
    async fn load(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
    ) -> Result<Option<StateRecord>>;

    /// Writes a record if the stored version still equals `expected_version`.
    ///
    /// `Version::initial()` means the aggregate must not exist yet. Fails with
    /// `ConcurrencyConflict` otherwise. Returns the version now stored.
    async fn save(&self, record: StateRecord, expected_version: Version) -> Result<Version>;

    /// Writes several records as one unit, each under its own version check.
    ///
    /// Either every record is written or none is: the first conflict aborts
    /// the whole batch. Returns the stored versions in input order.
    async fn save_all(&self, writes: Vec<(StateRecord, Version)>) -> Result<Vec<Version>>;

    /// Logically deletes an aggregate, guarded by the same version check as `save`.
    async fn delete(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
        expected_version: Version,
    ) -> Result<()>;
}

#[async_trait]
impl<T: StateStore + ?Sized> StateStore for Arc<T> {
    async fn load(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
    ) -> Result<Option<StateRecord>> {
        (**self).load(aggregate_type, aggregate_id).await
    }

    async fn save(&self, record: StateRecord, expected_version: Version) -> Result<Version> {
        (**self).save(record, expected_version).await
    }

    async fn save_all(&self, writes: Vec<(StateRecord, Version)>) -> Result<Vec<Version>> {
        (**self).save_all(writes).await
    }

    async fn delete(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
        expected_version: Version,
    ) -> Result<()> {
        (**self).delete(aggregate_type, aggregate_id, expected_version).await
    }
}

/// Rejects records that do not move the version past `expected_version`.
pub fn validate_record_for_save(record: &StateRecord, expected_version: Version) -> Result<()> {
    if record.version <= expected_version {
        return Err(StateStoreError::InvalidVersion {
            aggregate_id: record.aggregate_id,
            expected: expected_version,
            version: record.version,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record_at(version: i64) -> StateRecord {
        let now = Utc::now();
        StateRecord {
            aggregate_id: AggregateId::new(),
            aggregate_type: "Order".to_string(),
            version: Version::new(version),
            created_at: now,
            updated_at: now,
            state: serde_json::json!({}),
        }
    }

    #[test]
    fn validate_accepts_forward_versions() {
        assert!(validate_record_for_save(&record_at(1), Version::initial()).is_ok());
        assert!(validate_record_for_save(&record_at(5), Version::new(2)).is_ok());
    }

    #[test]
    fn validate_rejects_stale_or_equal_versions() {
        let result = validate_record_for_save(&record_at(2), Version::new(2));
        assert!(matches!(result, Err(StateStoreError::InvalidVersion { .. })));

        let result = validate_record_for_save(&record_at(0), Version::initial());
        assert!(matches!(result, Err(StateStoreError::InvalidVersion { .. })));
    }
}
