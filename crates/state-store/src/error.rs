use thiserror::Error;

use crate::{AggregateId, Version};

/// Failures of a [`StateStore`](crate::StateStore) read or write.
#[derive(Debug, Error)]
pub enum StateStoreError {
    /// The stored version did not match the version the writer loaded.
    #[error(
        "Stale write to aggregate {aggregate_id}: loaded at version {expected}, store holds {actual}"
    )]
    ConcurrencyConflict {
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    /// The record being saved does not move the version forward.
    #[error("Invalid version for aggregate {aggregate_id}: {version} does not follow {expected}")]
    InvalidVersion {
        aggregate_id: AggregateId,
        expected: Version,
        version: Version,
    },

    #[error("State store query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("State store schema migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The state could not be encoded to or decoded from its JSON column.
    #[error("State payload is not valid for its type: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StateStoreError {
    /// Whether a concurrent writer saved first. Reloading and retrying may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StateStoreError::ConcurrencyConflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, StateStoreError>;
