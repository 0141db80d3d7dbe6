//! Domain error types.

use common::{AggregateId, Version};
use state_store::StateStoreError;
use thiserror::Error;

/// A business invariant was not met by a behavior method.
///
/// Raised before any event is built, so the aggregate is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{aggregate_type} rule violated: {reason}")]
pub struct DomainRuleViolation {
    /// The aggregate type whose rule was violated.
    pub aggregate_type: &'static str,

    /// Human-readable reason.
    pub reason: String,
}

impl DomainRuleViolation {
    /// Creates a new violation for the given aggregate type.
    pub fn new(aggregate_type: &'static str, reason: impl Into<String>) -> Self {
        Self {
            aggregate_type,
            reason: reason.into(),
        }
    }
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A behavior method refused the requested change.
    #[error(transparent)]
    Rule(#[from] DomainRuleViolation),

    /// The stored state moved on since it was loaded.
    #[error(
        "Persistence conflict on {aggregate_type} {aggregate_id}: expected version {expected}, found {actual}"
    )]
    PersistenceConflict {
        aggregate_type: &'static str,
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    /// Aggregate not found.
    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    AggregateNotFound {
        aggregate_type: &'static str,
        aggregate_id: AggregateId,
    },

    /// The aggregate has no identifier because no event was ever applied.
    #[error("Cannot persist {aggregate_type} before any event has been applied")]
    Uninitialized { aggregate_type: &'static str },

    /// An error occurred in the state store.
    #[error("State store error: {0}")]
    Store(StateStoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Converts a store error, lifting version conflicts into `PersistenceConflict`.
    pub fn from_store(aggregate_type: &'static str, error: StateStoreError) -> Self {
        match error {
            StateStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual,
            } => DomainError::PersistenceConflict {
                aggregate_type,
                aggregate_id,
                expected,
                actual,
            },
            StateStoreError::Serialization(e) => DomainError::Serialization(e),
            other => DomainError::Store(other),
        }
    }

    /// Returns true if this error is a business rule violation.
    pub fn is_rule_violation(&self) -> bool {
        matches!(self, DomainError::Rule(_))
    }

    /// Returns true if this error is an optimistic concurrency conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DomainError::PersistenceConflict { .. })
    }
}
