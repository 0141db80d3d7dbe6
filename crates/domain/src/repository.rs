//! Typed access to aggregate state stored in a [`StateStore`].

use std::marker::PhantomData;

use common::{AggregateId, Version};
use state_store::{StateRecord, StateStore, StateStoreError};

use crate::aggregate::sealed::Internal;
use crate::aggregate::{Aggregate, AggregateRoot};
use crate::error::DomainError;
use crate::state::AggregateState;

/// Loads and saves aggregates of type `A` through a state store.
///
/// Saving passes the root's persisted version as the expected version, so a
/// concurrent writer that saved in between makes this save fail with
/// [`DomainError::PersistenceConflict`].
pub struct Repository<A, St> {
    store: St,
    _phantom: PhantomData<fn() -> A>,
}

impl<A, St> Repository<A, St>
where
    A: Aggregate,
    St: StateStore,
{
    /// Creates a repository over the given store.
    pub fn new(store: St) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &St {
        &self.store
    }

    fn aggregate_type() -> &'static str {
        <A::State as AggregateState>::AGGREGATE_TYPE
    }

    /// Loads an aggregate, returning None if it was never saved or was deleted.
    #[tracing::instrument(skip(self), fields(aggregate_type = Self::aggregate_type()))]
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<Option<A>, DomainError> {
        let record = self
            .store
            .load(Self::aggregate_type(), aggregate_id)
            .await
            .map_err(|e| DomainError::from_store(Self::aggregate_type(), e))?;

        match record {
            Some(record) => {
                let state: A::State = record.to_state()?;
                Ok(Some(A::from_root(AggregateRoot::from_state(state))))
            }
            None => Ok(None),
        }
    }

    /// Loads an aggregate that must exist.
    pub async fn get(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        self.load(aggregate_id)
            .await?
            .ok_or(DomainError::AggregateNotFound {
                aggregate_type: Self::aggregate_type(),
                aggregate_id,
            })
    }

    /// Saves the aggregate's current state.
    ///
    /// Pending events are left in place for the unit of work to collect.
    /// Saving an aggregate with no unsaved changes is a no-op.
    #[tracing::instrument(skip(self, aggregate), fields(aggregate_type = Self::aggregate_type()))]
    pub async fn save(&self, aggregate: &mut A) -> Result<Version, DomainError> {
        let Some((record, expected)) = unsaved_record(aggregate)? else {
            return Ok(aggregate.version());
        };
        let aggregate_id = record.aggregate_id;

        let saved = self
            .store
            .save(record, expected)
            .await
            .map_err(|e| DomainError::from_store(Self::aggregate_type(), e))?;

        aggregate.root_mut(Internal(())).mark_persisted(saved);
        tracing::debug!(%aggregate_id, version = %saved, "aggregate saved");

        Ok(saved)
    }

    /// Saves this repository's aggregate and `other` in one atomic store write.
    ///
    /// `other` goes to this repository's store. If either version check fails
    /// neither state is written and neither aggregate is marked persisted.
    #[tracing::instrument(
        skip(self, aggregate, other),
        fields(
            aggregate_type = Self::aggregate_type(),
            other_type = <B::State as AggregateState>::AGGREGATE_TYPE
        )
    )]
    pub async fn save_with<B: Aggregate>(
        &self,
        aggregate: &mut A,
        other: &mut B,
    ) -> Result<(), DomainError> {
        let first = unsaved_record(aggregate)?;
        let second = unsaved_record(other)?;
        let first_version = first.as_ref().map(|(record, _)| record.version);
        let second_version = second.as_ref().map(|(record, _)| record.version);
        let other_id = other.id();

        let writes: Vec<_> = first.into_iter().chain(second).collect();
        if writes.is_empty() {
            return Ok(());
        }

        self.store.save_all(writes).await.map_err(|e| {
            let aggregate_type = match &e {
                StateStoreError::ConcurrencyConflict { aggregate_id, .. }
                    if other_id == Some(*aggregate_id) =>
                {
                    <B::State as AggregateState>::AGGREGATE_TYPE
                }
                _ => Self::aggregate_type(),
            };
            DomainError::from_store(aggregate_type, e)
        })?;

        if let Some(version) = first_version {
            aggregate.root_mut(Internal(())).mark_persisted(version);
        }
        if let Some(version) = second_version {
            other.root_mut(Internal(())).mark_persisted(version);
        }
        tracing::debug!("aggregates saved together");

        Ok(())
    }

    /// Logically deletes a saved aggregate.
    pub async fn delete(&self, aggregate: &A) -> Result<(), DomainError> {
        let root = aggregate.root();
        let aggregate_id = root.id().ok_or(DomainError::Uninitialized {
            aggregate_type: Self::aggregate_type(),
        })?;

        self.store
            .delete(
                Self::aggregate_type(),
                aggregate_id,
                root.persisted_version(),
            )
            .await
            .map_err(|e| DomainError::from_store(Self::aggregate_type(), e))
    }
}

/// Builds the record to write and the version to check it against, or None
/// when nothing was applied since the last save.
fn unsaved_record<A: Aggregate>(
    aggregate: &A,
) -> Result<Option<(StateRecord, Version)>, DomainError> {
    let aggregate_type = <A::State as AggregateState>::AGGREGATE_TYPE;
    let root = aggregate.root();
    let version = root.version();
    let expected = root.persisted_version();

    if version == expected {
        return Ok(None);
    }

    let metadata = root.state().metadata();
    let (Some(aggregate_id), Some(created_at), Some(updated_at)) =
        (metadata.id, metadata.created_at, metadata.updated_at)
    else {
        return Err(DomainError::Uninitialized { aggregate_type });
    };

    let record = StateRecord::from_state(
        aggregate_id,
        aggregate_type,
        version,
        created_at,
        updated_at,
        root.state(),
    )?;
    Ok(Some((record, expected)))
}

impl<A, St: Clone> Clone for Repository<A, St> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _phantom: PhantomData,
        }
    }
}
