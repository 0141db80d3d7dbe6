//! Persistence for aggregate state snapshots.
//!
//! One record is kept per aggregate instance. Saving is a compare-and-swap on
//! the record's version: a writer states the version it originally loaded and
//! the store refuses the write when someone else got there first.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use common::{AggregateId, Version};
pub use error::{Result, StateStoreError};
pub use memory::InMemoryStateStore;
pub use postgres::PostgresStateStore;
pub use record::StateRecord;
pub use store::StateStore;
