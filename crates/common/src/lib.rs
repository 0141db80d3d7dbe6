//! Identifier and version types shared by every crate in the workspace.

mod types;
mod version;

pub use types::{AggregateId, EventId};
pub use version::Version;
