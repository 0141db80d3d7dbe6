//! Application error types.

use dispatch::CommandError;
use state_store::StateStoreError;
use thiserror::Error;

/// Errors that stop the application.
#[derive(Debug, Error)]
pub enum AppError {
    /// The state store could not be reached or migrated.
    #[error("State store error: {0}")]
    Store(#[from] StateStoreError),

    /// A scripted command failed.
    #[error("Command failed: {0}")]
    Command(#[from] CommandError),

    /// The log subscriber could not be installed.
    #[error("Failed to initialize tracing: {0}")]
    Tracing(String),

    /// The Prometheus recorder could not be installed.
    #[error("Failed to install metrics recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}
