//! Logging and metrics setup for the binary.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{Config, LogFormat};
use crate::error::AppError;

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when both are set.
pub fn init_tracing(config: &Config) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    };

    result.map_err(|e| AppError::Tracing(e.to_string()))
}

/// Installs the Prometheus recorder and returns a handle for rendering.
pub fn install_metrics() -> Result<PrometheusHandle, AppError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    Ok(handle)
}

fn describe_metrics() {
    metrics::describe_counter!("commands_total", "Commands handled, by command and outcome");
    metrics::describe_histogram!(
        "command_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent handling a command, publication included"
    );
    metrics::describe_counter!("events_published_total", "Events accepted by the publisher");
    metrics::describe_counter!(
        "event_publication_failures_total",
        "Events the publisher rejected after their state was saved"
    );
    metrics::describe_counter!(
        "state_store_conflicts_total",
        "Saves refused because the stored version moved on"
    );
}
