use std::time::Instant;

use async_trait::async_trait;
use tracing::Instrument;

use crate::error::CommandError;
use crate::pipeline::{CommandInfo, Next, PipelineStage};
use crate::unit_of_work::UnitOfWork;

/// Opens a span per command and records its outcome and duration.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStage;

impl TracingStage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PipelineStage for TracingStage {
    async fn handle(
        &self,
        info: &CommandInfo,
        uow: &mut UnitOfWork,
        next: Next<'_>,
    ) -> Result<(), CommandError> {
        let span = tracing::info_span!(
            "command",
            command = info.name,
            operation_id = %info.operation_id
        );
        let start = Instant::now();

        let result = next.run(info, uow).instrument(span.clone()).await;

        let elapsed = start.elapsed();
        let outcome = if result.is_ok() { "success" } else { "failure" };
        metrics::counter!("commands_total", "command" => info.name, "outcome" => outcome)
            .increment(1);
        metrics::histogram!("command_duration_seconds", "command" => info.name)
            .record(elapsed.as_secs_f64());

        span.in_scope(|| match &result {
            Ok(()) => tracing::info!(elapsed_secs = elapsed.as_secs_f64(), "command handled"),
            Err(e) if e.is_rule_violation() => {
                tracing::info!(error = %e, "command rejected")
            }
            Err(e) => tracing::warn!(error = %e, "command failed"),
        });

        result
    }
}
