use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CommandError;
use crate::pipeline::{CommandInfo, Next, PipelineStage};
use crate::publisher::EventPublisher;
use crate::unit_of_work::{OperationPhase, UnitOfWork};

/// Publishes the events of a command once its handler has succeeded.
///
/// The handler saved every aggregate it registered before returning, so by
/// the time events are collected the state they describe is durable. Each
/// event is published on its own, in collection order; a failed publication
/// is logged and counted and the remaining events are still published. The
/// unit of work is cleared whatever happened, and the handler's result is
/// returned unchanged.
pub struct EventDispatchStage {
    publisher: Arc<dyn EventPublisher>,
}

impl EventDispatchStage {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }

    async fn publish_all(&self, info: &CommandInfo, uow: &mut UnitOfWork) {
        uow.transition(OperationPhase::Publishing);

        let events = uow.collect_events().await;
        let mut failed = 0usize;
        for event in events {
            let event_type = event.event_type();
            let aggregate_id = event.aggregate_id();
            let event_id = event.event_id();

            match self.publisher.publish(event).await {
                Ok(()) => {
                    metrics::counter!("events_published_total", "event_type" => event_type)
                        .increment(1);
                    tracing::debug!(event_type, %aggregate_id, %event_id, "event published");
                }
                Err(e) => {
                    failed += 1;
                    metrics::counter!(
                        "event_publication_failures_total",
                        "event_type" => event_type
                    )
                    .increment(1);
                    tracing::error!(
                        command = info.name,
                        operation_id = %info.operation_id,
                        event_type,
                        %aggregate_id,
                        %event_id,
                        error = %e,
                        "event publication failed"
                    );
                }
            }
        }

        if failed > 0 {
            tracing::warn!(
                command = info.name,
                operation_id = %info.operation_id,
                failed,
                "command succeeded but some events were not published"
            );
        }
    }
}

#[async_trait]
impl PipelineStage for EventDispatchStage {
    async fn handle(
        &self,
        info: &CommandInfo,
        uow: &mut UnitOfWork,
        next: Next<'_>,
    ) -> Result<(), CommandError> {
        let result = next.run(info, uow).await;

        if result.is_ok() {
            self.publish_all(info, uow).await;
        }
        uow.clear().await;

        result
    }
}

impl std::fmt::Debug for EventDispatchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatchStage").finish_non_exhaustive()
    }
}
