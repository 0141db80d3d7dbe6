//! Stages wrapped around every command handler.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::command::{Command, CommandHandler};
use crate::error::CommandError;
use crate::unit_of_work::{OperationPhase, UnitOfWork};

/// What a stage knows about the command it wraps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    /// The command's [`Command::NAME`].
    pub name: &'static str,

    /// Correlates every log line of one dispatch.
    pub operation_id: Uuid,
}

impl CommandInfo {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            operation_id: Uuid::new_v4(),
        }
    }
}

/// A cross-cutting behavior around command handling.
///
/// A stage calls [`Next::run`] at most once to continue towards the
/// handler and returns that outcome, possibly after acting on it.
#[async_trait]
pub trait PipelineStage: Send + Sync {
    async fn handle(
        &self,
        info: &CommandInfo,
        uow: &mut UnitOfWork,
        next: Next<'_>,
    ) -> Result<(), CommandError>;
}

#[async_trait]
trait ErasedHandler: Send {
    async fn call(&mut self, uow: &mut UnitOfWork) -> Result<(), CommandError>;
}

/// The remaining stages and the handler at the end of them.
pub struct Next<'a> {
    stages: &'a [Arc<dyn PipelineStage>],
    handler: &'a mut dyn ErasedHandler,
}

impl Next<'_> {
    /// Runs the remaining stages, then the handler.
    pub async fn run(self, info: &CommandInfo, uow: &mut UnitOfWork) -> Result<(), CommandError> {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                let next = Next {
                    stages: rest,
                    handler: self.handler,
                };
                stage.handle(info, uow, next).await
            }
            None => self.handler.call(uow).await,
        }
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining_stages", &self.stages.len())
            .finish()
    }
}

/// Binds one command to its handler and keeps the typed output aside
/// while the stages only see success or failure.
struct Invocation<'h, C: Command> {
    handler: &'h dyn CommandHandler<C>,
    command: Option<C>,
    output: Option<C::Output>,
}

#[async_trait]
impl<'h, C: Command> ErasedHandler for Invocation<'h, C> {
    async fn call(&mut self, uow: &mut UnitOfWork) -> Result<(), CommandError> {
        let command = self
            .command
            .take()
            .ok_or(CommandError::HandlerReentered { command: C::NAME })?;

        uow.transition(OperationPhase::HandlerRunning);
        match self.handler.handle(command, uow).await {
            Ok(output) => {
                self.output = Some(output);
                uow.transition(OperationPhase::Succeeded);
                Ok(())
            }
            Err(e) => {
                uow.transition(OperationPhase::Failed);
                Err(e)
            }
        }
    }
}

/// Ordered stages, outermost first.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn PipelineStage>>,
}

impl Pipeline {
    /// Creates a pipeline without stages: commands go straight to their handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage inside the ones already added.
    pub fn with_stage(mut self, stage: impl PipelineStage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs `command` through every stage and then `handler`.
    pub async fn execute<C: Command>(
        &self,
        command: C,
        handler: &dyn CommandHandler<C>,
        uow: &mut UnitOfWork,
    ) -> Result<C::Output, CommandError> {
        let info = CommandInfo::new(C::NAME);
        let mut invocation = Invocation {
            handler,
            command: Some(command),
            output: None,
        };

        let next = Next {
            stages: &self.stages,
            handler: &mut invocation,
        };
        next.run(&info, uow).await?;

        invocation
            .output
            .ok_or(CommandError::NotExecuted { command: C::NAME })
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages.len())
            .finish()
    }
}
