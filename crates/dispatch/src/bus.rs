//! Routes commands to their handlers.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::command::{Command, CommandHandler};
use crate::error::CommandError;
use crate::pipeline::Pipeline;
use crate::unit_of_work::UnitOfWork;

/// Type-keyed command router.
///
/// Every dispatch gets its own [`UnitOfWork`] and runs through the same
/// [`Pipeline`]. Registering a second handler for a command type replaces
/// the first.
pub struct CommandBus {
    pipeline: Pipeline,
    handlers: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    names: HashMap<TypeId, &'static str>,
}

impl CommandBus {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            handlers: HashMap::new(),
            names: HashMap::new(),
        }
    }

    /// Registers the handler for command type `C`.
    pub fn register<C, H>(&mut self, handler: H) -> &mut Self
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        let handler: Arc<dyn CommandHandler<C>> = Arc::new(handler);
        let key = TypeId::of::<C>();
        if self.handlers.insert(key, Box::new(handler)).is_some() {
            tracing::warn!(command = C::NAME, "command handler replaced");
        }
        self.names.insert(key, C::NAME);
        self
    }

    /// Returns true if a handler is registered for `C`.
    pub fn handles<C: Command>(&self) -> bool {
        self.handlers.contains_key(&TypeId::of::<C>())
    }

    /// Returns the names of all routed commands, sorted.
    pub fn commands(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.names.values().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    fn handler<C: Command>(&self) -> Option<Arc<dyn CommandHandler<C>>> {
        self.handlers
            .get(&TypeId::of::<C>())
            .and_then(|handler| handler.downcast_ref::<Arc<dyn CommandHandler<C>>>())
            .cloned()
    }

    /// Handles one command in a fresh unit of work.
    pub async fn dispatch<C: Command>(&self, command: C) -> Result<C::Output, CommandError> {
        let handler = self
            .handler::<C>()
            .ok_or(CommandError::NoHandler { command: C::NAME })?;

        let mut uow = UnitOfWork::new();
        self.pipeline
            .execute(command, handler.as_ref(), &mut uow)
            .await
    }
}

impl fmt::Debug for CommandBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBus")
            .field("pipeline", &self.pipeline)
            .field("commands", &self.commands())
            .finish()
    }
}
