//! Commands and their handlers.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CommandError;
use crate::unit_of_work::UnitOfWork;

/// An inbound request to change the system.
pub trait Command: fmt::Debug + Send + 'static {
    /// Name used in logs and metrics.
    const NAME: &'static str;

    /// What a successful handler returns to the caller.
    type Output: Send + 'static;
}

/// Handles one command type.
///
/// A handler loads or creates aggregates, calls their behavior methods,
/// saves them, and only then registers them with the unit of work. An
/// aggregate registered before a failed save would have its events
/// published for a change that never became durable.
#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    async fn handle(&self, command: C, uow: &mut UnitOfWork) -> Result<C::Output, CommandError>;
}

#[async_trait]
impl<C, H> CommandHandler<C> for Arc<H>
where
    C: Command,
    H: CommandHandler<C> + ?Sized,
{
    async fn handle(&self, command: C, uow: &mut UnitOfWork) -> Result<C::Output, CommandError> {
        (**self).handle(command, uow).await
    }
}
