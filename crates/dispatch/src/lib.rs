//! Command dispatch for the restaurant sample.
//!
//! This crate provides:
//! - `UnitOfWork`: per-command registry of touched aggregates
//! - `Command` / `CommandHandler` and the `CommandBus` routing commands by type
//! - `Pipeline` of `PipelineStage`s wrapped around every handler
//! - `EventDispatchStage`: publishes collected events once the handler succeeded
//! - `EventPublisher` implementations: the subscriber-based `EventBus` and an
//!   in-memory recorder for tests

pub mod bus;
pub mod command;
pub mod error;
pub mod event_bus;
pub mod pipeline;
pub mod publisher;
pub mod stages;
pub mod unit_of_work;

pub use bus::CommandBus;
pub use command::{Command, CommandHandler};
pub use error::{CommandError, PublicationError, SubscriberError};
pub use event_bus::{EventBus, EventSubscriber};
pub use pipeline::{CommandInfo, Next, Pipeline, PipelineStage};
pub use publisher::{EventPublisher, InMemoryPublisher};
pub use stages::{EventDispatchStage, TracingStage};
pub use unit_of_work::{OperationPhase, Tracked, UnitOfWork};
