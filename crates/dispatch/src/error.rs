//! Dispatch error types.

use common::AggregateId;
use domain::{DomainError, DomainRuleViolation};
use thiserror::Error;

/// Errors returned to the caller of a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Rule violation, persistence conflict or other domain failure.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The command was rejected before reaching any aggregate.
    #[error("Invalid command {command}: {reason}")]
    Invalid {
        command: &'static str,
        reason: String,
    },

    /// No handler is registered for the command type.
    #[error("No handler registered for command {command}")]
    NoHandler { command: &'static str },

    /// A pipeline stage returned without running the handler.
    #[error("Command {command} finished without running its handler")]
    NotExecuted { command: &'static str },

    /// A pipeline stage tried to run the handler a second time.
    #[error("Handler for command {command} was invoked more than once")]
    HandlerReentered { command: &'static str },
}

impl CommandError {
    /// Creates an `Invalid` error.
    pub fn invalid(command: &'static str, reason: impl Into<String>) -> Self {
        CommandError::Invalid {
            command,
            reason: reason.into(),
        }
    }

    /// Returns true if an aggregate refused the change.
    pub fn is_rule_violation(&self) -> bool {
        matches!(self, CommandError::Domain(e) if e.is_rule_violation())
    }

    /// Returns true if a concurrent writer won the save.
    pub fn is_conflict(&self) -> bool {
        matches!(self, CommandError::Domain(e) if e.is_conflict())
    }
}

impl From<DomainRuleViolation> for CommandError {
    fn from(violation: DomainRuleViolation) -> Self {
        CommandError::Domain(DomainError::Rule(violation))
    }
}

/// An already persisted event could not be delivered.
#[derive(Debug, Clone, Error)]
#[error("Failed to publish {event_type} for aggregate {aggregate_id}: {reason}")]
pub struct PublicationError {
    pub event_type: &'static str,
    pub aggregate_id: AggregateId,
    pub reason: String,
}

/// A single subscriber failed to handle an event.
#[derive(Debug, Clone, Error)]
#[error("Subscriber {subscriber} failed: {reason}")]
pub struct SubscriberError {
    pub subscriber: &'static str,
    pub reason: String,
}

impl SubscriberError {
    pub fn new(subscriber: &'static str, reason: impl Into<String>) -> Self {
        Self {
            subscriber,
            reason: reason.into(),
        }
    }
}
