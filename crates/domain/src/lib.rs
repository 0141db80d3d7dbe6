//! Domain layer for the restaurant order system.
//!
//! This crate provides the core domain abstractions:
//! - `AggregateState` with a type-keyed event handler registry
//! - `Event` envelopes and the object-safe `DomainEvent` trait
//! - `AggregateRoot` holding one state and its pending events
//! - `Repository` for optimistic, state-based persistence
//! - Order, Kitchen and MenuItem aggregates

pub mod aggregate;
pub mod error;
pub mod event;
pub mod kitchen;
pub mod menu;
pub mod order;
pub mod repository;
pub mod state;

pub use aggregate::{Aggregate, AggregateRoot, EventSource};
pub use common::{AggregateId, EventId, Version};
pub use error::{DomainError, DomainRuleViolation};
pub use event::{DomainEvent, Event, EventPayload};
pub use kitchen::{Kitchen, KitchenState};
pub use menu::{MenuItem, MenuItemState};
pub use order::{LineItem, Money, Order, OrderState, OrderStatus};
pub use repository::Repository;
pub use state::{AggregateState, EventHandlers, StateMetadata};
