//! Events raised by the kitchen aggregate.

use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::event::EventPayload;

/// A kitchen was registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitchenRegistered {
    pub name: String,
    pub capacity: u32,
}

impl EventPayload for KitchenRegistered {
    const EVENT_TYPE: &'static str = "KitchenRegistered";
}

/// The kitchen started accepting tickets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitchenOpened {}

impl EventPayload for KitchenOpened {
    const EVENT_TYPE: &'static str = "KitchenOpened";
}

/// The kitchen stopped accepting tickets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitchenClosed {}

impl EventPayload for KitchenClosed {
    const EVENT_TYPE: &'static str = "KitchenClosed";
}

/// An order ticket was put on the line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketAccepted {
    pub order_id: AggregateId,
}

impl EventPayload for TicketAccepted {
    const EVENT_TYPE: &'static str = "TicketAccepted";
}

/// An order ticket left the line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketCompleted {
    pub order_id: AggregateId,
}

impl EventPayload for TicketCompleted {
    const EVENT_TYPE: &'static str = "TicketCompleted";
}
