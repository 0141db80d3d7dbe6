use std::sync::LazyLock;

use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::state::{AggregateState, EventHandlers, StateMetadata};

use super::events::{
    KitchenClosed, KitchenOpened, KitchenRegistered, TicketAccepted, TicketCompleted,
};

/// Persisted data of a kitchen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KitchenState {
    #[serde(flatten)]
    metadata: StateMetadata,

    pub name: String,

    /// Maximum number of tickets on the line at once.
    pub capacity: u32,

    pub is_open: bool,

    /// Orders currently being prepared, in acceptance order.
    pub active_tickets: Vec<AggregateId>,

    pub completed_tickets: u64,
}

impl KitchenState {
    /// Returns true if the order has an active ticket here.
    pub fn has_ticket(&self, order_id: AggregateId) -> bool {
        self.active_tickets.contains(&order_id)
    }

    /// Returns true if another ticket fits on the line.
    pub fn has_capacity(&self) -> bool {
        self.active_tickets.len() < self.capacity as usize
    }

    fn on_registered(&mut self, event: &Event<KitchenRegistered>) {
        self.name = event.payload().name.clone();
        self.capacity = event.payload().capacity;
    }

    fn on_opened(&mut self, _event: &Event<KitchenOpened>) {
        self.is_open = true;
    }

    fn on_closed(&mut self, _event: &Event<KitchenClosed>) {
        self.is_open = false;
    }

    fn on_ticket_accepted(&mut self, event: &Event<TicketAccepted>) {
        self.active_tickets.push(event.payload().order_id);
    }

    fn on_ticket_completed(&mut self, event: &Event<TicketCompleted>) {
        let order_id = event.payload().order_id;
        self.active_tickets.retain(|id| *id != order_id);
        self.completed_tickets += 1;
    }
}

static HANDLERS: LazyLock<EventHandlers<KitchenState>> = LazyLock::new(|| {
    EventHandlers::new()
        .on(KitchenState::on_registered)
        .on(KitchenState::on_opened)
        .on(KitchenState::on_closed)
        .on(KitchenState::on_ticket_accepted)
        .on(KitchenState::on_ticket_completed)
});

impl AggregateState for KitchenState {
    const AGGREGATE_TYPE: &'static str = "Kitchen";

    fn metadata(&self) -> &StateMetadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut StateMetadata {
        &mut self.metadata
    }

    fn handlers() -> &'static EventHandlers<Self> {
        &HANDLERS
    }
}
