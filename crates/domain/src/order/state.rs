//! Order state and its lifecycle.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::state::{AggregateState, EventHandlers, StateMetadata};

use super::events::{
    Cancelled, Confirmed, CookingStarted, Delivered, ItemAdded, ItemRemoved, MarkedReady,
};
use super::{LineItem, Money};

/// Where an order is in its lifecycle.
///
/// ```text
/// Pending ──► Confirmed ──► Cooking ──► Ready ──► Delivered
///    │            │
///    └────────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Items can be added and removed.
    #[default]
    Pending,

    /// Accepted by the restaurant, waiting for a kitchen.
    Confirmed,

    /// A kitchen is preparing the order.
    Cooking,

    /// Waiting for pickup.
    Ready,

    /// Handed over (terminal state).
    Delivered,

    /// Cancelled (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if items can be modified in this status.
    pub fn can_modify_items(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if the order can be cancelled in this status.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Cooking => "cooking",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persisted data of an order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderState {
    #[serde(flatten)]
    metadata: StateMetadata,

    /// Current lifecycle status.
    pub status: OrderStatus,

    /// Line items in the order they were first added.
    pub items: Vec<LineItem>,

    /// Sum of all line totals.
    pub total: Money,

    /// Kitchen preparing the order, once cooking started.
    pub kitchen_id: Option<AggregateId>,

    /// When the order was confirmed.
    pub confirmed_at: Option<DateTime<Utc>>,

    /// Why the order was cancelled.
    pub cancellation_reason: Option<String>,
}

impl OrderState {
    /// Returns the line item for a menu item, if present.
    pub fn item(&self, menu_item_id: AggregateId) -> Option<&LineItem> {
        self.items
            .iter()
            .find(|item| item.menu_item_id == menu_item_id)
    }

    fn on_item_added(&mut self, event: &Event<ItemAdded>) {
        let added = &event.payload().item;
        match self
            .items
            .iter_mut()
            .find(|item| item.menu_item_id == added.menu_item_id)
        {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(added.quantity);
            }
            None => self.items.push(added.clone()),
        }
        self.recompute_total();
    }

    fn on_item_removed(&mut self, event: &Event<ItemRemoved>) {
        let menu_item_id = event.payload().menu_item_id;
        if let Some(position) = self
            .items
            .iter()
            .position(|item| item.menu_item_id == menu_item_id)
        {
            self.items.remove(position);
            self.recompute_total();
        }
    }

    // A merged line keeps its first unit price, so the total is derived from
    // the lines rather than accumulated from events.
    fn recompute_total(&mut self) {
        self.total = self
            .items
            .iter()
            .fold(Money::zero(), |total, item| total.saturating_add(item.total_price()));
    }

    fn on_confirmed(&mut self, event: &Event<Confirmed>) {
        self.status = OrderStatus::Confirmed;
        self.confirmed_at = Some(event.occurred_at());
    }

    fn on_cooking_started(&mut self, event: &Event<CookingStarted>) {
        self.status = OrderStatus::Cooking;
        self.kitchen_id = Some(event.payload().kitchen_id);
    }

    fn on_marked_ready(&mut self, _event: &Event<MarkedReady>) {
        self.status = OrderStatus::Ready;
    }

    fn on_delivered(&mut self, _event: &Event<Delivered>) {
        self.status = OrderStatus::Delivered;
    }

    fn on_cancelled(&mut self, event: &Event<Cancelled>) {
        self.status = OrderStatus::Cancelled;
        self.cancellation_reason = Some(event.payload().reason.clone());
    }
}

static HANDLERS: LazyLock<EventHandlers<OrderState>> = LazyLock::new(|| {
    EventHandlers::new()
        .on(OrderState::on_item_added)
        .on(OrderState::on_item_removed)
        .on(OrderState::on_confirmed)
        .on(OrderState::on_cooking_started)
        .on(OrderState::on_marked_ready)
        .on(OrderState::on_delivered)
        .on(OrderState::on_cancelled)
});

impl AggregateState for OrderState {
    const AGGREGATE_TYPE: &'static str = "Order";

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn only_pending_can_modify_items() {
        assert!(OrderStatus::Pending.can_modify_items());
        assert!(!OrderStatus::Confirmed.can_modify_items());
        assert!(!OrderStatus::Cooking.can_modify_items());
        assert!(!OrderStatus::Cancelled.can_modify_items());
    }

    #[test]
    fn cancellable_statuses() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(OrderStatus::Confirmed.can_cancel());
        assert!(!OrderStatus::Cooking.can_cancel());
        assert!(!OrderStatus::Ready.can_cancel());
        assert!(!OrderStatus::Delivered.can_cancel());
        assert!(!OrderStatus::Cancelled.can_cancel());
    }

    #[test]
    fn terminal_statuses() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Ready.is_terminal());
    }

    #[test]
    fn status_strings_are_lowercase() {
        assert_eq!(OrderStatus::Confirmed.to_string(), "confirmed");
        assert_eq!(
            serde_json::to_string(&OrderStatus::Cooking).unwrap(),
            "\"cooking\""
        );
    }

    #[test]
    fn every_order_event_has_a_handler() {
        let handlers = OrderState::handlers();
        for event_type in [
            "ItemAdded",
            "ItemRemoved",
            "Confirmed",
            "CookingStarted",
            "MarkedReady",
            "Delivered",
            "Cancelled",
        ] {
            assert!(handlers.handles(event_type), "missing {event_type}");
        }
    }
}
