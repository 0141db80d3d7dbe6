//! Events raised by the order aggregate.

use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::event::EventPayload;

use super::{LineItem, Money};

/// A menu item was added to the order.
///
/// Adding a menu item that is already on the order raises this event again;
/// the quantities are merged when it is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAdded {
    pub item: LineItem,
}

impl EventPayload for ItemAdded {
    const EVENT_TYPE: &'static str = "ItemAdded";
}

/// A menu item was removed from the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRemoved {
    pub menu_item_id: AggregateId,
}

impl EventPayload for ItemRemoved {
    const EVENT_TYPE: &'static str = "ItemRemoved";
}

/// The order was confirmed and can go to a kitchen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmed {
    pub total: Money,
    pub item_count: usize,
}

impl EventPayload for Confirmed {
    const EVENT_TYPE: &'static str = "Confirmed";
}

/// A kitchen started preparing the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookingStarted {
    pub kitchen_id: AggregateId,
}

impl EventPayload for CookingStarted {
    const EVENT_TYPE: &'static str = "CookingStarted";
}

/// The order is ready for pickup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkedReady {
    pub kitchen_id: AggregateId,
}

impl EventPayload for MarkedReady {
    const EVENT_TYPE: &'static str = "MarkedReady";
}

/// The order was handed over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivered {}

impl EventPayload for Delivered {
    const EVENT_TYPE: &'static str = "Delivered";
}

/// The order was cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancelled {
    pub reason: String,
}

impl EventPayload for Cancelled {
    const EVENT_TYPE: &'static str = "Cancelled";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types_are_distinct() {
        let types = [
            ItemAdded::EVENT_TYPE,
            ItemRemoved::EVENT_TYPE,
            Confirmed::EVENT_TYPE,
            CookingStarted::EVENT_TYPE,
            MarkedReady::EVENT_TYPE,
            Delivered::EVENT_TYPE,
            Cancelled::EVENT_TYPE,
        ];
        let unique: std::collections::HashSet<_> = types.iter().collect();
        assert_eq!(unique.len(), types.len());
    }

    #[test]
    fn item_added_serialization() {
        let event = ItemAdded {
            item: LineItem::new(AggregateId::new(), "Ramen", 2, Money::from_cents(1250)),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["item"]["quantity"], 2);
        assert_eq!(json["item"]["unit_price"], 1250);

        let back: ItemAdded = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
