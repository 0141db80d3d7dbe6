//! Reactions to published events.

use std::sync::Arc;

use async_trait::async_trait;
use common::AggregateId;
use dispatch::{EventBus, EventSubscriber, SubscriberError};
use domain::order::events::{Confirmed, MarkedReady};
use domain::{DomainEvent, EventPayload, Money};
use tokio::sync::RwLock;

/// A ticket shown on the kitchen display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub order_id: AggregateId,
    pub item_count: usize,
    pub total: Money,
}

/// Shows a ticket for every confirmed order.
#[derive(Debug, Default)]
pub struct KitchenDisplay {
    tickets: RwLock<Vec<Ticket>>,
}

impl KitchenDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn tickets(&self) -> Vec<Ticket> {
        self.tickets.read().await.clone()
    }
}

#[async_trait]
impl EventSubscriber for KitchenDisplay {
    fn name(&self) -> &'static str {
        "kitchen_display"
    }

    async fn on_event(&self, event: &dyn DomainEvent) -> Result<(), SubscriberError> {
        let confirmed = event.downcast_ref::<Confirmed>().ok_or_else(|| {
            SubscriberError::new(self.name(), format!("unexpected {}", event.event_type()))
        })?;

        let ticket = Ticket {
            order_id: confirmed.aggregate_id(),
            item_count: confirmed.payload().item_count,
            total: confirmed.payload().total,
        };
        tracing::info!(order_id = %ticket.order_id, items = ticket.item_count, "ticket displayed");
        self.tickets.write().await.push(ticket);
        Ok(())
    }
}

/// A message sent to the customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub order_id: AggregateId,
    pub message: String,
}

/// Tells customers their order can be picked up.
#[derive(Debug, Default)]
pub struct PickupNotifier {
    sent: RwLock<Vec<Notification>>,
}

impl PickupNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl EventSubscriber for PickupNotifier {
    fn name(&self) -> &'static str {
        "pickup_notifier"
    }

    async fn on_event(&self, event: &dyn DomainEvent) -> Result<(), SubscriberError> {
        if !event.is::<MarkedReady>() {
            return Err(SubscriberError::new(
                self.name(),
                format!("unexpected {}", event.event_type()),
            ));
        }

        let order_id = event.aggregate_id();
        let notification = Notification {
            order_id,
            message: format!("Order {order_id} is ready for pickup"),
        };
        tracing::info!(%order_id, "pickup notification sent");
        self.sent.write().await.push(notification);
        Ok(())
    }
}

/// Logs every published event with its payload.
#[derive(Debug, Default)]
pub struct EventLogger;

#[async_trait]
impl EventSubscriber for EventLogger {
    fn name(&self) -> &'static str {
        "event_logger"
    }

    async fn on_event(&self, event: &dyn DomainEvent) -> Result<(), SubscriberError> {
        let payload = event
            .payload_json()
            .map_err(|e| SubscriberError::new(self.name(), e.to_string()))?;
        tracing::debug!(
            event_type = event.event_type(),
            aggregate_id = %event.aggregate_id(),
            event_id = %event.event_id(),
            occurred_at = %event.occurred_at(),
            %payload,
            "event"
        );
        Ok(())
    }
}

/// Subscribers wired into the restaurant's event bus.
#[derive(Debug, Clone)]
pub struct Subscribers {
    pub kitchen_display: Arc<KitchenDisplay>,
    pub pickup_notifier: Arc<PickupNotifier>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self {
            kitchen_display: Arc::new(KitchenDisplay::new()),
            pickup_notifier: Arc::new(PickupNotifier::new()),
        }
    }

    /// Builds an event bus routing events to these subscribers.
    pub fn event_bus(&self) -> EventBus {
        let mut bus = EventBus::new();
        bus.subscribe_to(Confirmed::EVENT_TYPE, self.kitchen_display.clone())
            .subscribe::<MarkedReady>(self.pickup_notifier.clone())
            .subscribe_all(Arc::new(EventLogger));
        bus
    }
}

impl Default for Subscribers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Aggregate, LineItem, Order};

    fn order_events() -> Vec<Arc<dyn DomainEvent>> {
        let mut order = Order::new();
        order
            .add_item(LineItem::new(
                AggregateId::new(),
                "Pho",
                2,
                Money::from_cents(1100),
            ))
            .unwrap();
        order.confirm().unwrap();
        order.start_cooking(AggregateId::new()).unwrap();
        order.mark_ready().unwrap();
        order.root().pending_events().to_vec()
    }

    #[tokio::test]
    async fn kitchen_display_records_confirmed_orders() {
        let display = KitchenDisplay::new();
        let events = order_events();

        display.on_event(events[1].as_ref()).await.unwrap();

        let tickets = display.tickets().await;
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].order_id, events[1].aggregate_id());
        assert_eq!(tickets[0].item_count, 1);
        assert_eq!(tickets[0].total.cents(), 2200);
    }

    #[tokio::test]
    async fn kitchen_display_rejects_other_events() {
        let display = KitchenDisplay::new();
        let events = order_events();

        let err = display.on_event(events[0].as_ref()).await.unwrap_err();
        assert_eq!(err.subscriber, "kitchen_display");
        assert!(display.tickets().await.is_empty());
    }

    #[tokio::test]
    async fn pickup_notifier_messages_ready_orders() {
        let notifier = PickupNotifier::new();
        let events = order_events();
        let ready = events.last().unwrap();

        notifier.on_event(ready.as_ref()).await.unwrap();

        let sent = notifier.sent().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].message.contains("ready for pickup"));
    }

    #[tokio::test]
    async fn event_bus_routes_to_subscribers() {
        use dispatch::EventPublisher;

        let subscribers = Subscribers::new();
        let bus = subscribers.event_bus();
        for event in order_events() {
            bus.publish(event).await.unwrap();
        }

        assert_eq!(subscribers.kitchen_display.tickets().await.len(), 1);
        assert_eq!(subscribers.pickup_notifier.sent().await.len(), 1);
        assert_eq!(bus.subscriber_count("CookingStarted"), 1);
    }
}
