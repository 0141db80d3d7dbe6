//! In-process fan-out of published events to subscribers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use domain::{DomainEvent, EventPayload};
use futures_util::future::join_all;

use crate::error::{PublicationError, SubscriberError};
use crate::publisher::EventPublisher;

/// Reacts to published events.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Name used in logs and error messages.
    fn name(&self) -> &'static str;

    async fn on_event(&self, event: &dyn DomainEvent) -> Result<(), SubscriberError>;
}

/// Routes each event to the subscribers of its type and to catch-all subscribers.
///
/// Every matching subscriber is attempted even when some fail; the publish
/// fails if at least one of them did.
#[derive(Clone, Default)]
pub struct EventBus {
    by_type: HashMap<&'static str, Vec<Arc<dyn EventSubscriber>>>,
    all: Vec<Arc<dyn EventSubscriber>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to one event payload type.
    pub fn subscribe<P: EventPayload>(&mut self, subscriber: Arc<dyn EventSubscriber>) -> &mut Self {
        self.subscribe_to(P::EVENT_TYPE, subscriber)
    }

    /// Subscribes to an event type by name.
    pub fn subscribe_to(
        &mut self,
        event_type: &'static str,
        subscriber: Arc<dyn EventSubscriber>,
    ) -> &mut Self {
        tracing::debug!(event_type, subscriber = subscriber.name(), "subscriber registered");
        self.by_type.entry(event_type).or_default().push(subscriber);
        self
    }

    /// Subscribes to every event.
    pub fn subscribe_all(&mut self, subscriber: Arc<dyn EventSubscriber>) -> &mut Self {
        self.all.push(subscriber);
        self
    }

    /// Returns how many subscribers an event of this type reaches.
    pub fn subscriber_count(&self, event_type: &str) -> usize {
        self.by_type.get(event_type).map_or(0, Vec::len) + self.all.len()
    }

    fn subscribers_for(&self, event_type: &str) -> impl Iterator<Item = &Arc<dyn EventSubscriber>> {
        self.by_type
            .get(event_type)
            .into_iter()
            .flatten()
            .chain(self.all.iter())
    }
}

#[async_trait]
impl EventPublisher for EventBus {
    #[tracing::instrument(
        skip(self, event),
        fields(event_type = event.event_type(), aggregate_id = %event.aggregate_id())
    )]
    async fn publish(&self, event: Arc<dyn DomainEvent>) -> Result<(), PublicationError> {
        let deliveries = self
            .subscribers_for(event.event_type())
            .map(|subscriber| subscriber.on_event(event.as_ref()));

        let failures: Vec<SubscriberError> = join_all(deliveries)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();

        if failures.is_empty() {
            return Ok(());
        }

        for failure in &failures {
            tracing::warn!(subscriber = failure.subscriber, reason = %failure.reason, "subscriber failed");
        }

        Err(PublicationError {
            event_type: event.event_type(),
            aggregate_id: event.aggregate_id(),
            reason: failures
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        })
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut event_types: Vec<_> = self.by_type.keys().collect();
        event_types.sort();
        f.debug_struct("EventBus")
            .field("event_types", &event_types)
            .field("catch_all", &self.all.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::order::events::Confirmed;
    use domain::{Aggregate, AggregateId, LineItem, Money, Order};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        name: &'static str,
        seen: AtomicUsize,
        fail: bool,
    }

    impl Counter {
        fn new(name: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                seen: AtomicUsize::new(0),
                fail,
            })
        }

        fn seen(&self) -> usize {
            self.seen.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EventSubscriber for Counter {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn on_event(&self, _event: &dyn DomainEvent) -> Result<(), SubscriberError> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SubscriberError::new(self.name, "boom"));
            }
            Ok(())
        }
    }

    fn order_events() -> Vec<Arc<dyn DomainEvent>> {
        let mut order = Order::new();
        order
            .add_item(LineItem::new(
                AggregateId::new(),
                "Ramen",
                1,
                Money::from_cents(1200),
            ))
            .unwrap();
        order.confirm().unwrap();
        order.root().pending_events().to_vec()
    }

    #[tokio::test]
    async fn routes_by_event_type() {
        let confirmed = Counter::new("confirmed", false);
        let everything = Counter::new("everything", false);

        let mut bus = EventBus::new();
        bus.subscribe::<Confirmed>(confirmed.clone())
            .subscribe_all(everything.clone());

        for event in order_events() {
            bus.publish(event).await.unwrap();
        }

        assert_eq!(confirmed.seen(), 1);
        assert_eq!(everything.seen(), 2);
        assert_eq!(bus.subscriber_count("Confirmed"), 2);
        assert_eq!(bus.subscriber_count("ItemAdded"), 1);
    }

    #[tokio::test]
    async fn failing_subscriber_does_not_starve_others() {
        let broken = Counter::new("broken", true);
        let healthy = Counter::new("healthy", false);

        let mut bus = EventBus::new();
        bus.subscribe_to("Confirmed", broken.clone())
            .subscribe_to("Confirmed", healthy.clone());

        let confirmed = order_events().pop().unwrap();
        let err = bus.publish(confirmed.clone()).await.unwrap_err();

        assert_eq!(broken.seen(), 1);
        assert_eq!(healthy.seen(), 1);
        assert_eq!(err.event_type, "Confirmed");
        assert_eq!(err.aggregate_id, confirmed.aggregate_id());
        assert!(err.reason.contains("broken"));
    }

    #[tokio::test]
    async fn event_without_subscribers_is_accepted() {
        let bus = EventBus::new();
        let event = order_events().remove(0);
        assert!(bus.publish(event).await.is_ok());
    }
}
