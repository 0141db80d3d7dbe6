//! Domain events: immutable facts about one aggregate.

use std::any::Any;
use std::fmt;

use chrono::{DateTime, Utc};
use common::{AggregateId, EventId};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// The body of one concrete event type.
///
/// Every payload type carries a fixed discriminator that is used both as the
/// key in a state's handler registry and as the published event type name.
/// Names should be past tense.
pub trait EventPayload:
    fmt::Debug + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// The event type discriminator (e.g. "ItemAdded").
    const EVENT_TYPE: &'static str;
}

/// An immutable domain event: a payload stamped with its aggregate and time.
///
/// Fields can only be read after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<P> {
    event_id: EventId,
    aggregate_id: AggregateId,
    occurred_at: DateTime<Utc>,
    payload: P,
}

impl<P: EventPayload> Event<P> {
    /// Creates an event for the given aggregate, stamped with the current time.
    pub fn new(aggregate_id: AggregateId, payload: P) -> Self {
        Self {
            event_id: EventId::new(),
            aggregate_id,
            occurred_at: Utc::now(),
            payload,
        }
    }

    /// Returns the event payload.
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Returns when the event was raised.
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// Returns the aggregate this event belongs to.
    pub fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }
}

/// Object-safe view over any `Event<P>`.
///
/// This is what aggregates queue and what publishers receive; callers that
/// need the typed payload recover it with [`downcast_ref`](dyn DomainEvent::downcast_ref).
pub trait DomainEvent: fmt::Debug + Send + Sync + 'static {
    /// Returns the unique id of this event.
    fn event_id(&self) -> EventId;

    /// Returns the event type discriminator.
    fn event_type(&self) -> &'static str;

    /// Returns the aggregate this event belongs to.
    fn aggregate_id(&self) -> AggregateId;

    /// Returns when the event was raised.
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Serializes the payload to JSON.
    fn payload_json(&self) -> Result<serde_json::Value, serde_json::Error>;

    /// Returns the event as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl<P: EventPayload> DomainEvent for Event<P> {
    fn event_id(&self) -> EventId {
        self.event_id
    }

    fn event_type(&self) -> &'static str {
        P::EVENT_TYPE
    }

    fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    fn payload_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(&self.payload)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn DomainEvent {
    /// Returns the typed event if this event carries payload `P`.
    pub fn downcast_ref<P: EventPayload>(&self) -> Option<&Event<P>> {
        self.as_any().downcast_ref::<Event<P>>()
    }

    /// Returns true if this event carries payload `P`.
    pub fn is<P: EventPayload>(&self) -> bool {
        self.as_any().is::<Event<P>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Renamed {
        name: String,
    }

    impl EventPayload for Renamed {
        const EVENT_TYPE: &'static str = "Renamed";
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Archived;

    impl EventPayload for Archived {
        const EVENT_TYPE: &'static str = "Archived";
    }

    #[test]
    fn event_exposes_metadata() {
        let id = AggregateId::new();
        let event = Event::new(
            id,
            Renamed {
                name: "Bistro".to_string(),
            },
        );

        assert_eq!(event.aggregate_id(), id);
        assert_eq!(DomainEvent::event_type(&event), "Renamed");
        assert_eq!(event.payload().name, "Bistro");
        assert!(event.occurred_at() <= Utc::now());
    }

    #[test]
    fn downcast_recovers_typed_event() {
        let event: Arc<dyn DomainEvent> = Arc::new(Event::new(
            AggregateId::new(),
            Renamed {
                name: "Diner".to_string(),
            },
        ));

        assert!(event.is::<Renamed>());
        assert!(!event.is::<Archived>());
        assert!(event.downcast_ref::<Archived>().is_none());

        let typed = event.downcast_ref::<Renamed>().unwrap();
        assert_eq!(typed.payload().name, "Diner");
    }

    #[test]
    fn payload_json_serializes_body_only() {
        let event = Event::new(
            AggregateId::new(),
            Renamed {
                name: "Cafe".to_string(),
            },
        );
        let json = event.payload_json().unwrap();
        assert_eq!(json, serde_json::json!({ "name": "Cafe" }));
    }

    #[test]
    fn every_event_gets_its_own_id() {
        let id = AggregateId::new();
        let a = Event::new(id, Archived);
        let b = Event::new(id, Archived);
        assert_ne!(a.event_id(), b.event_id());
    }
}
