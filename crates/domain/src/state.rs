//! Aggregate state and the type-keyed event application registry.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use common::{AggregateId, Version};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::event::{DomainEvent, Event, EventPayload};

/// Identity and bookkeeping fields carried by every aggregate state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMetadata {
    /// Set by the first applied event, never changed afterwards.
    pub id: Option<AggregateId>,

    /// Number of events applied over the aggregate's lifetime.
    pub version: Version,

    /// Timestamp of the first applied event.
    pub created_at: Option<DateTime<Utc>>,

    /// Timestamp of the most recently applied event.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Plain persisted data of one aggregate.
///
/// A state has no behavior of its own. Its fields change only when the owning
/// [`AggregateRoot`](crate::AggregateRoot) applies an event, and the mapping
/// from event type to field updates lives in [`handlers`](AggregateState::handlers).
pub trait AggregateState:
    fmt::Debug + Default + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// The aggregate type name, used as the storage partition.
    const AGGREGATE_TYPE: &'static str;

    /// Returns the identity and version fields.
    fn metadata(&self) -> &StateMetadata;

    /// Returns the identity and version fields for mutation during event application.
    fn metadata_mut(&mut self) -> &mut StateMetadata;

    /// Returns the handler registry for this state type.
    ///
    /// Implementations build it once, typically in a `LazyLock`.
    fn handlers() -> &'static EventHandlers<Self>;
}

type Handler<S> = Box<dyn Fn(&mut S, &dyn DomainEvent) -> bool + Send + Sync>;

/// Maps event type discriminators to the functions that apply them to `S`.
///
/// Supporting a new event type means adding one `on` call; existing handlers
/// are untouched.
pub struct EventHandlers<S> {
    handlers: HashMap<&'static str, Handler<S>>,
}

impl<S: 'static> EventHandlers<S> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers the handler for events carrying payload `P`.
    ///
    /// A later registration for the same event type replaces the earlier one.
    pub fn on<P: EventPayload>(mut self, handler: fn(&mut S, &Event<P>)) -> Self {
        let erased = move |state: &mut S, event: &dyn DomainEvent| -> bool {
            match event.downcast_ref::<P>() {
                Some(event) => {
                    handler(state, event);
                    true
                }
                None => false,
            }
        };
        self.handlers.insert(P::EVENT_TYPE, Box::new(erased));
        self
    }

    /// Applies `event` to `state` with the handler registered for its type.
    ///
    /// Returns false if no handler matches.
    pub fn apply(&self, state: &mut S, event: &dyn DomainEvent) -> bool {
        self.handlers
            .get(event.event_type())
            .is_some_and(|handler| handler(state, event))
    }

    /// Returns true if a handler is registered for `event_type`.
    pub fn handles(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    /// Returns the number of registered event types.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<S: 'static> Default for EventHandlers<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for EventHandlers<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut event_types: Vec<_> = self.handlers.keys().collect();
        event_types.sort();
        f.debug_struct("EventHandlers")
            .field("event_types", &event_types)
            .finish()
    }
}

/// Applies one event to a state and advances its bookkeeping.
///
/// Only the aggregate root calls this. It cannot fail: an event type without
/// a handler is logged and still counted, because the event already happened.
pub(crate) fn apply_event<S: AggregateState>(state: &mut S, event: &dyn DomainEvent) {
    {
        let metadata = state.metadata_mut();
        if metadata.id.is_none() {
            metadata.id = Some(event.aggregate_id());
            metadata.created_at = Some(event.occurred_at());
        }
        debug_assert_eq!(metadata.id, Some(event.aggregate_id()));
    }

    if !S::handlers().apply(state, event) {
        tracing::warn!(
            aggregate_type = S::AGGREGATE_TYPE,
            event_type = event.event_type(),
            "no handler registered for event type"
        );
    }

    let metadata = state.metadata_mut();
    metadata.version = metadata.version.next();
    metadata.updated_at = Some(event.occurred_at());
}
