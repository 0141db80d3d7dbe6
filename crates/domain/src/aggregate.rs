//! Aggregate roots: behavior wrapped around one owned state.

use std::sync::Arc;

use common::{AggregateId, Version};

use crate::event::{DomainEvent, Event, EventPayload};
use crate::state::{AggregateState, apply_event};

/// Owns one state and the events raised against it that are not yet published.
///
/// The root has no identifier or version of its own; both are read through
/// the state. Behavior methods on concrete aggregates validate their rule
/// first and only then call [`raise`](Self::raise), so a rejected call leaves
/// the state and the pending list exactly as they were.
#[derive(Debug)]
pub struct AggregateRoot<S: AggregateState> {
    state: S,
    pending: Vec<Arc<dyn DomainEvent>>,
    persisted_version: Version,
}

impl<S: AggregateState> AggregateRoot<S> {
    /// Creates a root around an empty, uninitialized state.
    pub fn new() -> Self {
        Self {
            state: S::default(),
            pending: Vec::new(),
            persisted_version: Version::initial(),
        }
    }

    /// Reconstructs a root from a stored state, with no pending events.
    pub fn from_state(state: S) -> Self {
        let persisted_version = state.metadata().version;
        Self {
            state,
            pending: Vec::new(),
            persisted_version,
        }
    }

    /// Returns the aggregate identifier, or None before the first event.
    pub fn id(&self) -> Option<AggregateId> {
        self.state.metadata().id
    }

    /// Returns the current version.
    pub fn version(&self) -> Version {
        self.state.metadata().version
    }

    /// Returns the version this root was loaded at or last saved at.
    ///
    /// This is the token the store compares against on the next save.
    pub fn persisted_version(&self) -> Version {
        self.persisted_version
    }

    /// Returns true if this aggregate has never been saved.
    pub fn is_new(&self) -> bool {
        self.persisted_version == Version::initial()
    }

    /// Returns a read-only view of the state.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Returns the events raised since the last clear, in raise order.
    pub fn pending_events(&self) -> &[Arc<dyn DomainEvent>] {
        &self.pending
    }

    /// Drops every pending event.
    pub fn clear_pending_events(&mut self) {
        self.pending.clear();
    }

    /// Records a validated change: builds the event, applies it, queues it.
    ///
    /// The event is stamped with the state's identifier, or with a freshly
    /// generated one when this is the aggregate's first event.
    pub(crate) fn raise<P: EventPayload>(&mut self, payload: P) -> Arc<Event<P>> {
        let aggregate_id = self.id().unwrap_or_else(AggregateId::new);
        self.raise_for(aggregate_id, payload)
    }

    /// Like [`raise`](Self::raise) but with a caller-chosen identifier for the first event.
    ///
    /// Once the state is initialized its identifier always wins.
    pub(crate) fn raise_for<P: EventPayload>(
        &mut self,
        aggregate_id: AggregateId,
        payload: P,
    ) -> Arc<Event<P>> {
        let aggregate_id = self.id().unwrap_or(aggregate_id);
        let event = Arc::new(Event::new(aggregate_id, payload));

        apply_event(&mut self.state, event.as_ref());
        tracing::trace!(
            aggregate_type = S::AGGREGATE_TYPE,
            %aggregate_id,
            event_type = P::EVENT_TYPE,
            version = %self.version(),
            "event raised"
        );

        self.pending.push(event.clone());
        event
    }

    pub(crate) fn mark_persisted(&mut self, version: Version) {
        self.persisted_version = version;
    }
}

impl<S: AggregateState> Default for AggregateRoot<S> {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) mod sealed {
    /// Passed to [`Aggregate::root_mut`](super::Aggregate::root_mut). Only this
    /// crate can construct it, so other crates can neither mutate a root nor
    /// implement `Aggregate`.
    #[derive(Debug, Clone, Copy)]
    pub struct Internal(pub(crate) ());
}

/// A concrete aggregate built around an [`AggregateRoot`].
///
/// Implemented by the newtypes that carry the business methods (`Order`,
/// `Kitchen`, ...) and by `AggregateRoot` itself.
///
/// Outside this crate an aggregate only changes through its behavior methods.
/// Events cannot be raised directly:
///
/// ```compile_fail
/// use domain::order::events::Delivered;
/// use domain::{AggregateRoot, OrderState};
///
/// let mut root = AggregateRoot::<OrderState>::new();
/// root.raise(Delivered {});
/// ```
///
/// and the mutable root is out of reach:
///
/// ```compile_fail
/// use domain::aggregate::sealed::Internal;
/// use domain::{Aggregate, Order};
///
/// let mut order = Order::new();
/// order.root_mut(Internal(())).clear_pending_events();
/// ```
pub trait Aggregate: Send + Sized + 'static {
    /// The persisted state type.
    type State: AggregateState;

    /// Wraps a root, typically one reconstructed from storage.
    fn from_root(root: AggregateRoot<Self::State>) -> Self;

    /// Returns the wrapped root.
    fn root(&self) -> &AggregateRoot<Self::State>;

    #[doc(hidden)]
    fn root_mut(&mut self, _: sealed::Internal) -> &mut AggregateRoot<Self::State>;

    /// Returns the aggregate identifier, or None before the first event.
    fn id(&self) -> Option<AggregateId> {
        self.root().id()
    }

    /// Returns the current version.
    fn version(&self) -> Version {
        self.root().version()
    }
}

impl<S: AggregateState> Aggregate for AggregateRoot<S> {
    type State = S;

    fn from_root(root: AggregateRoot<S>) -> Self {
        root
    }

    fn root(&self) -> &AggregateRoot<S> {
        self
    }

    fn root_mut(&mut self, _: sealed::Internal) -> &mut AggregateRoot<S> {
        self
    }
}

/// Anything that accumulates events for later publication.
///
/// This is the only view a unit of work has of the aggregates registered with it.
pub trait EventSource: Send {
    /// Returns the pending events in raise order.
    fn pending_events(&self) -> &[Arc<dyn DomainEvent>];

    /// Drops every pending event.
    fn clear_pending_events(&mut self);
}

impl<A: Aggregate> EventSource for A {
    fn pending_events(&self) -> &[Arc<dyn DomainEvent>] {
        self.root().pending_events()
    }

    fn clear_pending_events(&mut self) {
        self.root_mut(sealed::Internal(())).clear_pending_events();
    }
}
