//! Per-command registry of the aggregates a handler touched.

use std::fmt;
use std::sync::Arc;

use domain::{Aggregate, DomainEvent, EventSource};
use tokio::sync::Mutex;

/// An aggregate shared between a handler and its unit of work.
pub type Tracked<A> = Arc<Mutex<A>>;

type Source = Arc<Mutex<dyn EventSource>>;

/// Where one command is in its dispatch.
///
/// ```text
/// Idle ──► HandlerRunning ──► Succeeded ──► Publishing ──► Cleared
///                   │                                        ▲
///                   └───────► Failed ────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OperationPhase {
    #[default]
    Idle,
    HandlerRunning,
    Succeeded,
    Failed,
    Publishing,
    Cleared,
}

impl OperationPhase {
    /// Returns true if `next` directly follows this phase.
    pub fn can_transition_to(&self, next: OperationPhase) -> bool {
        use OperationPhase::*;
        matches!(
            (self, next),
            (Idle, HandlerRunning)
                | (HandlerRunning, Succeeded)
                | (HandlerRunning, Failed)
                | (Succeeded, Publishing)
                | (Publishing, Cleared)
                | (Failed, Cleared)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationPhase::Idle => "idle",
            OperationPhase::HandlerRunning => "handler_running",
            OperationPhase::Succeeded => "succeeded",
            OperationPhase::Failed => "failed",
            OperationPhase::Publishing => "publishing",
            OperationPhase::Cleared => "cleared",
        }
    }
}

impl fmt::Display for OperationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the aggregates mutated while handling one command.
///
/// A unit of work is created for exactly one command and never shared
/// between commands. Handlers register every aggregate they saved; the
/// dispatch stage then collects the pending events of all of them, in
/// registration order, and clears everything once publication is over.
///
/// Registration is keyed by the identity of the shared handle, not by the
/// aggregate identifier.
#[derive(Default)]
pub struct UnitOfWork {
    sources: Vec<Source>,
    phase: OperationPhase,
}

impl UnitOfWork {
    /// Creates an empty unit of work in the `Idle` phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an aggregate in a shared handle and registers it.
    pub fn track<A: Aggregate>(&mut self, aggregate: A) -> Tracked<A> {
        let tracked = Arc::new(Mutex::new(aggregate));
        self.register(&tracked);
        tracked
    }

    /// Registers a tracked aggregate.
    ///
    /// Returns false if this handle was already registered, in which case
    /// nothing changes.
    pub fn register<A: Aggregate>(&mut self, aggregate: &Tracked<A>) -> bool {
        let source: Source = aggregate.clone();
        if self.contains(&source) {
            return false;
        }
        self.sources.push(source);
        true
    }

    fn contains(&self, source: &Source) -> bool {
        let ptr = Arc::as_ptr(source) as *const ();
        self.sources
            .iter()
            .any(|registered| Arc::as_ptr(registered) as *const () == ptr)
    }

    /// Returns the number of registered aggregates.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn phase(&self) -> OperationPhase {
        self.phase
    }

    /// Returns every pending event of every registered aggregate.
    ///
    /// Events are ordered by registration first, then by the order they
    /// were raised. Nothing is cleared.
    pub async fn collect_events(&self) -> Vec<Arc<dyn DomainEvent>> {
        let mut events = Vec::new();
        for source in &self.sources {
            let source = source.lock().await;
            events.extend(source.pending_events().iter().cloned());
        }
        events
    }

    /// Clears the pending events of every registered aggregate, then forgets them.
    ///
    /// Safe to call at any point, including after a failed handler or twice.
    pub async fn clear(&mut self) {
        for source in self.sources.drain(..) {
            source.lock().await.clear_pending_events();
        }
        self.phase = OperationPhase::Cleared;
    }

    pub(crate) fn transition(&mut self, next: OperationPhase) {
        if !self.phase.can_transition_to(next) {
            tracing::warn!(from = %self.phase, to = %next, "unexpected operation phase transition");
        }
        self.phase = next;
    }
}

impl fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("registered", &self.sources.len())
            .field("phase", &self.phase)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::AggregateId;
    use domain::{Kitchen, LineItem, MenuItem, Money, Order};

    fn order_with_items(count: u32) -> Order {
        let mut order = Order::new();
        for n in 1..=count {
            order
                .add_item(LineItem::new(
                    AggregateId::new(),
                    "Tempura",
                    n,
                    Money::from_cents(800),
                ))
                .unwrap();
        }
        order
    }

    #[tokio::test]
    async fn new_unit_of_work_is_idle_and_empty() {
        let uow = UnitOfWork::new();
        assert_eq!(uow.phase(), OperationPhase::Idle);
        assert!(uow.is_empty());
        assert!(uow.collect_events().await.is_empty());
    }

    #[tokio::test]
    async fn registering_twice_is_idempotent() {
        let mut uow = UnitOfWork::new();
        let order = uow.track(order_with_items(2));

        assert!(!uow.register(&order));
        assert!(!uow.register(&order.clone()));
        assert_eq!(uow.len(), 1);
        assert_eq!(uow.collect_events().await.len(), 2);
    }

    #[tokio::test]
    async fn distinct_handles_are_distinct_registrations() {
        let mut uow = UnitOfWork::new();
        uow.track(order_with_items(1));
        uow.track(order_with_items(1));
        assert_eq!(uow.len(), 2);
    }

    #[tokio::test]
    async fn collect_follows_registration_then_raise_order() {
        let mut uow = UnitOfWork::new();
        let kitchen = uow.track(Kitchen::register("Wok", 2).unwrap());
        let menu_item = uow.track(MenuItem::create("Bao", Money::from_cents(450)).unwrap());
        menu_item
            .lock()
            .await
            .change_price(Money::from_cents(500))
            .unwrap();
        kitchen.lock().await.open().unwrap();

        let types: Vec<_> = uow
            .collect_events()
            .await
            .iter()
            .map(|e| e.event_type())
            .collect();
        assert_eq!(
            types,
            [
                "KitchenRegistered",
                "KitchenOpened",
                "MenuItemCreated",
                "MenuItemPriceChanged"
            ]
        );
    }

    #[tokio::test]
    async fn collect_is_a_peek() {
        let mut uow = UnitOfWork::new();
        let order = uow.track(order_with_items(3));

        assert_eq!(uow.collect_events().await.len(), 3);
        assert_eq!(uow.collect_events().await.len(), 3);
        assert_eq!(order.lock().await.root().pending_events().len(), 3);
    }

    #[tokio::test]
    async fn clear_empties_aggregates_and_registry() {
        let mut uow = UnitOfWork::new();
        let first = uow.track(order_with_items(1));
        let second = uow.track(order_with_items(2));

        uow.clear().await;

        assert!(uow.is_empty());
        assert!(uow.collect_events().await.is_empty());
        assert!(first.lock().await.root().pending_events().is_empty());
        assert!(second.lock().await.root().pending_events().is_empty());
        assert_eq!(uow.phase(), OperationPhase::Cleared);

        uow.clear().await;
        assert_eq!(uow.phase(), OperationPhase::Cleared);
    }

    #[test]
    fn phase_transitions() {
        use OperationPhase::*;
        assert!(Idle.can_transition_to(HandlerRunning));
        assert!(HandlerRunning.can_transition_to(Succeeded));
        assert!(HandlerRunning.can_transition_to(Failed));
        assert!(Succeeded.can_transition_to(Publishing));
        assert!(Publishing.can_transition_to(Cleared));
        assert!(Failed.can_transition_to(Cleared));

        assert!(!Failed.can_transition_to(Publishing));
        assert!(!Succeeded.can_transition_to(Cleared));
        assert!(!Cleared.can_transition_to(Idle));
        assert!(!Idle.can_transition_to(Succeeded));
    }
}
