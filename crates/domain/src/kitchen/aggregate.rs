use common::AggregateId;

use crate::aggregate::sealed::Internal;
use crate::aggregate::{Aggregate, AggregateRoot};
use crate::error::DomainRuleViolation;
use crate::state::AggregateState;

use super::KitchenState;
use super::events::{
    KitchenClosed, KitchenOpened, KitchenRegistered, TicketAccepted, TicketCompleted,
};

/// A kitchen preparing orders, with a limited number of tickets on the line.
#[derive(Debug, Default)]
pub struct Kitchen {
    root: AggregateRoot<KitchenState>,
}

impl Aggregate for Kitchen {
    type State = KitchenState;

    fn from_root(root: AggregateRoot<KitchenState>) -> Self {
        Self { root }
    }

    fn root(&self) -> &AggregateRoot<KitchenState> {
        &self.root
    }

    fn root_mut(&mut self, _: Internal) -> &mut AggregateRoot<KitchenState> {
        &mut self.root
    }
}

impl Kitchen {
    /// Registers a new, closed kitchen.
    pub fn register(name: impl Into<String>, capacity: u32) -> Result<Self, DomainRuleViolation> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(violation("kitchen name is required"));
        }
        if capacity == 0 {
            return Err(violation("capacity must be greater than 0"));
        }

        let mut kitchen = Self::default();
        kitchen.root.raise(KitchenRegistered { name, capacity });
        Ok(kitchen)
    }

    pub fn state(&self) -> &KitchenState {
        self.root.state()
    }

    pub fn open(&mut self) -> Result<(), DomainRuleViolation> {
        if self.state().is_open {
            return Err(violation("kitchen is already open"));
        }

        self.root.raise(KitchenOpened {});
        Ok(())
    }

    /// Closes the kitchen. Every ticket must be completed first.
    pub fn close(&mut self) -> Result<(), DomainRuleViolation> {
        let state = self.state();
        if !state.is_open {
            return Err(violation("kitchen is already closed"));
        }
        if !state.active_tickets.is_empty() {
            return Err(violation(format!(
                "cannot close with {} active tickets",
                state.active_tickets.len()
            )));
        }

        self.root.raise(KitchenClosed {});
        Ok(())
    }

    /// Puts an order on the line.
    pub fn accept_ticket(&mut self, order_id: AggregateId) -> Result<(), DomainRuleViolation> {
        let state = self.state();
        if !state.is_open {
            return Err(violation("kitchen is closed"));
        }
        if state.has_ticket(order_id) {
            return Err(violation(format!("order {order_id} already has a ticket")));
        }
        if !state.has_capacity() {
            return Err(violation(format!(
                "kitchen is at capacity ({})",
                state.capacity
            )));
        }

        self.root.raise(TicketAccepted { order_id });
        Ok(())
    }

    /// Takes a finished order off the line.
    pub fn complete_ticket(&mut self, order_id: AggregateId) -> Result<(), DomainRuleViolation> {
        if !self.state().has_ticket(order_id) {
            return Err(violation(format!("order {order_id} has no active ticket")));
        }

        self.root.raise(TicketCompleted { order_id });
        Ok(())
    }
}

fn violation(reason: impl Into<String>) -> DomainRuleViolation {
    DomainRuleViolation::new(KitchenState::AGGREGATE_TYPE, reason)
}
