//! Order aggregate implementation.

use common::AggregateId;

use crate::aggregate::sealed::Internal;
use crate::aggregate::{Aggregate, AggregateRoot};
use crate::error::DomainRuleViolation;
use crate::state::AggregateState;

use super::events::{
    Cancelled, Confirmed, CookingStarted, Delivered, ItemAdded, ItemRemoved, MarkedReady,
};
use super::{LineItem, Money, OrderState, OrderStatus};

/// Order aggregate root.
///
/// Represents a restaurant order from the first item added until it is
/// delivered or cancelled. Every behavior checks its rule before raising,
/// so a rejected call changes nothing.
#[derive(Debug, Default)]
pub struct Order {
    root: AggregateRoot<OrderState>,
}

impl Aggregate for Order {
    type State = OrderState;

    fn from_root(root: AggregateRoot<OrderState>) -> Self {
        Self { root }
    }

    fn root(&self) -> &AggregateRoot<OrderState> {
        &self.root
    }

    fn root_mut(&mut self, _: Internal) -> &mut AggregateRoot<OrderState> {
        &mut self.root
    }
}

impl Order {
    /// Starts an empty order. It gets its identifier with the first item.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    pub fn state(&self) -> &OrderState {
        self.root.state()
    }

    /// Returns the current status.
    pub fn status(&self) -> OrderStatus {
        self.state().status
    }

    /// Returns the line items.
    pub fn items(&self) -> &[LineItem] {
        &self.state().items
    }

    /// Returns the order total.
    pub fn total(&self) -> Money {
        self.state().total
    }

    /// Returns true if the order has at least one item.
    pub fn has_items(&self) -> bool {
        !self.state().items.is_empty()
    }

    // Command methods

    /// Adds a line item. Adding a menu item twice merges the quantities.
    pub fn add_item(&mut self, item: LineItem) -> Result<(), DomainRuleViolation> {
        self.ensure_status(OrderStatus::Pending, "add items")?;
        if item.quantity == 0 {
            return Err(violation(format!(
                "quantity must be greater than 0 (got {})",
                item.quantity
            )));
        }
        if !item.unit_price.is_positive() {
            return Err(violation(format!(
                "unit price must be greater than 0 (got {})",
                item.unit_price
            )));
        }
        self.ensure_fits(&item)?;

        self.root.raise(ItemAdded { item });
        Ok(())
    }

    /// Removes a menu item from the order.
    pub fn remove_item(&mut self, menu_item_id: AggregateId) -> Result<(), DomainRuleViolation> {
        self.ensure_status(OrderStatus::Pending, "remove items")?;
        if self.state().item(menu_item_id).is_none() {
            return Err(violation(format!("item {menu_item_id} is not on the order")));
        }

        self.root.raise(ItemRemoved { menu_item_id });
        Ok(())
    }

    /// Confirms the order.
    pub fn confirm(&mut self) -> Result<(), DomainRuleViolation> {
        self.ensure_status(OrderStatus::Pending, "confirm")?;
        if !self.has_items() {
            return Err(violation("cannot confirm an order without items"));
        }

        let total = self.total();
        let item_count = self.items().len();
        self.root.raise(Confirmed { total, item_count });
        Ok(())
    }

    /// Hands the order to a kitchen.
    pub fn start_cooking(&mut self, kitchen_id: AggregateId) -> Result<(), DomainRuleViolation> {
        self.ensure_status(OrderStatus::Confirmed, "start cooking")?;

        self.root.raise(CookingStarted { kitchen_id });
        Ok(())
    }

    /// Marks the order ready for pickup.
    pub fn mark_ready(&mut self) -> Result<(), DomainRuleViolation> {
        self.ensure_status(OrderStatus::Cooking, "mark ready")?;
        let kitchen_id = self
            .state()
            .kitchen_id
            .ok_or_else(|| violation("order is cooking without a kitchen"))?;

        self.root.raise(MarkedReady { kitchen_id });
        Ok(())
    }

    /// Hands the order over.
    pub fn deliver(&mut self) -> Result<(), DomainRuleViolation> {
        self.ensure_status(OrderStatus::Ready, "deliver")?;

        self.root.raise(Delivered {});
        Ok(())
    }

    /// Cancels a placed order. An order with no items yet has nothing to cancel.
    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<(), DomainRuleViolation> {
        if self.id().is_none() {
            return Err(violation("cannot cancel an order that was never placed"));
        }
        let status = self.status();
        if !status.can_cancel() {
            return Err(violation(format!("cannot cancel from {status} status")));
        }
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(violation("cancellation reason is required"));
        }

        self.root.raise(Cancelled { reason });
        Ok(())
    }

    // Merging keeps the existing line's unit price; the quantity and every
    // total must stay representable.
    fn ensure_fits(&self, item: &LineItem) -> Result<(), DomainRuleViolation> {
        let (unit_price, quantity) = match self.state().item(item.menu_item_id) {
            Some(existing) => (
                existing.unit_price,
                existing.quantity.checked_add(item.quantity),
            ),
            None => (item.unit_price, Some(item.quantity)),
        };
        let order_total = quantity
            .and_then(|quantity| unit_price.checked_mul(quantity))
            .and_then(|line_total| {
                self.items()
                    .iter()
                    .filter(|line| line.menu_item_id != item.menu_item_id)
                    .try_fold(line_total, |total, line| {
                        total.checked_add(line.unit_price.checked_mul(line.quantity)?)
                    })
            });

        match order_total {
            Some(_) => Ok(()),
            None => Err(violation(format!(
                "adding {} x {} would overflow the order",
                item.quantity, item.name
            ))),
        }
    }

    fn ensure_status(
        &self,
        expected: OrderStatus,
        action: &str,
    ) -> Result<(), DomainRuleViolation> {
        let status = self.status();
        if status != expected {
            return Err(violation(format!("cannot {action} from {status} status")));
        }
        Ok(())
    }
}

fn violation(reason: impl Into<String>) -> DomainRuleViolation {
    DomainRuleViolation::new(OrderState::AGGREGATE_TYPE, reason)
}
