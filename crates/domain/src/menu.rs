//! Menu item aggregate.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::aggregate::sealed::Internal;
use crate::aggregate::{Aggregate, AggregateRoot};
use crate::error::DomainRuleViolation;
use crate::event::{Event, EventPayload};
use crate::order::Money;
use crate::state::{AggregateState, EventHandlers, StateMetadata};

/// A menu item was put on the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItemCreated {
    pub name: String,
    pub price: Money,
}

impl EventPayload for MenuItemCreated {
    const EVENT_TYPE: &'static str = "MenuItemCreated";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItemPriceChanged {
    pub old_price: Money,
    pub new_price: Money,
}

impl EventPayload for MenuItemPriceChanged {
    const EVENT_TYPE: &'static str = "MenuItemPriceChanged";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItemUnavailable {}

impl EventPayload for MenuItemUnavailable {
    const EVENT_TYPE: &'static str = "MenuItemUnavailable";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItemAvailable {}

impl EventPayload for MenuItemAvailable {
    const EVENT_TYPE: &'static str = "MenuItemAvailable";
}

/// Persisted data of a menu item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuItemState {
    #[serde(flatten)]
    metadata: StateMetadata,

    pub name: String,
    pub price: Money,
    pub available: bool,
}

impl MenuItemState {
    fn on_created(&mut self, event: &Event<MenuItemCreated>) {
        self.name = event.payload().name.clone();
        self.price = event.payload().price;
        self.available = true;
    }

    fn on_price_changed(&mut self, event: &Event<MenuItemPriceChanged>) {
        self.price = event.payload().new_price;
    }

    fn on_unavailable(&mut self, _event: &Event<MenuItemUnavailable>) {
        self.available = false;
    }

    fn on_available(&mut self, _event: &Event<MenuItemAvailable>) {
        self.available = true;
    }
}

static HANDLERS: LazyLock<EventHandlers<MenuItemState>> = LazyLock::new(|| {
    EventHandlers::new()
        .on(MenuItemState::on_created)
        .on(MenuItemState::on_price_changed)
        .on(MenuItemState::on_unavailable)
        .on(MenuItemState::on_available)
});

impl AggregateState for MenuItemState {
    const AGGREGATE_TYPE: &'static str = "MenuItem";

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

/// A dish on the menu with its current price.
#[derive(Debug, Default)]
pub struct MenuItem {
    root: AggregateRoot<MenuItemState>,
}

impl Aggregate for MenuItem {
    type State = MenuItemState;

    fn from_root(root: AggregateRoot<MenuItemState>) -> Self {
        Self { root }
    }

    fn root(&self) -> &AggregateRoot<MenuItemState> {
        &self.root
    }

    fn root_mut(&mut self, _: Internal) -> &mut AggregateRoot<MenuItemState> {
        &mut self.root
    }
}

impl MenuItem {
    /// Creates an available menu item.
    pub fn create(name: impl Into<String>, price: Money) -> Result<Self, DomainRuleViolation> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(violation("menu item name is required"));
        }
        if !price.is_positive() {
            return Err(violation(format!("price must be greater than 0 (got {price})")));
        }

        let mut item = Self::default();
        item.root.raise(MenuItemCreated { name, price });
        Ok(item)
    }

    pub fn state(&self) -> &MenuItemState {
        self.root.state()
    }

    pub fn name(&self) -> &str {
        &self.state().name
    }

    pub fn price(&self) -> Money {
        self.state().price
    }

    pub fn is_available(&self) -> bool {
        self.state().available
    }

    pub fn change_price(&mut self, new_price: Money) -> Result<(), DomainRuleViolation> {
        if !new_price.is_positive() {
            return Err(violation(format!(
                "price must be greater than 0 (got {new_price})"
            )));
        }
        let old_price = self.price();
        if new_price == old_price {
            return Err(violation(format!("price is already {old_price}")));
        }

        self.root.raise(MenuItemPriceChanged {
            old_price,
            new_price,
        });
        Ok(())
    }

    pub fn mark_unavailable(&mut self) -> Result<(), DomainRuleViolation> {
        if !self.is_available() {
            return Err(violation("menu item is already unavailable"));
        }

        self.root.raise(MenuItemUnavailable {});
        Ok(())
    }

    pub fn mark_available(&mut self) -> Result<(), DomainRuleViolation> {
        if self.is_available() {
            return Err(violation("menu item is already available"));
        }

        self.root.raise(MenuItemAvailable {});
        Ok(())
    }
}

fn violation(reason: impl Into<String>) -> DomainRuleViolation {
    DomainRuleViolation::new(MenuItemState::AGGREGATE_TYPE, reason)
}
