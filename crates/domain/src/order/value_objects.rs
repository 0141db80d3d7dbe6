//! Value objects for the order domain.

use std::fmt;

use common::AggregateId;
use serde::{Deserialize, Serialize};

/// An amount of money in whole cents. Prices and totals are never negative.
///
/// There are no arithmetic operators: callers pick checked arithmetic when
/// validating and saturating arithmetic when applying already-validated events.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn zero() -> Self {
        Self(0)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Price of `quantity` portions at this unit price, or None on overflow.
    pub fn checked_mul(self, quantity: u32) -> Option<Money> {
        self.0.checked_mul(i64::from(quantity)).map(Self)
    }

    pub fn saturating_add(self, rhs: Money) -> Money {
        Self(self.0.saturating_add(rhs.0))
    }

    pub fn saturating_mul(self, quantity: u32) -> Money {
        Self(self.0.saturating_mul(i64::from(quantity)))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 0 {
            f.write_str("-")?;
        }
        let cents = self.0.unsigned_abs();
        write!(f, "${}.{:02}", cents / 100, cents % 100)
    }
}

/// One line of an order: a menu item at the price it was ordered for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub menu_item_id: AggregateId,
    /// Menu name captured when the item was added; later renames don't apply.
    pub name: String,
    pub quantity: u32,
    /// Captured when the item was added; later price changes don't apply.
    pub unit_price: Money,
}

impl LineItem {
    pub fn new(
        menu_item_id: AggregateId,
        name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            menu_item_id,
            name: name.into(),
            quantity,
            unit_price,
        }
    }

    /// Unit price times quantity. Saturates; `Order::add_item` rejects lines
    /// whose total does not fit.
    pub fn total_price(&self) -> Money {
        self.unit_price.saturating_mul(self.quantity)
    }
}
