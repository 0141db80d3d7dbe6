//! Commands accepted by the restaurant.

use common::AggregateId;
use dispatch::Command;
use domain::Money;

/// Puts a new dish on the menu.
#[derive(Debug, Clone)]
pub struct CreateMenuItem {
    pub name: String,
    pub price: Money,
}

impl Command for CreateMenuItem {
    const NAME: &'static str = "CreateMenuItem";
    type Output = AggregateId;
}

#[derive(Debug, Clone)]
pub struct ChangeMenuItemPrice {
    pub menu_item_id: AggregateId,
    pub price: Money,
}

impl Command for ChangeMenuItemPrice {
    const NAME: &'static str = "ChangeMenuItemPrice";
    type Output = ();
}

/// Takes a dish off the menu; existing orders are not affected.
#[derive(Debug, Clone)]
pub struct WithdrawMenuItem {
    pub menu_item_id: AggregateId,
}

impl Command for WithdrawMenuItem {
    const NAME: &'static str = "WithdrawMenuItem";
    type Output = ();
}

#[derive(Debug, Clone)]
pub struct RegisterKitchen {
    pub name: String,
    pub capacity: u32,
}

impl Command for RegisterKitchen {
    const NAME: &'static str = "RegisterKitchen";
    type Output = AggregateId;
}

#[derive(Debug, Clone)]
pub struct OpenKitchen {
    pub kitchen_id: AggregateId,
}

impl Command for OpenKitchen {
    const NAME: &'static str = "OpenKitchen";
    type Output = ();
}

#[derive(Debug, Clone)]
pub struct CloseKitchen {
    pub kitchen_id: AggregateId,
}

impl Command for CloseKitchen {
    const NAME: &'static str = "CloseKitchen";
    type Output = ();
}

/// Places an order for the given menu items and quantities.
///
/// Prices and names are taken from the menu at the time of ordering.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub items: Vec<(AggregateId, u32)>,
}

impl Command for PlaceOrder {
    const NAME: &'static str = "PlaceOrder";
    type Output = AggregateId;
}

#[derive(Debug, Clone)]
pub struct ConfirmOrder {
    pub order_id: AggregateId,
}

impl Command for ConfirmOrder {
    const NAME: &'static str = "ConfirmOrder";
    type Output = ();
}

/// Hands a confirmed order to a kitchen, which takes a ticket for it.
#[derive(Debug, Clone)]
pub struct StartCooking {
    pub order_id: AggregateId,
    pub kitchen_id: AggregateId,
}

impl Command for StartCooking {
    const NAME: &'static str = "StartCooking";
    type Output = ();
}

/// Marks an order ready and completes its kitchen ticket.
#[derive(Debug, Clone)]
pub struct MarkOrderReady {
    pub order_id: AggregateId,
}

impl Command for MarkOrderReady {
    const NAME: &'static str = "MarkOrderReady";
    type Output = ();
}

#[derive(Debug, Clone)]
pub struct DeliverOrder {
    pub order_id: AggregateId,
}

impl Command for DeliverOrder {
    const NAME: &'static str = "DeliverOrder";
    type Output = ();
}

#[derive(Debug, Clone)]
pub struct CancelOrder {
    pub order_id: AggregateId,
    pub reason: String,
}

impl Command for CancelOrder {
    const NAME: &'static str = "CancelOrder";
    type Output = ();
}
