//! Command handlers.
//!
//! Every handler follows the same order: load or create the aggregates,
//! call their behavior methods, save them, and register them with the
//! unit of work only after the save succeeded. A command that changes two
//! aggregates saves both in one atomic write.

use std::sync::Arc;

use async_trait::async_trait;
use common::AggregateId;
use dispatch::{Command, CommandError, CommandHandler, UnitOfWork};
use domain::{
    Aggregate, AggregateState, DomainError, Kitchen, LineItem, MenuItem, Order, Repository,
};
use state_store::StateStore;

use crate::commands::{
    CancelOrder, ChangeMenuItemPrice, CloseKitchen, ConfirmOrder, CreateMenuItem, DeliverOrder,
    MarkOrderReady, OpenKitchen, PlaceOrder, RegisterKitchen, StartCooking, WithdrawMenuItem,
};

/// State store shared by every repository.
pub type Store = Arc<dyn StateStore>;

fn id_of<A: Aggregate>(aggregate: &A) -> Result<AggregateId, CommandError> {
    aggregate.id().ok_or_else(|| {
        CommandError::Domain(DomainError::Uninitialized {
            aggregate_type: <A::State as AggregateState>::AGGREGATE_TYPE,
        })
    })
}

/// Handles menu commands.
pub struct MenuHandlers {
    menu: Repository<MenuItem, Store>,
}

impl MenuHandlers {
    pub fn new(store: Store) -> Self {
        Self {
            menu: Repository::new(store),
        }
    }
}

#[async_trait]
impl CommandHandler<CreateMenuItem> for MenuHandlers {
    #[tracing::instrument(skip(self, uow))]
    async fn handle(
        &self,
        command: CreateMenuItem,
        uow: &mut UnitOfWork,
    ) -> Result<AggregateId, CommandError> {
        let mut item = MenuItem::create(command.name, command.price)?;
        self.menu.save(&mut item).await?;

        let menu_item_id = id_of(&item)?;
        uow.track(item);
        Ok(menu_item_id)
    }
}

#[async_trait]
impl CommandHandler<ChangeMenuItemPrice> for MenuHandlers {
    #[tracing::instrument(skip(self, uow))]
    async fn handle(
        &self,
        command: ChangeMenuItemPrice,
        uow: &mut UnitOfWork,
    ) -> Result<(), CommandError> {
        let mut item = self.menu.get(command.menu_item_id).await?;
        item.change_price(command.price)?;
        self.menu.save(&mut item).await?;

        uow.track(item);
        Ok(())
    }
}

#[async_trait]
impl CommandHandler<WithdrawMenuItem> for MenuHandlers {
    #[tracing::instrument(skip(self, uow))]
    async fn handle(
        &self,
        command: WithdrawMenuItem,
        uow: &mut UnitOfWork,
    ) -> Result<(), CommandError> {
        let mut item = self.menu.get(command.menu_item_id).await?;
        item.mark_unavailable()?;
        self.menu.save(&mut item).await?;

        uow.track(item);
        Ok(())
    }
}

/// Handles kitchen commands.
pub struct KitchenHandlers {
    kitchens: Repository<Kitchen, Store>,
}

impl KitchenHandlers {
    pub fn new(store: Store) -> Self {
        Self {
            kitchens: Repository::new(store),
        }
    }
}

#[async_trait]
impl CommandHandler<RegisterKitchen> for KitchenHandlers {
    #[tracing::instrument(skip(self, uow))]
    async fn handle(
        &self,
        command: RegisterKitchen,
        uow: &mut UnitOfWork,
    ) -> Result<AggregateId, CommandError> {
        let mut kitchen = Kitchen::register(command.name, command.capacity)?;
        self.kitchens.save(&mut kitchen).await?;

        let kitchen_id = id_of(&kitchen)?;
        uow.track(kitchen);
        Ok(kitchen_id)
    }
}

#[async_trait]
impl CommandHandler<OpenKitchen> for KitchenHandlers {
    #[tracing::instrument(skip(self, uow))]
    async fn handle(&self, command: OpenKitchen, uow: &mut UnitOfWork) -> Result<(), CommandError> {
        let mut kitchen = self.kitchens.get(command.kitchen_id).await?;
        kitchen.open()?;
        self.kitchens.save(&mut kitchen).await?;

        uow.track(kitchen);
        Ok(())
    }
}

#[async_trait]
impl CommandHandler<CloseKitchen> for KitchenHandlers {
    #[tracing::instrument(skip(self, uow))]
    async fn handle(
        &self,
        command: CloseKitchen,
        uow: &mut UnitOfWork,
    ) -> Result<(), CommandError> {
        let mut kitchen = self.kitchens.get(command.kitchen_id).await?;
        kitchen.close()?;
        self.kitchens.save(&mut kitchen).await?;

        uow.track(kitchen);
        Ok(())
    }
}

/// Handles order commands, including the ones that also move a kitchen ticket.
pub struct OrderHandlers {
    orders: Repository<Order, Store>,
    menu: Repository<MenuItem, Store>,
    kitchens: Repository<Kitchen, Store>,
}

impl OrderHandlers {
    pub fn new(store: Store) -> Self {
        Self {
            orders: Repository::new(store.clone()),
            menu: Repository::new(store.clone()),
            kitchens: Repository::new(store),
        }
    }

    async fn update<F>(
        &self,
        order_id: AggregateId,
        uow: &mut UnitOfWork,
        change: F,
    ) -> Result<(), CommandError>
    where
        F: FnOnce(&mut Order) -> Result<(), domain::DomainRuleViolation> + Send,
    {
        let mut order = self.orders.get(order_id).await?;
        change(&mut order)?;
        self.orders.save(&mut order).await?;

        uow.track(order);
        Ok(())
    }
}

#[async_trait]
impl CommandHandler<PlaceOrder> for OrderHandlers {
    #[tracing::instrument(skip(self, uow))]
    async fn handle(
        &self,
        command: PlaceOrder,
        uow: &mut UnitOfWork,
    ) -> Result<AggregateId, CommandError> {
        if command.items.is_empty() {
            return Err(CommandError::invalid(
                PlaceOrder::NAME,
                "an order needs at least one item",
            ));
        }

        let mut order = Order::new();
        for (menu_item_id, quantity) in command.items {
            let menu_item = self.menu.get(menu_item_id).await?;
            if !menu_item.is_available() {
                return Err(CommandError::invalid(
                    PlaceOrder::NAME,
                    format!("{} is not available", menu_item.name()),
                ));
            }
            order.add_item(LineItem::new(
                menu_item_id,
                menu_item.name(),
                quantity,
                menu_item.price(),
            ))?;
        }
        self.orders.save(&mut order).await?;

        let order_id = id_of(&order)?;
        uow.track(order);
        Ok(order_id)
    }
}

#[async_trait]
impl CommandHandler<ConfirmOrder> for OrderHandlers {
    #[tracing::instrument(skip(self, uow))]
    async fn handle(
        &self,
        command: ConfirmOrder,
        uow: &mut UnitOfWork,
    ) -> Result<(), CommandError> {
        self.update(command.order_id, uow, Order::confirm).await
    }
}

#[async_trait]
impl CommandHandler<StartCooking> for OrderHandlers {
    #[tracing::instrument(skip(self, uow))]
    async fn handle(
        &self,
        command: StartCooking,
        uow: &mut UnitOfWork,
    ) -> Result<(), CommandError> {
        let mut order = self.orders.get(command.order_id).await?;
        let mut kitchen = self.kitchens.get(command.kitchen_id).await?;

        order.start_cooking(command.kitchen_id)?;
        kitchen.accept_ticket(command.order_id)?;

        self.orders.save_with(&mut order, &mut kitchen).await?;
        uow.track(order);
        uow.track(kitchen);
        Ok(())
    }
}

#[async_trait]
impl CommandHandler<MarkOrderReady> for OrderHandlers {
    #[tracing::instrument(skip(self, uow))]
    async fn handle(
        &self,
        command: MarkOrderReady,
        uow: &mut UnitOfWork,
    ) -> Result<(), CommandError> {
        let mut order = self.orders.get(command.order_id).await?;
        order.mark_ready()?;

        let kitchen_id = order.state().kitchen_id.ok_or_else(|| {
            CommandError::invalid(MarkOrderReady::NAME, "order has no kitchen assigned")
        })?;
        let mut kitchen = self.kitchens.get(kitchen_id).await?;
        kitchen.complete_ticket(command.order_id)?;

        self.orders.save_with(&mut order, &mut kitchen).await?;
        uow.track(order);
        uow.track(kitchen);
        Ok(())
    }
}

#[async_trait]
impl CommandHandler<DeliverOrder> for OrderHandlers {
    #[tracing::instrument(skip(self, uow))]
    async fn handle(
        &self,
        command: DeliverOrder,
        uow: &mut UnitOfWork,
    ) -> Result<(), CommandError> {
        self.update(command.order_id, uow, Order::deliver).await
    }
}

#[async_trait]
impl CommandHandler<CancelOrder> for OrderHandlers {
    #[tracing::instrument(skip(self, uow))]
    async fn handle(&self, command: CancelOrder, uow: &mut UnitOfWork) -> Result<(), CommandError> {
        let reason = command.reason;
        self.update(command.order_id, uow, move |order| order.cancel(reason))
            .await
    }
}
