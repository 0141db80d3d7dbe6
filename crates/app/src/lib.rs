//! Restaurant sample application.
//!
//! Wires the restaurant's command handlers and notification subscribers
//! into a [`CommandBus`] whose pipeline traces every command and publishes
//! the events of successful ones.

pub mod commands;
pub mod config;
pub mod error;
pub mod handlers;
pub mod subscribers;
pub mod telemetry;

use std::sync::Arc;

use dispatch::{
    Command, CommandBus, CommandError, EventDispatchStage, EventPublisher, Pipeline, TracingStage,
};
use state_store::{InMemoryStateStore, PostgresStateStore};

pub use config::{Config, LogFormat};
pub use error::AppError;
pub use handlers::Store;
pub use subscribers::Subscribers;

use commands::*;
use handlers::{KitchenHandlers, MenuHandlers, OrderHandlers};

/// Opens the state store selected by the configuration.
///
/// With a `DATABASE_URL` the PostgreSQL store is used and migrated;
/// otherwise state lives in memory for the lifetime of the process.
pub async fn connect_store(config: &Config) -> Result<Store, AppError> {
    match &config.database_url {
        Some(url) => {
            let store = PostgresStateStore::connect(url).await?;
            store.run_migrations().await?;
            tracing::info!("using PostgreSQL state store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!("using in-memory state store");
            Ok(Arc::new(InMemoryStateStore::new()))
        }
    }
}

/// Builds a bus routing every restaurant command, publishing through `publisher`.
pub fn build_command_bus(store: Store, publisher: Arc<dyn EventPublisher>) -> CommandBus {
    let pipeline = Pipeline::new()
        .with_stage(TracingStage::new())
        .with_stage(EventDispatchStage::new(publisher));

    let menu = Arc::new(MenuHandlers::new(store.clone()));
    let kitchens = Arc::new(KitchenHandlers::new(store.clone()));
    let orders = Arc::new(OrderHandlers::new(store));

    let mut bus = CommandBus::new(pipeline);
    bus.register::<CreateMenuItem, _>(menu.clone())
        .register::<ChangeMenuItemPrice, _>(menu.clone())
        .register::<WithdrawMenuItem, _>(menu)
        .register::<RegisterKitchen, _>(kitchens.clone())
        .register::<OpenKitchen, _>(kitchens.clone())
        .register::<CloseKitchen, _>(kitchens)
        .register::<PlaceOrder, _>(orders.clone())
        .register::<ConfirmOrder, _>(orders.clone())
        .register::<StartCooking, _>(orders.clone())
        .register::<MarkOrderReady, _>(orders.clone())
        .register::<DeliverOrder, _>(orders.clone())
        .register::<CancelOrder, _>(orders);
    bus
}

/// The restaurant: a command bus plus the subscribers it notifies.
#[derive(Debug)]
pub struct Restaurant {
    bus: CommandBus,
    subscribers: Subscribers,
}

impl Restaurant {
    /// Creates a restaurant over `store` with the default subscribers.
    pub fn new(store: Store) -> Self {
        let subscribers = Subscribers::new();
        let bus = build_command_bus(store, Arc::new(subscribers.event_bus()));
        Self { bus, subscribers }
    }

    /// Handles one command.
    pub async fn dispatch<C: Command>(&self, command: C) -> Result<C::Output, CommandError> {
        self.bus.dispatch(command).await
    }

    pub fn bus(&self) -> &CommandBus {
        &self.bus
    }

    pub fn subscribers(&self) -> &Subscribers {
        &self.subscribers
    }
}
