//! Restaurant demo entry point.
//!
//! Runs one scripted service through the command bus and prints the
//! resulting metrics.

use app::commands::{
    CancelOrder, ConfirmOrder, CreateMenuItem, DeliverOrder, MarkOrderReady, OpenKitchen,
    PlaceOrder, RegisterKitchen, StartCooking,
};
use app::{AppError, Config, Restaurant, telemetry};
use domain::Money;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Configuration, tracing and metrics
    let config = Config::from_env();
    telemetry::init_tracing(&config)?;
    let metrics_handle = telemetry::install_metrics()?;
    tracing::info!(
        kitchen = %config.kitchen_name,
        database = config.uses_database(),
        "starting restaurant"
    );

    // 2. State store and command bus
    let store = app::connect_store(&config).await?;
    let restaurant = Restaurant::new(store);

    // 3. Menu and kitchen
    let ramen = restaurant
        .dispatch(CreateMenuItem {
            name: "Tonkotsu Ramen".to_string(),
            price: Money::from_cents(1450),
        })
        .await?;
    let gyoza = restaurant
        .dispatch(CreateMenuItem {
            name: "Gyoza".to_string(),
            price: Money::from_cents(650),
        })
        .await?;
    let kitchen_id = restaurant
        .dispatch(RegisterKitchen {
            name: config.kitchen_name.clone(),
            capacity: config.kitchen_capacity,
        })
        .await?;
    restaurant.dispatch(OpenKitchen { kitchen_id }).await?;

    // 4. An order that goes all the way
    let order_id = restaurant
        .dispatch(PlaceOrder {
            items: vec![(ramen, 2), (gyoza, 1)],
        })
        .await?;
    restaurant.dispatch(ConfirmOrder { order_id }).await?;
    restaurant
        .dispatch(StartCooking {
            order_id,
            kitchen_id,
        })
        .await?;
    restaurant.dispatch(MarkOrderReady { order_id }).await?;
    restaurant.dispatch(DeliverOrder { order_id }).await?;

    // 5. An order that is cancelled, then refused further changes
    let cancelled_id = restaurant
        .dispatch(PlaceOrder {
            items: vec![(gyoza, 3)],
        })
        .await?;
    restaurant
        .dispatch(CancelOrder {
            order_id: cancelled_id,
            reason: "customer left".to_string(),
        })
        .await?;
    if let Err(e) = restaurant
        .dispatch(ConfirmOrder {
            order_id: cancelled_id,
        })
        .await
    {
        tracing::info!(error = %e, "confirming a cancelled order was refused");
    }

    // 6. What the subscribers saw
    let subscribers = restaurant.subscribers();
    for ticket in subscribers.kitchen_display.tickets().await {
        tracing::info!(order_id = %ticket.order_id, total = %ticket.total, "kitchen ticket");
    }
    for notification in subscribers.pickup_notifier.sent().await {
        tracing::info!(message = %notification.message, "customer notified");
    }

    println!("{}", metrics_handle.render());
    tracing::info!("restaurant closed");

    Ok(())
}
