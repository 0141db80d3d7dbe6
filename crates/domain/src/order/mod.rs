//! Order aggregate and related types.

mod aggregate;
pub mod events;
mod state;
mod value_objects;

pub use aggregate::Order;
pub use state::{OrderState, OrderStatus};
pub use value_objects::{LineItem, Money};
