//! Kitchen aggregate: opening hours and the tickets on the line.

mod aggregate;
pub mod events;
mod state;

pub use aggregate::Kitchen;
pub use state::KitchenState;
