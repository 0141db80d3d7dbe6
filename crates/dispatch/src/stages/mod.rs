//! Pipeline stages shipped with the dispatcher.

mod event_dispatch;
mod telemetry;

pub use event_dispatch::EventDispatchStage;
pub use telemetry::TracingStage;
