//! Engine events and the pub/sub bus

mod engine_event;
mod event_bus;

pub use engine_event::EngineEvent;
pub use event_bus::{EventBus, DEFAULT_EVENT_CAPACITY};
