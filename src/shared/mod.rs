//! Types shared across the registry, profiler and recommendation engine

pub mod error;
pub mod event;

pub use error::CoreError;
pub use event::{OutboundEvent, PresenceStatus};
