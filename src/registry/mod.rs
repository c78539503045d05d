//! Live connection tracking and event fan-out
//!
//! The registry maps transient client sessions to authenticated users and
//! to the rooms each is present in; the dispatcher delivers events over
//! that membership. Both share one lock-protected state so every membership
//! edge stays consistent in both directions.

pub mod dispatch;
pub mod rooms;
pub mod service;
pub mod session;

pub use dispatch::Dispatcher;
pub use rooms::RoomRegistry;
pub use service::ChatService;
pub use session::{Session, SessionId};
