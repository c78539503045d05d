//! Roomcast - Main Library
//!
//! Roomcast is the core of a multi-room chat service: a real-time
//! connection and room registry with broadcast delivery, plus a
//! recommendation engine that profiles room content and suggests rooms
//! to users.
//!
//! # Overview
//!
//! This library provides:
//! - Session lifecycle management (connect, authenticate, disconnect)
//! - Room membership with join/leave/broadcast semantics
//! - Targeted, room-scoped and global event delivery
//! - TF-IDF content profiles and topic models over room messages
//! - Content-based, collaborative and hybrid room recommendations
//!
//! # Module Structure
//!
//! - **`shared`** - Types used across subsystems
//!   - Outbound event payloads and presence status
//!   - The error taxonomy
//!
//! - **`registry`** - Real-time connection and room state
//!   - Session registry with bidirectional room membership indices
//!   - Event dispatcher for targeted and broadcast delivery
//!   - Chat service handlers for messages and typing indicators
//!
//! - **`store`** - Persistent content access
//!   - The `ContentStore` trait and an in-memory implementation
//!   - Timeout-bounded store calls
//!
//! - **`profile`** - Room content analysis
//!   - Tokenization, TF-IDF vectorization, topic modeling
//!   - The periodically refreshed profile cache
//!
//! - **`recommend`** - Room recommendations
//!   - Content, collaborative and topic candidate signals
//!   - Hybrid rank fusion, explanations, per-user history
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use roomcast::config::CoreConfig;
//! use roomcast::profile::ContentProfiler;
//! use roomcast::recommend::{Algorithm, Recommender};
//! use roomcast::registry::{ChatService, RoomRegistry};
//! use roomcast::store::MemoryStore;
//!
//! # async fn example() -> Result<(), roomcast::shared::CoreError> {
//! let config = CoreConfig::default();
//!
//! let registry = RoomRegistry::new();
//! let service = ChatService::new(registry.clone());
//!
//! let (session, _events) = registry.connect();
//! registry.authenticate(session, "alice")?;
//! registry.join_room(session, "general")?;
//! service.handle_new_message(session, "general", "hello")?;
//!
//! let store = Arc::new(MemoryStore::new());
//! let profiler = Arc::new(ContentProfiler::new(store.clone(), config.profiler));
//! let recommender = Recommender::new(store, profiler, config.recommender);
//! let rooms = recommender.recommend("alice", 5, Algorithm::Hybrid).await?;
//! # let _ = rooms;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod profile;
pub mod recommend;
pub mod registry;
pub mod shared;
pub mod store;

pub use config::CoreConfig;
pub use profile::ContentProfiler;
pub use recommend::{Algorithm, Recommender};
pub use registry::{ChatService, RoomRegistry};
pub use shared::{CoreError, OutboundEvent};
pub use store::{ContentStore, MemoryStore};
