/**
 * ContentStore Capability
 *
 * This module defines the storage seam the core reads through. The
 * persistent message/user/room store itself is an external collaborator;
 * the core only depends on this trait and on the typed records it returns.
 *
 * # Boundary Validation
 *
 * Records are validated at this boundary, not deep inside the profiler or
 * recommender: the store implementation is responsible for returning
 * well-formed rooms and messages, and the core treats every field as
 * required once a record crosses the trait.
 *
 * # Timeouts
 *
 * Store calls made from the hot paths are wrapped with [`bounded`], which
 * converts a timeout into a recoverable `TransientStore` error. Callers fall
 * back to stale cached data or an empty result, never crash.
 */
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::CoreError;

pub mod memory;

pub use memory::MemoryStore;

/// An active room as reported by the store, ordered by activity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActiveRoom {
    /// Room name
    pub name: String,
    /// Total number of persisted messages in the room
    pub message_count: u64,
    /// Timestamp of the most recent message
    pub last_activity: DateTime<Utc>,
    /// Room tags
    pub tags: Vec<String>,
}

/// A persisted chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredMessage {
    /// Author username
    pub username: String,
    /// Message text
    pub content: String,
    /// When the message was sent
    pub timestamp: DateTime<Utc>,
}

/// Persisted per-user interaction data
///
/// Joined rooms are held in a `BTreeSet` so every iteration over a user's
/// rooms is deterministic, which keeps candidate ordering stable across
/// recommendation runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserData {
    /// Rooms the user has joined (persisted membership, not live sessions)
    pub joined_rooms: BTreeSet<String>,
    /// Interest keywords, most significant first
    pub interests: Vec<String>,
    /// Keyword frequency counts backing the interests list
    #[serde(default)]
    pub word_counts: HashMap<String, u32>,
}

impl UserData {
    /// Whether the user has any signal to personalize on
    pub fn has_signal(&self) -> bool {
        !self.interests.is_empty() || !self.joined_rooms.is_empty()
    }
}

/// Room metadata used for explanations
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RoomMetadata {
    /// Room tags
    pub tags: Vec<String>,
    /// Total persisted message count
    pub message_count: u64,
    /// Room description
    pub description: String,
}

/// Read interface over the persisted chat data
///
/// Implemented by the excluded persistence layer (optionally fronted by a
/// read-through cache). The core must be correct with any implementation,
/// cache present or not.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Most active rooms, ordered by recent activity, at most `limit`
    async fn active_rooms(&self, limit: usize) -> Result<Vec<ActiveRoom>, CoreError>;

    /// Most recent messages of a room in chronological order, at most `limit`
    async fn room_messages(
        &self,
        room_name: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, CoreError>;

    /// Interaction data for a user
    ///
    /// Unknown users yield an empty `UserData`; the recommendation engine
    /// turns that into an `InsufficientData` empty state.
    async fn user_data(&self, username: &str) -> Result<UserData, CoreError>;

    /// Metadata for a room, `NotFound` if the room does not exist
    async fn room_metadata(&self, room_name: &str) -> Result<RoomMetadata, CoreError>;

    /// All usernames known to the store
    async fn known_users(&self) -> Result<Vec<String>, CoreError>;
}

/// Run a store call with a bounded timeout
///
/// A timeout is a recoverable failure: it maps to
/// [`CoreError::TransientStore`] so callers can fall back to cached data or
/// an empty result.
pub async fn bounded<T, F>(timeout: Duration, what: &str, fut: F) -> Result<T, CoreError>
where
    F: Future<Output = Result<T, CoreError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(CoreError::transient(format!(
            "{} timed out after {:?}",
            what, timeout
        ))),
    }
}
