/**
 * In-Memory Content Store
 *
 * A `ContentStore` backed by in-process maps. Used by the test suite and by
 * callers that run the core without a persistence layer.
 *
 * # Thread Safety
 *
 * State lives behind a single `std::sync::Mutex`; every trait method takes
 * the lock briefly and clones what it returns.
 */
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::shared::CoreError;
use crate::store::{ActiveRoom, ContentStore, RoomMetadata, StoredMessage, UserData};

#[derive(Debug, Default)]
struct MemoryStoreInner {
    /// Room name -> (metadata, messages in chronological order)
    rooms: HashMap<String, (RoomMetadata, Vec<StoredMessage>)>,
    /// Room names in insertion order, so `active_rooms` is deterministic
    room_order: Vec<String>,
    users: HashMap<String, UserData>,
}

/// In-memory `ContentStore` implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room with the given tags
    pub fn add_room(&self, name: impl Into<String>, tags: &[&str]) {
        let name = name.into();
        let mut inner = self.inner.lock().unwrap();
        if !inner.rooms.contains_key(&name) {
            inner.room_order.push(name.clone());
        }
        inner.rooms.entry(name).or_insert_with(|| {
            (
                RoomMetadata {
                    tags: tags.iter().map(|t| t.to_string()).collect(),
                    ..Default::default()
                },
                Vec::new(),
            )
        });
    }

    /// Append a message to a room, creating the room if needed
    pub fn add_message(
        &self,
        room: impl Into<String>,
        username: impl Into<String>,
        content: impl Into<String>,
    ) {
        let room = room.into();
        let mut inner = self.inner.lock().unwrap();
        if !inner.rooms.contains_key(&room) {
            inner.room_order.push(room.clone());
        }
        let entry = inner
            .rooms
            .entry(room)
            .or_insert_with(|| (RoomMetadata::default(), Vec::new()));
        entry.1.push(StoredMessage {
            username: username.into(),
            content: content.into(),
            timestamp: Utc::now(),
        });
        entry.0.message_count = entry.1.len() as u64;
    }

    /// Set the interaction data for a user
    pub fn set_user(&self, username: impl Into<String>, data: UserData) {
        self.inner.lock().unwrap().users.insert(username.into(), data);
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn active_rooms(&self, limit: usize) -> Result<Vec<ActiveRoom>, CoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .room_order
            .iter()
            .take(limit)
            .filter_map(|name| {
                inner.rooms.get(name).map(|(meta, messages)| ActiveRoom {
                    name: name.clone(),
                    message_count: meta.message_count,
                    last_activity: messages
                        .last()
                        .map(|m| m.timestamp)
                        .unwrap_or_else(Utc::now),
                    tags: meta.tags.clone(),
                })
            })
            .collect())
    }

    async fn room_messages(
        &self,
        room_name: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, CoreError> {
        let inner = self.inner.lock().unwrap();
        match inner.rooms.get(room_name) {
            Some((_, messages)) => {
                let skip = messages.len().saturating_sub(limit);
                Ok(messages[skip..].to_vec())
            }
            None => Err(CoreError::not_found(format!("room '{}'", room_name))),
        }
    }

    async fn user_data(&self, username: &str) -> Result<UserData, CoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.get(username).cloned().unwrap_or_default())
    }

    async fn room_metadata(&self, room_name: &str) -> Result<RoomMetadata, CoreError> {
        let inner = self.inner.lock().unwrap();
        inner
            .rooms
            .get(room_name)
            .map(|(meta, _)| meta.clone())
            .ok_or_else(|| CoreError::not_found(format!("room '{}'", room_name)))
    }

    async fn known_users(&self) -> Result<Vec<String>, CoreError> {
        let inner = self.inner.lock().unwrap();
        let mut users: Vec<String> = inner.users.keys().cloned().collect();
        users.sort();
        Ok(users)
    }
}
