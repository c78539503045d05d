/**
 * Live Session Types
 *
 * A session is one live client connection, pre- or post-authentication.
 * Sessions are created on connect, gain a username on the authenticate
 * event, and are destroyed on disconnect after being removed from all
 * rooms.
 */
use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::shared::{OutboundEvent, PresenceStatus};

/// Opaque identifier of a live connection, unique per connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh session identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A live connection tracked by the registry
#[derive(Debug)]
pub struct Session {
    /// Session identifier
    pub id: SessionId,
    /// Authenticated username, `None` until the authenticate event
    pub username: Option<String>,
    /// Rooms this session is currently in
    pub rooms: HashSet<String>,
    /// Last time the session sent a message
    pub last_activity: DateTime<Utc>,
    /// Presence status
    pub status: PresenceStatus,
    /// Outbound delivery channel toward this session's transport
    pub sender: mpsc::UnboundedSender<OutboundEvent>,
}

impl Session {
    /// Create a fresh unauthenticated session around an outbound channel
    pub fn new(id: SessionId, sender: mpsc::UnboundedSender<OutboundEvent>) -> Self {
        Self {
            id,
            username: None,
            rooms: HashSet::new(),
            last_activity: Utc::now(),
            status: PresenceStatus::Offline,
            sender,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_new_session_is_unauthenticated() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = Session::new(SessionId::new(), tx);
        assert!(session.username.is_none());
        assert!(session.rooms.is_empty());
        assert_eq!(session.status, PresenceStatus::Offline);
    }
}
