/**
 * Outbound Event Types
 *
 * This module defines the events the core emits toward connected clients.
 * The serving layer owns the wire encoding; these types carry the fields
 * each event needs (username, room, timestamp) and serialize with a
 * snake_case `event` tag so a JSON transport can forward them as-is.
 *
 * # Event Types
 *
 * - `user_status` - a user went online or offline (global scope)
 * - `user_joined` / `user_left` - room membership changes (room scope)
 * - `chat_message` - a chat message (room scope)
 * - `user_typing` - typing indicator (room scope, excludes the typer)
 * - `authenticated` - acknowledgment sent back to the authenticating session
 * - `error` - per-operation failure relayed to one session
 */
use serde::{Deserialize, Serialize};

/// Online/offline presence of a user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    /// The user has at least one authenticated session
    Online,
    /// The user's last session disconnected
    Offline,
}

impl PresenceStatus {
    /// String form used in event payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

/// An event delivered to connected sessions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// A user's presence changed (broadcast globally)
    UserStatus {
        username: String,
        status: PresenceStatus,
        timestamp: String,
    },
    /// A user joined a room (broadcast to the room, joiner included)
    UserJoined {
        username: String,
        room: String,
        timestamp: String,
    },
    /// A user left a room (broadcast to the remaining members)
    UserLeft {
        username: String,
        room: String,
        timestamp: String,
    },
    /// A chat message (broadcast to the room)
    ChatMessage {
        username: String,
        room: String,
        message: String,
        timestamp: String,
    },
    /// Typing indicator (broadcast to the room excluding the typer)
    UserTyping {
        username: String,
        room: String,
        typing: bool,
    },
    /// Authentication acknowledgment sent to the authenticating session
    Authenticated { username: String, status: String },
    /// Per-operation failure relayed to a single session
    Error { message: String },
}

impl OutboundEvent {
    /// Create a `user_status` event
    pub fn user_status(username: impl Into<String>, status: PresenceStatus) -> Self {
        Self::UserStatus {
            username: username.into(),
            status,
            timestamp: now_rfc3339(),
        }
    }

    /// Create a `user_joined` event
    pub fn user_joined(username: impl Into<String>, room: impl Into<String>) -> Self {
        Self::UserJoined {
            username: username.into(),
            room: room.into(),
            timestamp: now_rfc3339(),
        }
    }

    /// Create a `user_left` event
    pub fn user_left(username: impl Into<String>, room: impl Into<String>) -> Self {
        Self::UserLeft {
            username: username.into(),
            room: room.into(),
            timestamp: now_rfc3339(),
        }
    }

    /// Create a `chat_message` event
    pub fn chat_message(
        username: impl Into<String>,
        room: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ChatMessage {
            username: username.into(),
            room: room.into(),
            message: message.into(),
            timestamp: now_rfc3339(),
        }
    }

    /// Create a `user_typing` event
    pub fn user_typing(username: impl Into<String>, room: impl Into<String>, typing: bool) -> Self {
        Self::UserTyping {
            username: username.into(),
            room: room.into(),
            typing,
        }
    }

    /// Create an `authenticated` acknowledgment
    pub fn authenticated(username: impl Into<String>) -> Self {
        Self::Authenticated {
            username: username.into(),
            status: "success".to_string(),
        }
    }

    /// Create an `error` event
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Get the current timestamp as an RFC 3339 string
fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
