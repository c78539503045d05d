/**
 * Room Registry
 *
 * Authoritative bidirectional mapping of sessions, rooms and usernames.
 * The registry owns the join/leave/broadcast/status protocol for live
 * connections; persisted membership and message history live behind the
 * `ContentStore` seam instead.
 *
 * # Invariant
 *
 * `room -> sessions` and `session -> rooms` are exact inverses at all
 * times. Every membership edge is mutated in both directions under the
 * same lock acquisition, so no operation can observe a half-updated edge.
 *
 * # Concurrency
 *
 * All mutations serialize through a single mutex over the registry state.
 * Event delivery never happens under the lock: operations take a snapshot
 * of the member channels, release the lock, then send. Sends are
 * non-blocking (unbounded channels), and a failed send to one stale
 * session never aborts delivery to the rest.
 */
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc};

use crate::registry::dispatch::{deliver, Dispatcher};
use crate::registry::session::{Session, SessionId};
use crate::shared::{CoreError, OutboundEvent, PresenceStatus};

/// Capacity of the global status broadcast channel
const STATUS_CHANNEL_CAPACITY: usize = 1024;

/// Shared mutable registry state
///
/// `sessions[sid].rooms` and `rooms[name]` are kept as exact inverses;
/// `users` indexes authenticated sessions by username for user-targeted
/// delivery.
#[derive(Debug, Default)]
pub(crate) struct RegistryInner {
    pub(crate) sessions: HashMap<SessionId, Session>,
    pub(crate) rooms: HashMap<String, HashSet<SessionId>>,
    pub(crate) users: HashMap<String, HashSet<SessionId>>,
}

impl RegistryInner {
    /// Snapshot the outbound channels of every session in a room
    pub(crate) fn room_senders(
        &self,
        room: &str,
    ) -> Vec<(SessionId, mpsc::UnboundedSender<OutboundEvent>)> {
        self.rooms
            .get(room)
            .map(|members| {
                members
                    .iter()
                    .filter_map(|sid| {
                        self.sessions
                            .get(sid)
                            .map(|session| (*sid, session.sender.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Remove one membership edge in both directions
    ///
    /// Returns `false` when the session was not a member. The remaining
    /// members' channels are captured for the `user_left` fan-out.
    fn remove_edge(
        &mut self,
        sid: SessionId,
        room: &str,
    ) -> Option<Vec<(SessionId, mpsc::UnboundedSender<OutboundEvent>)>> {
        let session = self.sessions.get_mut(&sid)?;
        if !session.rooms.remove(room) {
            return None;
        }
        if let Some(members) = self.rooms.get_mut(room) {
            members.remove(&sid);
            if members.is_empty() {
                self.rooms.remove(room);
            }
        }
        Some(self.room_senders(room))
    }
}

/// In-memory registry of live connections
///
/// Cloning is cheap; clones share the same underlying state. The serving
/// layer constructs one registry at startup and threads clones through its
/// connection handlers.
#[derive(Debug, Clone)]
pub struct RoomRegistry {
    inner: Arc<Mutex<RegistryInner>>,
    status_tx: broadcast::Sender<OutboundEvent>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(RegistryInner::default())),
            status_tx,
        }
    }

    /// Get a dispatcher sharing this registry's membership state
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.inner.clone(), self.status_tx.clone())
    }

    /// Subscribe to global `user_status` events
    pub fn subscribe_status(&self) -> broadcast::Receiver<OutboundEvent> {
        self.status_tx.subscribe()
    }

    /// Register a new connection
    ///
    /// Creates a session with no username and an empty room set. The
    /// returned receiver is the session's outbound event stream; the
    /// serving layer pumps it into the transport.
    pub fn connect(&self) -> (SessionId, mpsc::UnboundedReceiver<OutboundEvent>) {
        let sid = SessionId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().unwrap();
        inner.sessions.insert(sid, Session::new(sid, tx));
        tracing::debug!("[Registry] Client connected: {}", sid);
        (sid, rx)
    }

    /// Attach a username to a session
    ///
    /// Emits a global `user_status(online)` and acknowledges the session
    /// with an `authenticated` event.
    ///
    /// # Errors
    ///
    /// * `Validation` - empty username or unknown session
    pub fn authenticate(&self, sid: SessionId, username: &str) -> Result<(), CoreError> {
        if username.trim().is_empty() {
            return Err(CoreError::validation("username", "Username is required"));
        }

        let session_tx = {
            let mut inner = self.inner.lock().unwrap();
            let session = inner
                .sessions
                .get_mut(&sid)
                .ok_or_else(|| CoreError::validation("session", "Unknown session"))?;
            session.username = Some(username.to_string());
            session.status = PresenceStatus::Online;
            session.last_activity = chrono::Utc::now();
            let tx = session.sender.clone();
            inner.users.entry(username.to_string()).or_default().insert(sid);
            tx
        };

        let status = OutboundEvent::user_status(username, PresenceStatus::Online);
        let _ = self.status_tx.send(status);
        deliver(sid, &session_tx, OutboundEvent::authenticated(username));
        tracing::info!("[Registry] User authenticated: {} ({})", username, sid);
        Ok(())
    }

    /// Add a session to a room
    ///
    /// Both directions of the membership mapping are updated under one lock
    /// acquisition, then `user_joined` is delivered to the room snapshot,
    /// joiner included.
    ///
    /// # Errors
    ///
    /// * `Auth` - session is unknown or unauthenticated
    /// * `Validation` - empty room name
    pub fn join_room(&self, sid: SessionId, room: &str) -> Result<(), CoreError> {
        if room.trim().is_empty() {
            return Err(CoreError::validation("room", "Room name is required"));
        }

        let (username, members) = {
            let mut inner = self.inner.lock().unwrap();
            let session = inner
                .sessions
                .get_mut(&sid)
                .ok_or_else(|| CoreError::auth("Not authenticated"))?;
            let username = session
                .username
                .clone()
                .ok_or_else(|| CoreError::auth("Not authenticated"))?;
            session.rooms.insert(room.to_string());
            inner.rooms.entry(room.to_string()).or_default().insert(sid);
            (username, inner.room_senders(room))
        };

        let event = OutboundEvent::user_joined(&username, room);
        for (member_sid, tx) in &members {
            deliver(*member_sid, tx, event.clone());
        }
        tracing::info!("[Registry] User {} joined room: {}", username, room);
        Ok(())
    }

    /// Remove a session from a room
    ///
    /// A no-op when the session is not in the room; the remaining members
    /// receive `user_left`.
    pub fn leave_room(&self, sid: SessionId, room: &str) -> Result<(), CoreError> {
        let (username, remaining) = {
            let mut inner = self.inner.lock().unwrap();
            let username = match inner.sessions.get(&sid).and_then(|s| s.username.clone()) {
                Some(name) => name,
                None => {
                    tracing::debug!("[Registry] leave_room for unknown session {}", sid);
                    return Ok(());
                }
            };
            match inner.remove_edge(sid, room) {
                Some(remaining) => (username, remaining),
                None => {
                    tracing::debug!(
                        "[Registry] leave_room: {} is not in room {}",
                        username,
                        room
                    );
                    return Ok(());
                }
            }
        };

        let event = OutboundEvent::user_left(&username, room);
        for (member_sid, tx) in &remaining {
            deliver(*member_sid, tx, event.clone());
        }
        tracing::info!("[Registry] User {} left room: {}", username, room);
        Ok(())
    }

    /// Tear down a session
    ///
    /// Leaves every room the session is in (emitting `user_left` for each),
    /// removes the session, and emits a global `user_status(offline)` if it
    /// was authenticated. Idempotent: calling it again after cleanup is a
    /// no-op.
    pub fn disconnect(&self, sid: SessionId) {
        let (username, departures) = {
            let mut inner = self.inner.lock().unwrap();
            let session = match inner.sessions.get(&sid) {
                Some(session) => session,
                None => {
                    tracing::debug!("[Registry] disconnect for already-removed session {}", sid);
                    return;
                }
            };
            let username = session.username.clone();
            let mut rooms: Vec<String> = session.rooms.iter().cloned().collect();
            rooms.sort();

            let mut departures = Vec::with_capacity(rooms.len());
            for room in rooms {
                if let Some(remaining) = inner.remove_edge(sid, &room) {
                    departures.push((room, remaining));
                }
            }
            if let Some(name) = &username {
                if let Some(sessions) = inner.users.get_mut(name) {
                    sessions.remove(&sid);
                    if sessions.is_empty() {
                        inner.users.remove(name);
                    }
                }
            }
            inner.sessions.remove(&sid);
            (username, departures)
        };

        if let Some(name) = username {
            for (room, remaining) in &departures {
                let event = OutboundEvent::user_left(&name, room);
                for (member_sid, tx) in remaining {
                    deliver(*member_sid, tx, event.clone());
                }
            }
            let status = OutboundEvent::user_status(&name, PresenceStatus::Offline);
            let _ = self.status_tx.send(status);
            tracing::info!("[Registry] Client disconnected: {} ({})", sid, name);
        } else {
            tracing::debug!("[Registry] Unauthenticated client disconnected: {}", sid);
        }
    }

    /// Whether a session is currently in a room
    pub fn is_member(&self, sid: SessionId, room: &str) -> bool {
        let inner = self.inner.lock().unwrap();
        inner
            .sessions
            .get(&sid)
            .map(|s| s.rooms.contains(room))
            .unwrap_or(false)
    }

    /// Usernames with at least one live authenticated session, sorted
    pub fn online_users(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        let mut users: Vec<String> = inner.users.keys().cloned().collect();
        users.sort();
        users
    }

    /// Usernames currently present in a room, sorted
    pub fn room_users(&self, room: &str) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        let mut users: Vec<String> = inner
            .rooms
            .get(room)
            .map(|members| {
                members
                    .iter()
                    .filter_map(|sid| inner.sessions.get(sid).and_then(|s| s.username.clone()))
                    .collect()
            })
            .unwrap_or_default();
        users.sort();
        users.dedup();
        users
    }

    /// Number of live sessions
    pub fn session_count(&self) -> usize {
        self.inner.lock().unwrap().sessions.len()
    }

    /// Bump a session's last-activity timestamp
    pub(crate) fn touch(&self, sid: SessionId) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(session) = inner.sessions.get_mut(&sid) {
            session.last_activity = chrono::Utc::now();
        }
    }

    /// Username of a session, if authenticated
    pub(crate) fn username_of(&self, sid: SessionId) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.sessions.get(&sid).and_then(|s| s.username.clone())
    }

    /// Check the bidirectional-membership invariant; test support
    #[doc(hidden)]
    pub fn check_membership_invariant(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        for (sid, session) in &inner.sessions {
            for room in &session.rooms {
                match inner.rooms.get(room) {
                    Some(members) if members.contains(sid) => {}
                    _ => return false,
                }
            }
        }
        for (room, members) in &inner.rooms {
            for sid in members {
                match inner.sessions.get(sid) {
                    Some(session) if session.rooms.contains(room) => {}
                    _ => return false,
                }
            }
        }
        true
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
