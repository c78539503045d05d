/**
 * Broadcast Dispatcher
 *
 * Event fan-out over the registry's current membership. Every broadcast
 * takes a snapshot of the target channels under the registry lock, releases
 * it, then delivers - sessions joining or leaving mid-dispatch are simply
 * outside the snapshot, and a stale session failing to receive never aborts
 * delivery to the rest.
 *
 * # Delivery Scopes
 *
 * - `broadcast_to_room` - every session currently in a room
 * - `broadcast_to_user` - every session authenticated as a username
 *   (a user may be connected from several devices)
 * - `broadcast_excluding` - room scope minus one session (typing
 *   indicators, so the typer does not see their own event)
 * - `broadcast_global` - all status subscribers via the broadcast channel
 */
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc};

use crate::registry::rooms::RegistryInner;
use crate::registry::session::SessionId;
use crate::shared::OutboundEvent;

/// Send one event to one session, logging instead of propagating failure
///
/// Returns whether the send succeeded. The only failure mode of an
/// unbounded channel is a dropped receiver, which means the session's
/// transport task is already gone.
pub(crate) fn deliver(
    sid: SessionId,
    tx: &mpsc::UnboundedSender<OutboundEvent>,
    event: OutboundEvent,
) -> bool {
    match tx.send(event) {
        Ok(()) => true,
        Err(_) => {
            tracing::debug!("[Dispatch] Dropped event for stale session {}", sid);
            false
        }
    }
}

/// Fan-out handle over the registry's live membership
#[derive(Debug, Clone)]
pub struct Dispatcher {
    inner: Arc<Mutex<RegistryInner>>,
    status_tx: broadcast::Sender<OutboundEvent>,
}

impl Dispatcher {
    pub(crate) fn new(
        inner: Arc<Mutex<RegistryInner>>,
        status_tx: broadcast::Sender<OutboundEvent>,
    ) -> Self {
        Self { inner, status_tx }
    }

    /// Deliver an event to every session currently in a room
    ///
    /// Returns the number of sessions that received the event.
    pub fn broadcast_to_room(&self, room: &str, event: OutboundEvent) -> usize {
        let targets = self.inner.lock().unwrap().room_senders(room);
        let mut delivered = 0;
        for (sid, tx) in &targets {
            if deliver(*sid, tx, event.clone()) {
                delivered += 1;
            }
        }
        tracing::debug!(
            "[Dispatch] Event broadcast to {}/{} sessions in room {}",
            delivered,
            targets.len(),
            room
        );
        delivered
    }

    /// Deliver an event to every session authenticated as a username
    ///
    /// Returns whether at least one session received it.
    pub fn broadcast_to_user(&self, username: &str, event: OutboundEvent) -> bool {
        let targets: Vec<(SessionId, mpsc::UnboundedSender<OutboundEvent>)> = {
            let inner = self.inner.lock().unwrap();
            inner
                .users
                .get(username)
                .map(|sids| {
                    sids.iter()
                        .filter_map(|sid| {
                            inner
                                .sessions
                                .get(sid)
                                .map(|session| (*sid, session.sender.clone()))
                        })
                        .collect()
                })
                .unwrap_or_default()
        };

        let mut delivered = false;
        for (sid, tx) in &targets {
            delivered |= deliver(*sid, tx, event.clone());
        }
        delivered
    }

    /// Room broadcast skipping one session
    pub fn broadcast_excluding(
        &self,
        room: &str,
        event: OutboundEvent,
        exclude: SessionId,
    ) -> usize {
        let targets = self.inner.lock().unwrap().room_senders(room);
        let mut delivered = 0;
        for (sid, tx) in &targets {
            if *sid == exclude {
                continue;
            }
            if deliver(*sid, tx, event.clone()) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Publish an event on the global status channel
    ///
    /// Returns the number of active subscribers that received it (0 when
    /// nobody is listening, which is fine).
    pub fn broadcast_global(&self, event: OutboundEvent) -> usize {
        match self.status_tx.send(event) {
            Ok(subscriber_count) => subscriber_count,
            Err(e) => {
                tracing::debug!("[Dispatch] No subscribers for global event: {:?}", e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::rooms::RoomRegistry;

    fn setup() -> (RoomRegistry, Dispatcher) {
        let registry = RoomRegistry::new();
        let dispatcher = registry.dispatcher();
        (registry, dispatcher)
    }

    #[tokio::test]
    async fn test_broadcast_to_room_counts_deliveries() {
        let (registry, dispatcher) = setup();
        let (alice, mut alice_rx) = registry.connect();
        let (bob, mut bob_rx) = registry.connect();
        registry.authenticate(alice, "alice").unwrap();
        registry.authenticate(bob, "bob").unwrap();
        registry.join_room(alice, "general").unwrap();
        registry.join_room(bob, "general").unwrap();
        while alice_rx.try_recv().is_ok() {}
        while bob_rx.try_recv().is_ok() {}

        let count = dispatcher.broadcast_to_room(
            "general",
            OutboundEvent::chat_message("alice", "general", "hi"),
        );
        assert_eq!(count, 2);
        assert!(alice_rx.try_recv().is_ok());
        assert!(bob_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_broadcast_to_empty_room() {
        let (_registry, dispatcher) = setup();
        let count =
            dispatcher.broadcast_to_room("nowhere", OutboundEvent::error("unused"));
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_broadcast_snapshot_excludes_later_joiner() {
        let (registry, dispatcher) = setup();
        let (alice, mut alice_rx) = registry.connect();
        registry.authenticate(alice, "alice").unwrap();
        registry.join_room(alice, "general").unwrap();
        while alice_rx.try_recv().is_ok() {}

        let count = dispatcher
            .broadcast_to_room("general", OutboundEvent::chat_message("alice", "general", "hi"));
        assert_eq!(count, 1);

        // Bob joins after the broadcast; he must not see the message
        let (bob, mut bob_rx) = registry.connect();
        registry.authenticate(bob, "bob").unwrap();
        registry.join_room(bob, "general").unwrap();
        let bob_events: Vec<_> = std::iter::from_fn(|| bob_rx.try_recv().ok()).collect();
        assert!(!bob_events
            .iter()
            .any(|e| matches!(e, OutboundEvent::ChatMessage { .. })));
    }

    #[tokio::test]
    async fn test_stale_session_does_not_abort_delivery() {
        let (registry, dispatcher) = setup();
        let (alice, mut alice_rx) = registry.connect();
        let (bob, bob_rx) = registry.connect();
        registry.authenticate(alice, "alice").unwrap();
        registry.authenticate(bob, "bob").unwrap();
        registry.join_room(alice, "general").unwrap();
        registry.join_room(bob, "general").unwrap();
        while alice_rx.try_recv().is_ok() {}

        // Bob's transport is gone but his registry entry still exists
        drop(bob_rx);

        let count = dispatcher.broadcast_to_room(
            "general",
            OutboundEvent::chat_message("alice", "general", "hi"),
        );
        assert_eq!(count, 1);
        assert!(alice_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_broadcast_to_user_reaches_all_devices() {
        let (registry, dispatcher) = setup();
        let (phone, mut phone_rx) = registry.connect();
        let (laptop, mut laptop_rx) = registry.connect();
        registry.authenticate(phone, "alice").unwrap();
        registry.authenticate(laptop, "alice").unwrap();
        while phone_rx.try_recv().is_ok() {}
        while laptop_rx.try_recv().is_ok() {}

        let delivered =
            dispatcher.broadcast_to_user("alice", OutboundEvent::error("test"));
        assert!(delivered);
        assert!(phone_rx.try_recv().is_ok());
        assert!(laptop_rx.try_recv().is_ok());

        assert!(!dispatcher.broadcast_to_user("nobody", OutboundEvent::error("test")));
    }

    #[tokio::test]
    async fn test_broadcast_excluding_skips_sender() {
        let (registry, dispatcher) = setup();
        let (alice, mut alice_rx) = registry.connect();
        let (bob, mut bob_rx) = registry.connect();
        registry.authenticate(alice, "alice").unwrap();
        registry.authenticate(bob, "bob").unwrap();
        registry.join_room(alice, "general").unwrap();
        registry.join_room(bob, "general").unwrap();
        while alice_rx.try_recv().is_ok() {}
        while bob_rx.try_recv().is_ok() {}

        let count = dispatcher.broadcast_excluding(
            "general",
            OutboundEvent::user_typing("alice", "general", true),
            alice,
        );
        assert_eq!(count, 1);
        assert!(alice_rx.try_recv().is_err());
        assert!(bob_rx.try_recv().is_ok());
    }
}
