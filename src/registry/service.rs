/**
 * Chat Service Facade
 *
 * Inbound protocol events that are not pure membership operations:
 * `new_message` and `typing`. The serving layer maps transport frames onto
 * these calls; persistence of chat messages stays on the serving layer's
 * side of the seam (the core only fans out for real-time delivery).
 */
use crate::registry::dispatch::Dispatcher;
use crate::registry::rooms::RoomRegistry;
use crate::registry::session::SessionId;
use crate::shared::{CoreError, OutboundEvent};

/// Registry plus dispatcher, bound together for inbound event handling
#[derive(Debug, Clone)]
pub struct ChatService {
    registry: RoomRegistry,
    dispatcher: Dispatcher,
}

impl ChatService {
    pub fn new(registry: RoomRegistry) -> Self {
        let dispatcher = registry.dispatcher();
        Self {
            registry,
            dispatcher,
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Handle an inbound `new_message` event
    ///
    /// Validates the sender's authentication and room membership, bumps the
    /// session's last-activity timestamp, and fans the message out to the
    /// room. Returns the delivered `chat_message` event.
    ///
    /// # Errors
    ///
    /// * `Auth` - session is unknown or unauthenticated
    /// * `Validation` - empty room name or message, or sender not in the room
    pub fn handle_new_message(
        &self,
        sid: SessionId,
        room: &str,
        message: &str,
    ) -> Result<OutboundEvent, CoreError> {
        let username = self
            .registry
            .username_of(sid)
            .ok_or_else(|| CoreError::auth("Not authenticated"))?;
        let message = message.trim();
        if room.trim().is_empty() || message.is_empty() {
            return Err(CoreError::validation(
                "message",
                "Room name and message are required",
            ));
        }
        if !self.registry.is_member(sid, room) {
            return Err(CoreError::validation("room", "You are not in this room"));
        }

        self.registry.touch(sid);
        let event = OutboundEvent::chat_message(&username, room, message);
        self.dispatcher.broadcast_to_room(room, event.clone());
        Ok(event)
    }

    /// Handle an inbound `typing` event
    ///
    /// Signal-only: invalid input or a sender outside the room is ignored
    /// silently. The typer is excluded from the fan-out so they do not see
    /// their own indicator.
    pub fn handle_typing(&self, sid: SessionId, room: &str, typing: bool) {
        let username = match self.registry.username_of(sid) {
            Some(name) => name,
            None => return,
        };
        if room.trim().is_empty() || !self.registry.is_member(sid, room) {
            return;
        }
        let event = OutboundEvent::user_typing(&username, room, typing);
        self.dispatcher.broadcast_excluding(room, event, sid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tokio::sync::mpsc;

    fn setup_room() -> (
        ChatService,
        SessionId,
        mpsc::UnboundedReceiver<OutboundEvent>,
        SessionId,
        mpsc::UnboundedReceiver<OutboundEvent>,
    ) {
        let service = ChatService::new(RoomRegistry::new());
        let (alice, mut alice_rx) = service.registry().connect();
        let (bob, mut bob_rx) = service.registry().connect();
        service.registry().authenticate(alice, "alice").unwrap();
        service.registry().authenticate(bob, "bob").unwrap();
        service.registry().join_room(alice, "general").unwrap();
        service.registry().join_room(bob, "general").unwrap();
        while alice_rx.try_recv().is_ok() {}
        while bob_rx.try_recv().is_ok() {}
        (service, alice, alice_rx, bob, bob_rx)
    }

    #[tokio::test]
    async fn test_new_message_fans_out_to_room() {
        let (service, alice, mut alice_rx, _bob, mut bob_rx) = setup_room();
        let event = service.handle_new_message(alice, "general", "hello").unwrap();
        assert_matches!(event, OutboundEvent::ChatMessage { ref message, .. } if message == "hello");
        assert!(alice_rx.try_recv().is_ok());
        assert!(bob_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_new_message_requires_authentication() {
        let service = ChatService::new(RoomRegistry::new());
        let (sid, _rx) = service.registry().connect();
        assert_matches!(
            service.handle_new_message(sid, "general", "hi"),
            Err(CoreError::Auth { .. })
        );
    }

    #[tokio::test]
    async fn test_new_message_requires_membership() {
        let (service, alice, _arx, _bob, _brx) = setup_room();
        assert_matches!(
            service.handle_new_message(alice, "other-room", "hi"),
            Err(CoreError::Validation { .. })
        );
    }

    #[tokio::test]
    async fn test_new_message_rejects_blank_text() {
        let (service, alice, _arx, _bob, _brx) = setup_room();
        assert_matches!(
            service.handle_new_message(alice, "general", "   "),
            Err(CoreError::Validation { .. })
        );
    }

    #[tokio::test]
    async fn test_typing_excludes_the_typer() {
        let (service, alice, mut alice_rx, _bob, mut bob_rx) = setup_room();
        service.handle_typing(alice, "general", true);
        assert!(alice_rx.try_recv().is_err());
        let event = bob_rx.try_recv().unwrap();
        assert_matches!(
            event,
            OutboundEvent::UserTyping { ref username, typing: true, .. } if username == "alice"
        );
    }

    #[tokio::test]
    async fn test_typing_outside_room_is_silent() {
        let (service, alice, _arx, _bob, mut bob_rx) = setup_room();
        service.handle_typing(alice, "elsewhere", true);
        assert!(bob_rx.try_recv().is_err());
    }
}
