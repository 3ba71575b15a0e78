use std::sync::Arc;

use super::MatchServer;
use crate::broadcast::PushOutcome;
use crate::protocol::{ErrorCode, Room, Seat, ServerEvent, SessionId};

impl MatchServer {
    /// Push an event onto one session's outbound queue. Never blocks; the
    /// queue's overflow policy decides what happens under back-pressure.
    pub(crate) fn send_to_session(&self, session_id: &SessionId, event: Arc<ServerEvent>) {
        let Some(queue) = self.sessions.queue_of(session_id) else {
            tracing::debug!(%session_id, "Dropping event for unknown session");
            return;
        };
        if queue.push(event) == PushOutcome::Dropped {
            self.metrics.add_events_dropped(1);
        }
    }

    /// Send an `error` event carrying the code's canonical message.
    pub(crate) fn send_error_to_session(&self, session_id: &SessionId, code: ErrorCode) {
        self.send_to_session(session_id, Arc::new(ServerEvent::error(code)));
    }

    pub(crate) fn send_error_with_message(
        &self,
        session_id: &SessionId,
        code: ErrorCode,
        message: impl Into<String>,
    ) {
        self.send_to_session(
            session_id,
            Arc::new(ServerEvent::error_with_message(code, message)),
        );
    }

    /// Fan an event out to a room's occupants, optionally excluding one
    /// session. Callers hold the room serializer, so every client observes
    /// events in the order the room decided them.
    pub(crate) fn broadcast_to_room(
        &self,
        room: &Room,
        event: Arc<ServerEvent>,
        except: Option<&SessionId>,
    ) {
        for seat in Seat::BOTH {
            let Some(slot) = room.occupant(seat) else {
                continue;
            };
            if except == Some(&slot.session_id) {
                continue;
            }
            self.send_to_session(&slot.session_id, event.clone());
        }
    }
}
