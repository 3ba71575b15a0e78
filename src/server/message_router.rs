use std::sync::Arc;

use super::MatchServer;
use crate::protocol::{ClientEvent, ErrorCode, LeaveReason, ServerEvent, SessionId};

impl MatchServer {
    /// Route one ingress event to its handler. Per-message failures surface
    /// as `error` events to the sender and never terminate the connection.
    pub async fn handle_client_event(self: &Arc<Self>, session_id: &SessionId, event: ClientEvent) {
        tracing::trace!(%session_id, kind = event.kind(), "Ingress event");

        match event {
            ClientEvent::FindMatch => {
                self.handle_find_match(session_id).await;
            }
            ClientEvent::CreateRoom => {
                self.handle_create_room(session_id).await;
            }
            ClientEvent::JoinByCode { code } => {
                self.handle_join_by_code(session_id, &code).await;
            }
            ClientEvent::Leave => {
                let Some(entry) = self.sessions.lookup(session_id) else {
                    return;
                };
                if entry.room_id.is_none() {
                    self.send_error_to_session(session_id, ErrorCode::NotInRoom);
                    return;
                }
                self.handle_leave(session_id, &entry, LeaveReason::VoluntaryLeave)
                    .await;
            }
            ClientEvent::Ready { ready } => {
                self.handle_ready(session_id, ready).await;
            }
            ClientEvent::PlayerPosition { seat, x, y, vx, vy } => {
                self.handle_player_position(session_id, seat, x, y, vx, vy)
                    .await;
            }
            ClientEvent::BallState { x, y, vx, vy } => {
                self.handle_ball_state(session_id, x, y, vx, vy).await;
            }
            ClientEvent::Goal { scoring_seat } => {
                self.handle_goal(session_id, scoring_seat).await;
            }
            ClientEvent::RequestRematch => {
                self.handle_request_rematch(session_id).await;
            }
            ClientEvent::DeclineRematch => {
                self.handle_decline_rematch(session_id).await;
            }
            ClientEvent::Ping => {
                self.send_to_session(session_id, Arc::new(ServerEvent::Pong));
            }
        }
    }
}
