use std::sync::Arc;

use super::room_registry::RoomHandle;
use super::MatchServer;
use crate::protocol::{validation, ErrorCode, RoomStatus, Seat, ServerEvent, SessionId};

impl MatchServer {
    /// `request_rematch`: record the flag; once both seats have asked, the
    /// room resets in place and both players ready up again.
    pub(super) async fn handle_request_rematch(&self, session_id: &SessionId) {
        let Some((room_id, seat)) = self.sessions.room_of(session_id) else {
            self.send_error_to_session(session_id, ErrorCode::NotInRoom);
            return;
        };
        let Some(handle) = self.rooms.get(&room_id) else {
            self.send_error_to_session(session_id, ErrorCode::NotInRoom);
            return;
        };

        let mut room = handle.room.lock().await;
        if !validation::kind_permitted_in("request_rematch", room.status) {
            self.send_error_to_session(session_id, ErrorCode::BadState);
            return;
        }
        if room.rematch.requested(seat) {
            // Duplicate request; nothing changes.
            return;
        }

        let both = room.request_rematch(seat);
        self.broadcast_to_room(
            &room,
            Arc::new(ServerEvent::RematchRequested { seat }),
            Some(session_id),
        );

        if !both {
            return;
        }

        handle.cancel_rematch_timer();
        room.reset_for_rematch();
        self.metrics.increment_rematches_agreed();
        tracing::info!(
            %room_id,
            code = %room.code,
            "Rematch agreed; room reset to waiting"
        );

        self.broadcast_to_room(&room, Arc::new(ServerEvent::RematchConfirmed {}), None);
        // Fresh lobby state: nobody is ready until they say so again.
        for seat in Seat::BOTH {
            self.broadcast_to_room(
                &room,
                Arc::new(ServerEvent::PlayerReadyState {
                    seat,
                    ready: false,
                    all_ready: false,
                }),
                None,
            );
        }
    }

    /// `decline_rematch`: tear the room down after the grace period.
    pub(super) async fn handle_decline_rematch(self: &Arc<Self>, session_id: &SessionId) {
        let Some((room_id, seat)) = self.sessions.room_of(session_id) else {
            self.send_error_to_session(session_id, ErrorCode::NotInRoom);
            return;
        };
        let Some(handle) = self.rooms.get(&room_id) else {
            self.send_error_to_session(session_id, ErrorCode::NotInRoom);
            return;
        };

        let mut room = handle.room.lock().await;
        if !validation::kind_permitted_in("decline_rematch", room.status) {
            self.send_error_to_session(session_id, ErrorCode::BadState);
            return;
        }

        handle.cancel_rematch_timer();
        room.rematch.timer_active = false;
        room.status = RoomStatus::Disposing;
        self.broadcast_to_room(
            &room,
            Arc::new(ServerEvent::RematchDeclined { seat }),
            None,
        );
        tracing::info!(%room_id, code = %room.code, %seat, "Rematch declined");
        self.schedule_dispose(handle.clone());
    }

    /// Bounded rematch window: armed on entering `Finished`, cancelled on
    /// agreement or decline. On expiry the room announces the timeout and
    /// is disposed after the grace period.
    pub(super) fn spawn_rematch_timer(self: &Arc<Self>, handle: Arc<RoomHandle>) {
        let token = self.child_token();
        handle.set_rematch_timer(token.clone());

        let server = Arc::clone(self);
        let timeout = server.config.rematch_timeout;

        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => return,
                () = tokio::time::sleep(timeout) => {}
            }

            let expired = {
                let mut room = handle.room.lock().await;
                if room.status != RoomStatus::Finished || room.rematch.both_requested() {
                    false
                } else {
                    room.rematch.timer_active = false;
                    room.status = RoomStatus::Disposing;
                    server.broadcast_to_room(
                        &room,
                        Arc::new(ServerEvent::RematchTimeout {}),
                        None,
                    );
                    tracing::info!(
                        room_id = %room.id,
                        code = %room.code,
                        "Rematch window expired"
                    );
                    true
                }
            };

            if expired {
                server.schedule_dispose(handle);
            }
        });
    }
}
