use std::sync::Arc;

use super::persistence::FinishPlan;
use super::MatchServer;
use crate::protocol::{validation, ErrorCode, MatchOutcome, RoomStatus, ServerEvent, SessionId};
use crate::store::{MatchPlayer, MatchStatus};

impl MatchServer {
    /// `ready`: toggle or set readiness, and start the match once the
    /// start predicate holds (both seats occupied, both ready).
    pub(super) async fn handle_ready(
        self: &Arc<Self>,
        session_id: &SessionId,
        requested: Option<bool>,
    ) {
        let Some((room_id, seat)) = self.sessions.room_of(session_id) else {
            self.send_error_to_session(session_id, ErrorCode::NotInRoom);
            return;
        };
        let Some(handle) = self.rooms.get(&room_id) else {
            self.send_error_to_session(session_id, ErrorCode::NotInRoom);
            return;
        };

        // Phase 1 (under the serializer): flip the flag, and when the start
        // predicate holds run the in-memory start transition. The room is
        // already `Playing` when the lock drops, so no second ready or join
        // can race the persistence call below.
        let start_players = {
            let mut room = handle.room.lock().await;
            if !validation::kind_permitted_in("ready", room.status) {
                self.send_error_to_session(session_id, ErrorCode::BadState);
                return;
            }

            let ready = room.apply_ready(seat, requested);
            self.broadcast_to_room(
                &room,
                Arc::new(ServerEvent::PlayerReadyState {
                    seat,
                    ready,
                    all_ready: room.all_ready(),
                }),
                None,
            );

            if !room.can_start() {
                return;
            }

            room.begin_match();
            tracing::info!(
                %room_id,
                code = %room.code,
                instance_id = %self.instance_id,
                "Both players ready; starting match"
            );

            room.seat_snapshot()
                .into_iter()
                .map(|(seat, slot, _)| MatchPlayer {
                    user_id: slot.user_id,
                    wallet_address: slot.wallet_address,
                    seat,
                    goals: 0,
                })
                .collect::<Vec<_>>()
        };

        // Phase 2: persistence I/O with the serializer released.
        let match_id = self.create_match_record(start_players).await;

        // Phase 3: re-enter to record the start side effects, but only if
        // the room is still in the match we started (a disconnect in the
        // persistence window finishes the room first).
        let plan = {
            let mut room = handle.room.lock().await;
            if room.status != RoomStatus::Playing || room.match_id.is_some() {
                // The start was overtaken while the record was being
                // created; close the freshly created record so it does not
                // linger as a playing match.
                if let Some(match_id) = match_id {
                    let orphan = FinishPlan {
                        room_id: room.id,
                        code: room.code.clone(),
                        match_id: Some(match_id),
                        status: MatchStatus::Abandoned,
                        result: crate::store::MatchResult {
                            winner_user_id: None,
                            outcome: MatchOutcome::from_score(room.score),
                            final_score: room.score,
                            duration_ms: room.elapsed_play_ms(),
                        },
                    };
                    drop(room);
                    self.persist_finish(orphan).await;
                }
                return;
            }
            room.match_id = match_id;

            self.broadcast_to_room(
                &room,
                Arc::new(ServerEvent::GameStarted {
                    match_id,
                    duration_ms: room.match_duration_ms,
                }),
                None,
            );
            self.metrics.increment_matches_started();

            if room.time_remaining_ms == 0 {
                // Zero-length match: time is already up at the whistle.
                self.broadcast_to_room(&room, Arc::new(ServerEvent::TimeUp {}), None);
                Some(self.finish_locked(&handle, &mut room, None, MatchStatus::Finished))
            } else {
                self.spawn_ticker(handle.clone());
                None
            }
        };

        if let Some(plan) = plan {
            self.persist_finish(plan).await;
        }
    }
}
