use std::sync::Arc;

use super::connection_manager::SessionEntry;
use super::persistence::FinishPlan;
use super::room_registry::RoomHandle;
use super::MatchServer;
use crate::protocol::{
    room_codes, validation, ErrorCode, GameEndedPayload, LeaveReason, Room, RoomJoinedPayload,
    RoomStatus, Seat, SeatInfo, SeatSlot, ServerEvent, SessionId,
};
use crate::store::MatchStatus;

impl MatchServer {
    /// `find_match`: seat the session in the oldest open room, or create a
    /// fresh one.
    pub(super) async fn handle_find_match(&self, session_id: &SessionId) {
        let Some(entry) = self.sessions.lookup(session_id) else {
            return;
        };
        if entry.room_id.is_some() {
            self.send_error_to_session(session_id, ErrorCode::AlreadyInRoom);
            return;
        }

        for handle in self.rooms.snapshot() {
            let mut room = handle.room.lock().await;
            if room.status != RoomStatus::Waiting || room.is_full() {
                continue;
            }
            self.join_seated(&mut room, session_id, &entry);
            return;
        }

        let handle = self.create_room_handle();
        let mut room = handle.room.lock().await;
        self.join_seated(&mut room, session_id, &entry);
    }

    /// `create_room`: always a fresh room; the response carries its code.
    pub(super) async fn handle_create_room(&self, session_id: &SessionId) {
        let Some(entry) = self.sessions.lookup(session_id) else {
            return;
        };
        if entry.room_id.is_some() {
            self.send_error_to_session(session_id, ErrorCode::AlreadyInRoom);
            return;
        }

        let handle = self.create_room_handle();
        let mut room = handle.room.lock().await;
        self.join_seated(&mut room, session_id, &entry);
    }

    /// `join_by_code`: case-insensitive lookup among live rooms.
    pub(super) async fn handle_join_by_code(&self, session_id: &SessionId, code: &str) {
        let Some(entry) = self.sessions.lookup(session_id) else {
            return;
        };
        if entry.room_id.is_some() {
            self.send_error_to_session(session_id, ErrorCode::AlreadyInRoom);
            return;
        }

        let code = room_codes::normalize_code(code);
        if let Err(reason) = validation::validate_room_code(&code, self.config.room_code_length) {
            self.send_error_with_message(session_id, ErrorCode::BadCode, reason);
            return;
        }

        let Some(handle) = self.rooms.find_by_code(&code) else {
            self.send_error_to_session(session_id, ErrorCode::BadCode);
            return;
        };

        let mut room = handle.room.lock().await;
        match room.status {
            // A disposing room is as good as deleted.
            RoomStatus::Disposing => {
                self.send_error_to_session(session_id, ErrorCode::BadCode);
            }
            RoomStatus::Waiting if !room.is_full() => {
                self.join_seated(&mut room, session_id, &entry);
            }
            // Full, playing, or finished: both seats are committed.
            _ => {
                self.send_to_session(
                    session_id,
                    Arc::new(ServerEvent::RoomFull { room_id: room.id }),
                );
            }
        }
    }

    fn create_room_handle(&self) -> Arc<RoomHandle> {
        let handle = self.rooms.create(
            self.config.room_code_length,
            self.config.match_duration.as_millis() as u64,
        );
        self.metrics.increment_rooms_created();
        handle
    }

    /// Claim a seat under the room serializer and run the join bookkeeping.
    fn join_seated(&self, room: &mut Room, session_id: &SessionId, entry: &SessionEntry) {
        // A session holds at most one seat; re-checked here because the
        // caller's guard ran before this room's serializer was taken.
        if self.sessions.room_of(session_id).is_some() {
            self.send_error_to_session(session_id, ErrorCode::AlreadyInRoom);
            return;
        }
        let slot = SeatSlot {
            session_id: *session_id,
            user_id: entry.principal.user_id.clone(),
            wallet_address: entry.principal.wallet_address.clone(),
        };
        let Some(seat) = room.claim_seat(slot) else {
            self.send_to_session(
                session_id,
                Arc::new(ServerEvent::RoomFull { room_id: room.id }),
            );
            return;
        };

        self.sessions.assign_room(session_id, room.id, seat);

        let seats = room
            .seat_snapshot()
            .into_iter()
            .map(|(seat, slot, ready)| SeatInfo {
                seat,
                user_id: slot.user_id,
                ready,
            })
            .collect();
        self.send_to_session(
            session_id,
            Arc::new(ServerEvent::RoomJoined(Box::new(RoomJoinedPayload {
                room_id: room.id,
                code: room.code.clone(),
                seat,
                seats,
            }))),
        );
        self.broadcast_to_room(
            room,
            Arc::new(ServerEvent::PlayerJoined { seat }),
            Some(session_id),
        );

        tracing::info!(
            %session_id,
            room_id = %room.id,
            code = %room.code,
            %seat,
            user_id = %entry.principal.user_id,
            instance_id = %self.instance_id,
            "Player seated"
        );
    }

    /// Room-side effects of a session leaving, from the `leave` message or
    /// from detach. The session's seat is released and the FSM advances
    /// according to the room status.
    pub(super) async fn handle_leave(
        self: &Arc<Self>,
        session_id: &SessionId,
        entry: &SessionEntry,
        reason: LeaveReason,
    ) {
        let Some(room_id) = entry.room_id else {
            return;
        };
        self.sessions.clear_room(session_id);
        let Some(handle) = self.rooms.get(&room_id) else {
            return;
        };

        let mut dispose_now = false;
        let mut time_up_plan = None;
        let plan = {
            let mut room = handle.room.lock().await;
            let Some(seat) = room.seat_of(session_id) else {
                return;
            };

            // Time-up wins the race: a leave landing exactly at zero
            // remaining time finishes on the clock (score decides, both
            // seats still counted), and the leave is then processed
            // against the finished room.
            if room.status == RoomStatus::Playing && room.time_remaining_ms == 0 {
                self.broadcast_to_room(&room, Arc::new(ServerEvent::TimeUp {}), None);
                time_up_plan =
                    Some(self.finish_locked(&handle, &mut room, None, MatchStatus::Finished));
            }

            room.release_seat(seat);
            self.broadcast_to_room(
                &room,
                Arc::new(ServerEvent::PlayerLeft { seat, reason }),
                None,
            );
            tracing::info!(
                %session_id,
                %room_id,
                code = %room.code,
                %seat,
                ?reason,
                status = ?room.status,
                "Player left room"
            );

            match room.status {
                RoomStatus::Waiting => {
                    dispose_now = room.is_empty();
                    None
                }
                RoomStatus::Playing => {
                    // Mid-game abort: the remaining seat wins regardless of
                    // score; with nobody left the score decides.
                    let forced_winner = Seat::BOTH
                        .into_iter()
                        .find(|candidate| room.occupant(*candidate).is_some());
                    Some(self.finish_locked(
                        &handle,
                        &mut room,
                        forced_winner,
                        MatchStatus::Finished,
                    ))
                }
                RoomStatus::Finished => {
                    // Walking out of the rematch window counts as declining.
                    handle.cancel_rematch_timer();
                    room.rematch.timer_active = false;
                    if room.is_empty() {
                        dispose_now = true;
                    } else {
                        self.broadcast_to_room(
                            &room,
                            Arc::new(ServerEvent::RematchDeclined { seat }),
                            None,
                        );
                        room.status = RoomStatus::Disposing;
                        self.schedule_dispose(handle.clone());
                    }
                    None
                }
                RoomStatus::Disposing => None,
            }
        };

        if dispose_now {
            self.dispose_room(&handle).await;
        }
        if let Some(plan) = time_up_plan {
            self.persist_finish(plan).await;
        }
        if let Some(plan) = plan {
            self.persist_finish(plan).await;
        }
    }

    /// Finish transition, run under the room serializer. Broadcasts
    /// `game_ended`, stops the ticker, arms the rematch timer, and returns
    /// the persistence snapshot to execute after the lock is dropped.
    pub(super) fn finish_locked(
        self: &Arc<Self>,
        handle: &Arc<RoomHandle>,
        room: &mut Room,
        forced_winner: Option<Seat>,
        status: MatchStatus,
    ) -> FinishPlan {
        handle.cancel_ticker();

        let outcome = room.finish_outcome(forced_winner);
        let duration_ms = room.complete();
        let winner = outcome
            .winning_seat()
            .and_then(|seat| room.occupant(seat))
            .map(|slot| slot.user_id.clone());

        self.broadcast_to_room(
            room,
            Arc::new(ServerEvent::GameEnded(Box::new(GameEndedPayload {
                outcome,
                winner: winner.clone(),
                final_score: room.score,
                duration_ms,
                match_id: room.match_id,
            }))),
            None,
        );
        self.metrics.increment_matches_finished();

        if room.is_empty() {
            room.status = RoomStatus::Disposing;
            self.schedule_dispose(handle.clone());
        } else if status == MatchStatus::Finished {
            room.rematch.timer_active = true;
            self.spawn_rematch_timer(handle.clone());
        }

        FinishPlan {
            room_id: room.id,
            code: room.code.clone(),
            match_id: room.match_id,
            status,
            result: crate::store::MatchResult {
                winner_user_id: winner,
                outcome,
                final_score: room.score,
                duration_ms,
            },
        }
    }

    /// Delete a room after the configured grace period.
    pub(super) fn schedule_dispose(self: &Arc<Self>, handle: Arc<RoomHandle>) {
        let server = Arc::clone(self);
        let grace = self.config.dispose_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            server.dispose_room(&handle).await;
        });
    }

    /// Tear a room down: cancel its tasks, unseat its occupants, and drop
    /// it from the registry. Safe to call more than once.
    pub(super) async fn dispose_room(self: &Arc<Self>, handle: &Arc<RoomHandle>) {
        handle.cancel_ticker();
        handle.cancel_rematch_timer();

        let (room_id, code, occupants) = {
            let mut room = handle.room.lock().await;
            room.status = RoomStatus::Disposing;
            let occupants: Vec<SessionId> = room
                .seat_snapshot()
                .into_iter()
                .map(|(_, slot, _)| slot.session_id)
                .collect();
            (room.id, room.code.clone(), occupants)
        };

        for session_id in occupants {
            self.sessions.clear_room(&session_id);
        }

        if self.rooms.remove(&room_id, &code).is_some() {
            self.metrics.increment_rooms_disposed();
            tracing::info!(%room_id, %code, instance_id = %self.instance_id, "Room disposed");
        }
    }

    /// Shutdown path: finalize a playing room as abandoned, then dispose.
    pub(super) async fn abort_room_for_shutdown(self: &Arc<Self>, handle: &Arc<RoomHandle>) {
        let plan = {
            let mut room = handle.room.lock().await;
            (room.status == RoomStatus::Playing).then(|| {
                self.finish_locked(handle, &mut room, None, MatchStatus::Abandoned)
            })
        };
        if let Some(plan) = plan {
            self.persist_finish(plan).await;
        }
        self.dispose_room(handle).await;
    }
}
