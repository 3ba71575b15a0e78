use std::sync::Arc;

use super::MatchServer;
use crate::protocol::{validation, ErrorCode, Seat, ServerEvent, SessionId};

impl MatchServer {
    /// `player_position`: validate seat ownership and the advisory movement
    /// cap, then relay to the opponent.
    pub(super) async fn handle_player_position(
        &self,
        session_id: &SessionId,
        claimed_seat: Seat,
        x: f32,
        y: f32,
        vx: f32,
        vy: f32,
    ) {
        let Some((room_id, seat)) = self.sessions.room_of(session_id) else {
            tracing::debug!(%session_id, "Dropping position from seatless session");
            return;
        };
        let Some(handle) = self.rooms.get(&room_id) else {
            return;
        };

        let mut room = handle.room.lock().await;
        if !validation::kind_permitted_in("player_position", room.status) {
            self.send_error_to_session(session_id, ErrorCode::BadState);
            return;
        }

        // Seat ownership: never rewrite, never relay, log the attempt.
        if claimed_seat != seat {
            self.metrics.increment_anti_cheat_drops();
            tracing::warn!(
                %session_id,
                %room_id,
                claimed = %claimed_seat,
                actual = %seat,
                "Anti-cheat: position carried a foreign seat; dropped"
            );
            return;
        }

        if !room.accept_position(seat, x, y, self.config.max_position_delta) {
            self.metrics.increment_anti_cheat_drops();
            tracing::debug!(
                %session_id,
                %room_id,
                %seat,
                "Position delta exceeded the per-message cap; dropped"
            );
            return;
        }

        self.broadcast_to_room(
            &room,
            Arc::new(ServerEvent::PlayerPosition { seat, x, y, vx, vy }),
            Some(session_id),
        );
    }

    /// `ball_state`: only the ball-authority seat may assert ball state.
    pub(super) async fn handle_ball_state(
        &self,
        session_id: &SessionId,
        x: f32,
        y: f32,
        vx: f32,
        vy: f32,
    ) {
        let Some((room_id, seat)) = self.sessions.room_of(session_id) else {
            tracing::debug!(%session_id, "Dropping ball state from seatless session");
            return;
        };
        let Some(handle) = self.rooms.get(&room_id) else {
            return;
        };

        let room = handle.room.lock().await;
        if !validation::kind_permitted_in("ball_state", room.status) {
            self.send_error_to_session(session_id, ErrorCode::BadState);
            return;
        }
        if seat != room.ball_authority {
            self.metrics.increment_anti_cheat_drops();
            tracing::warn!(
                %session_id,
                %room_id,
                %seat,
                authority = %room.ball_authority,
                "Anti-cheat: ball state from non-authority seat; dropped"
            );
            self.send_error_to_session(session_id, ErrorCode::UnauthorizedBallUpdate);
            return;
        }

        self.broadcast_to_room(
            &room,
            Arc::new(ServerEvent::BallState { x, y, vx, vy }),
            Some(session_id),
        );
    }

    /// `goal`: only the ball-authority seat may report goals; the scoring
    /// seat may be either side. Scoring is authoritative here.
    pub(super) async fn handle_goal(&self, session_id: &SessionId, scoring_seat: Seat) {
        let Some((room_id, seat)) = self.sessions.room_of(session_id) else {
            tracing::debug!(%session_id, "Dropping goal from seatless session");
            return;
        };
        let Some(handle) = self.rooms.get(&room_id) else {
            return;
        };

        let mut room = handle.room.lock().await;
        if !validation::kind_permitted_in("goal", room.status) {
            self.send_error_to_session(session_id, ErrorCode::BadState);
            return;
        }
        if seat != room.ball_authority {
            self.metrics.increment_anti_cheat_drops();
            tracing::warn!(
                %session_id,
                %room_id,
                %seat,
                authority = %room.ball_authority,
                "Anti-cheat: goal report from non-authority seat; dropped"
            );
            self.send_error_to_session(session_id, ErrorCode::UnauthorizedGoal);
            return;
        }

        let score = room.record_goal(scoring_seat);
        self.metrics.increment_goals_scored();
        tracing::info!(
            %room_id,
            code = %room.code,
            scorer = %scoring_seat,
            score_p1 = score.p1,
            score_p2 = score.p2,
            "Goal"
        );

        self.broadcast_to_room(
            &room,
            Arc::new(ServerEvent::GoalScored {
                scorer: scoring_seat,
                score,
            }),
            None,
        );
    }
}
