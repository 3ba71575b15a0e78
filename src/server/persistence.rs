use super::MatchServer;
use crate::protocol::{MatchId, RoomId};
use crate::store::{MatchPlayer, MatchResult, MatchStatus};

/// Snapshot taken under the room serializer at finish time. Persistence
/// I/O runs against this after the lock is released; the lock is never
/// held across a repo call.
#[derive(Debug)]
pub(super) struct FinishPlan {
    pub room_id: RoomId,
    pub code: String,
    pub match_id: Option<MatchId>,
    pub status: MatchStatus,
    pub result: MatchResult,
}

impl MatchServer {
    /// Create the durable match record before `game_started` goes out.
    /// Failure is logged and does not block the start: the room plays
    /// without persistence.
    pub(super) async fn create_match_record(&self, players: Vec<MatchPlayer>) -> Option<MatchId> {
        match self.matches.create_match(players).await {
            Ok(match_id) => Some(match_id),
            Err(err) => {
                tracing::error!(
                    error = %err,
                    "Failed to create match record; match proceeds without persistence"
                );
                None
            }
        }
    }

    /// Write the final result exactly once, then derive per-user stat
    /// deltas from the persisted participant list (the leaver of a
    /// mid-game abort still takes their loss).
    pub(super) async fn persist_finish(&self, plan: FinishPlan) {
        let Some(match_id) = plan.match_id else {
            tracing::warn!(
                room_id = %plan.room_id,
                code = %plan.code,
                "Match finished without a persisted record; skipping finalization"
            );
            return;
        };

        let applied = match self
            .matches
            .finalize_match(&match_id, plan.status, plan.result.clone())
            .await
        {
            Ok(applied) => applied,
            Err(err) => {
                tracing::error!(
                    %match_id,
                    room_id = %plan.room_id,
                    error = %err,
                    "Failed to finalize match record"
                );
                return;
            }
        };

        if !applied {
            tracing::debug!(%match_id, "Match already finalized; skipping stat deltas");
            return;
        }

        // Only completed matches move player stats; abandoned ones keep
        // the record but stay out of win/loss/draw tallies.
        if plan.status != MatchStatus::Finished {
            return;
        }

        tracing::info!(
            %match_id,
            room_id = %plan.room_id,
            code = %plan.code,
            outcome = ?plan.result.outcome,
            score_p1 = plan.result.final_score.p1,
            score_p2 = plan.result.final_score.p2,
            duration_ms = plan.result.duration_ms,
            "Match finalized"
        );

        let record = match self.matches.get_match(&match_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::error!(%match_id, "Finalized match record disappeared");
                return;
            }
            Err(err) => {
                tracing::error!(%match_id, error = %err, "Failed to re-read match record");
                return;
            }
        };

        // Stats are eventually consistent: failures are logged, never
        // surfaced to clients, and never alter the game outcome.
        for player in &record.players {
            let outcome = plan.result.outcome.for_seat(player.seat);
            if let Err(err) = self.users.record_outcome(&player.user_id, outcome).await {
                tracing::warn!(
                    user_id = %player.user_id,
                    %match_id,
                    error = %err,
                    "Failed to update user stats"
                );
            }
        }
    }
}
