use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::types::{MatchId, MatchOutcome, Position, RoomId, Score, Seat, SessionId, UserId};

// ============================================================================
// ROOM LIFECYCLE
// ============================================================================
//
// Rooms progress through four states:
//
// ```text
// [*] --> Waiting: Room Created
//
// Waiting --> Waiting:  Join / Ready toggle / Leave (seat freed)
// Waiting --> Playing:  Both seats occupied and both ready
// Playing --> Finished: Timer expired, or a player left mid-game
// Finished --> Waiting: Both players requested a rematch (same seats)
// Finished --> Disposing: Rematch declined or rematch window expired
//
// Waiting --> [*]:   Room emptied
// Disposing --> [*]: Deleted after a short grace period
// ```
//
// The first occupant takes `p1`, the second `p2`. `p1` is the ball-authority
// and the assignment does not change within a match. All mutation happens
// under the room's serializer; the methods here are pure state transitions
// with no side effects; persistence, tickers and broadcasts are driven by
// the caller based on the returned values.
// ============================================================================

/// Room lifecycle state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    #[default]
    Waiting,
    Playing,
    Finished,
    Disposing,
}

/// An occupied seat. Rooms index sessions by id rather than holding any
/// session handle; lookups go through the session registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatSlot {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub wallet_address: String,
}

/// Rematch negotiation flags for a finished room.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RematchState {
    pub p1_requested: bool,
    pub p2_requested: bool,
    pub timer_active: bool,
}

impl RematchState {
    pub fn requested(&self, seat: Seat) -> bool {
        match seat {
            Seat::P1 => self.p1_requested,
            Seat::P2 => self.p2_requested,
        }
    }

    fn set_requested(&mut self, seat: Seat) {
        match seat {
            Seat::P1 => self.p1_requested = true,
            Seat::P2 => self.p2_requested = true,
        }
    }

    pub fn both_requested(&self) -> bool {
        self.p1_requested && self.p2_requested
    }
}

/// What a single clock tick produced. The caller turns these into
/// broadcasts and, when `time_up` is set, runs the finish transition.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Remaining time to announce, present on whole-second crossings.
    pub timer_update: Option<u64>,
    /// Warning thresholds crossed this tick, in seconds.
    pub warnings: SmallVec<[u64; 2]>,
    /// The clock reached zero on this tick.
    pub time_up: bool,
}

/// Room state. The unit of concurrency: every field is mutated only while
/// the owning `RoomHandle`'s serializer is held.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    /// Six-character share code, unique among live rooms.
    pub code: String,
    pub status: RoomStatus,
    seats: [Option<SeatSlot>; 2],
    ready: [bool; 2],
    pub score: Score,
    pub time_remaining_ms: u64,
    pub match_duration_ms: u64,
    /// Constant within a match; `p1` by default and never reassigned.
    pub ball_authority: Seat,
    pub match_id: Option<MatchId>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_goal: Option<Seat>,
    pub rematch: RematchState,
    /// Last accepted position per seat, for the advisory delta cap.
    last_position: [Option<Position>; 2],
    /// Warning thresholds (ms) already announced this match.
    warned_thresholds: SmallVec<[u64; 2]>,
}

fn seat_index(seat: Seat) -> usize {
    match seat {
        Seat::P1 => 0,
        Seat::P2 => 1,
    }
}

impl Room {
    pub fn new(code: String, match_duration_ms: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            code,
            status: RoomStatus::Waiting,
            seats: [None, None],
            ready: [false, false],
            score: Score::default(),
            time_remaining_ms: match_duration_ms,
            match_duration_ms,
            ball_authority: Seat::P1,
            match_id: None,
            created_at: chrono::Utc::now(),
            started_at: None,
            ended_at: None,
            last_goal: None,
            rematch: RematchState::default(),
            last_position: [None, None],
            warned_thresholds: SmallVec::new(),
        }
    }

    pub fn occupant(&self, seat: Seat) -> Option<&SeatSlot> {
        self.seats[seat_index(seat)].as_ref()
    }

    /// The seat held by a session, if any.
    pub fn seat_of(&self, session_id: &SessionId) -> Option<Seat> {
        Seat::BOTH
            .into_iter()
            .find(|seat| self.occupant(*seat).is_some_and(|s| s.session_id == *session_id))
    }

    pub fn occupied_count(&self) -> usize {
        self.seats.iter().flatten().count()
    }

    pub fn is_full(&self) -> bool {
        self.occupied_count() == 2
    }

    pub fn is_empty(&self) -> bool {
        self.occupied_count() == 0
    }

    /// Claim the lowest free seat for the given occupant.
    /// Returns `None` when both seats are taken.
    pub fn claim_seat(&mut self, slot: SeatSlot) -> Option<Seat> {
        for seat in Seat::BOTH {
            let idx = seat_index(seat);
            if self.seats[idx].is_none() {
                self.seats[idx] = Some(slot);
                return Some(seat);
            }
        }
        None
    }

    /// Free a seat, clearing every per-seat flag tied to it.
    pub fn release_seat(&mut self, seat: Seat) -> Option<SeatSlot> {
        let idx = seat_index(seat);
        self.ready[idx] = false;
        self.last_position[idx] = None;
        match seat {
            Seat::P1 => self.rematch.p1_requested = false,
            Seat::P2 => self.rematch.p2_requested = false,
        }
        self.seats[idx].take()
    }

    pub fn is_ready(&self, seat: Seat) -> bool {
        self.ready[seat_index(seat)]
    }

    /// Apply a readiness request: `Some` sets, `None` toggles.
    /// Returns the new value.
    pub fn apply_ready(&mut self, seat: Seat, requested: Option<bool>) -> bool {
        let idx = seat_index(seat);
        let new_value = requested.unwrap_or(!self.ready[idx]);
        self.ready[idx] = new_value;
        new_value
    }

    pub fn all_ready(&self) -> bool {
        self.is_full() && self.ready.iter().all(|r| *r)
    }

    /// Start predicate: both seats occupied, both ready, still waiting.
    pub fn can_start(&self) -> bool {
        self.status == RoomStatus::Waiting && self.all_ready()
    }

    /// Run the start transition. Ready flags are cleared here so a later
    /// rematch requires a fresh ready-up.
    pub fn begin_match(&mut self) {
        debug_assert!(self.can_start());
        self.status = RoomStatus::Playing;
        self.score = Score::default();
        self.time_remaining_ms = self.match_duration_ms;
        self.started_at = Some(chrono::Utc::now());
        self.ended_at = None;
        self.ready = [false, false];
        self.last_goal = None;
        self.last_position = [None, None];
        self.warned_thresholds.clear();
    }

    /// Advance the match clock by one tick.
    ///
    /// `warning_thresholds_ms` lists the one-shot warning marks, largest
    /// first (e.g. `[30_000, 10_000]`).
    pub fn tick(&mut self, dt_ms: u64, warning_thresholds_ms: &[u64]) -> TickOutcome {
        let before = self.time_remaining_ms;
        let after = before.saturating_sub(dt_ms);
        self.time_remaining_ms = after;

        let mut outcome = TickOutcome::default();
        // Updates land on whole-second values; config validation guarantees
        // the tick divides one second.
        if after % 1000 == 0 && after != before {
            outcome.timer_update = Some(after);
        }
        for &threshold in warning_thresholds_ms {
            if before > threshold
                && after <= threshold
                && !self.warned_thresholds.contains(&threshold)
            {
                self.warned_thresholds.push(threshold);
                outcome.warnings.push(threshold / 1000);
            }
        }
        outcome.time_up = after == 0 && before > 0;
        outcome
    }

    /// Milliseconds of play consumed so far, derived from the tick clock so
    /// it stays consistent with what clients observed.
    pub fn elapsed_play_ms(&self) -> u64 {
        self.match_duration_ms.saturating_sub(self.time_remaining_ms)
    }

    /// Record an accepted goal and return the new score.
    /// Position tracking resets: clients re-centre after a goal.
    pub fn record_goal(&mut self, scoring_seat: Seat) -> Score {
        self.score.increment(scoring_seat);
        self.last_goal = Some(scoring_seat);
        self.last_position = [None, None];
        self.score
    }

    /// Advisory anti-cheat cap: accept the position unless its L-infinity
    /// distance from the last accepted one exceeds `max_delta`.
    pub fn accept_position(&mut self, seat: Seat, x: f32, y: f32, max_delta: f32) -> bool {
        let idx = seat_index(seat);
        let next = Position { x, y };
        if let Some(last) = self.last_position[idx] {
            if last.linf_distance(next) > max_delta {
                return false;
            }
        }
        self.last_position[idx] = Some(next);
        true
    }

    /// Final outcome at finish time. `forced_winner` is the remaining seat
    /// when the other one was vacated mid-game; it wins regardless of score.
    pub fn finish_outcome(&self, forced_winner: Option<Seat>) -> MatchOutcome {
        match forced_winner {
            Some(Seat::P1) => MatchOutcome::P1Wins,
            Some(Seat::P2) => MatchOutcome::P2Wins,
            None => MatchOutcome::from_score(self.score),
        }
    }

    /// Run the finish transition. Returns the play duration in ms.
    pub fn complete(&mut self) -> u64 {
        self.status = RoomStatus::Finished;
        self.ended_at = Some(chrono::Utc::now());
        self.elapsed_play_ms()
    }

    /// Record a rematch request; returns true once both seats have asked.
    pub fn request_rematch(&mut self, seat: Seat) -> bool {
        self.rematch.set_requested(seat);
        self.rematch.both_requested()
    }

    /// Reset a finished room back to `Waiting` with the same occupants.
    /// Ball authority is preserved; everything match-scoped is cleared so
    /// the room is indistinguishable from a freshly created one.
    pub fn reset_for_rematch(&mut self) {
        self.status = RoomStatus::Waiting;
        self.score = Score::default();
        self.time_remaining_ms = self.match_duration_ms;
        self.ready = [false, false];
        self.rematch = RematchState::default();
        self.match_id = None;
        self.started_at = None;
        self.ended_at = None;
        self.last_goal = None;
        self.last_position = [None, None];
        self.warned_thresholds.clear();
    }

    /// Occupant snapshots in seat order, for payloads and persistence.
    pub fn seat_snapshot(&self) -> Vec<(Seat, SeatSlot, bool)> {
        Seat::BOTH
            .into_iter()
            .filter_map(|seat| {
                self.occupant(seat)
                    .map(|slot| (seat, slot.clone(), self.is_ready(seat)))
            })
            .collect()
    }
}
