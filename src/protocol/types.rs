use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Default constants for validation (can be overridden by config)
/// These are used when no config is available
pub const DEFAULT_ROOM_CODE_LENGTH: usize = 6;
#[allow(dead_code)]
pub const DEFAULT_MATCH_DURATION_MS: u64 = 60_000;
#[allow(dead_code)]
pub const DEFAULT_TICK_MS: u64 = 100;

/// Unique identifier for sessions (one per transport connection)
pub type SessionId = Uuid;
/// Unique identifier for rooms
pub type RoomId = Uuid;
/// Unique identifier for persisted matches
pub type MatchId = Uuid;
/// Opaque, stable user identifier minted by the external auth provider
pub type UserId = String;

/// One of the two roles in a room. `P1` is always the first occupant and
/// the default ball-authority; the mapping is constant within a match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Seat {
    P1,
    P2,
}

impl Seat {
    /// Both seats, in assignment order.
    pub const BOTH: [Seat; 2] = [Seat::P1, Seat::P2];

    /// The opposing seat.
    pub fn other(self) -> Seat {
        match self {
            Seat::P1 => Seat::P2,
            Seat::P2 => Seat::P1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Seat::P1 => "p1",
            Seat::P2 => "p2",
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-seat goal tally.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Score {
    pub p1: u32,
    pub p2: u32,
}

impl Score {
    pub fn get(&self, seat: Seat) -> u32 {
        match seat {
            Seat::P1 => self.p1,
            Seat::P2 => self.p2,
        }
    }

    pub fn increment(&mut self, seat: Seat) {
        match seat {
            Seat::P1 => self.p1 += 1,
            Seat::P2 => self.p2 += 1,
        }
    }
}

/// Final outcome of a match, as persisted and broadcast.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    P1Wins,
    P2Wins,
    Draw,
}

impl MatchOutcome {
    /// The winning seat, if any.
    pub fn winning_seat(self) -> Option<Seat> {
        match self {
            MatchOutcome::P1Wins => Some(Seat::P1),
            MatchOutcome::P2Wins => Some(Seat::P2),
            MatchOutcome::Draw => None,
        }
    }

    /// Outcome implied by a final score with both seats still occupied.
    pub fn from_score(score: Score) -> Self {
        match score.p1.cmp(&score.p2) {
            std::cmp::Ordering::Greater => MatchOutcome::P1Wins,
            std::cmp::Ordering::Less => MatchOutcome::P2Wins,
            std::cmp::Ordering::Equal => MatchOutcome::Draw,
        }
    }

    /// Outcome from a single seat's perspective (for stat deltas).
    pub fn for_seat(self, seat: Seat) -> SeatOutcome {
        match self.winning_seat() {
            Some(winner) if winner == seat => SeatOutcome::Win,
            Some(_) => SeatOutcome::Loss,
            None => SeatOutcome::Draw,
        }
    }
}

/// A match outcome projected onto one participant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SeatOutcome {
    Win,
    Loss,
    Draw,
}

/// Verified caller identity, produced by the identity gate on attach.
/// Immutable for the lifetime of the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    /// Lowercase hex address (`0x` + 40 hex chars).
    pub wallet_address: String,
}

/// Describes why a player left a room.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeaveReason {
    #[default]
    VoluntaryLeave,
    Disconnected,
    Overloaded,
    RoomClosed,
    ServerShutdown,
}

/// Last accepted position for a seat, kept for the advisory anti-cheat
/// delta cap. The server validates but never simulates positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    /// L-infinity distance between two positions.
    pub fn linf_distance(self, other: Position) -> f32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}
