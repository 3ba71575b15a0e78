use serde::{Deserialize, Serialize};

use super::error_codes::ErrorCode;
use super::types::{LeaveReason, MatchId, MatchOutcome, RoomId, Score, Seat, SessionId, UserId};

/// Message types sent from client to server.
///
/// Wire shape is `{"type": "<kind>", "data": {...}}` with camelCase payload
/// keys, matching what browser clients produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Place this session into an open room, or create one.
    FindMatch,
    /// Create a new private room; the response carries its join code.
    CreateRoom,
    /// Join a specific room by its share code (case-insensitive).
    JoinByCode { code: String },
    /// Leave the current room.
    Leave,
    /// Toggle or set readiness while the room is waiting.
    /// With no payload the flag toggles; with a payload it is set.
    Ready {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ready: Option<bool>,
    },
    /// Own paddle position/velocity. Must carry the sender's seat.
    PlayerPosition {
        seat: Seat,
        x: f32,
        y: f32,
        vx: f32,
        vy: f32,
    },
    /// Ball position/velocity. Only accepted from the ball-authority seat.
    BallState { x: f32, y: f32, vx: f32, vy: f32 },
    /// Goal report. Only accepted from the ball-authority seat.
    Goal { scoring_seat: Seat },
    /// Ask for a rematch while the room is finished.
    RequestRematch,
    /// Decline a rematch; the room is disposed shortly after.
    DeclineRematch,
    /// Heartbeat to keep the connection warm.
    Ping,
}

impl ClientEvent {
    /// Stable kind string, used in logs and state-gating errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FindMatch => "find_match",
            Self::CreateRoom => "create_room",
            Self::JoinByCode { .. } => "join_by_code",
            Self::Leave => "leave",
            Self::Ready { .. } => "ready",
            Self::PlayerPosition { .. } => "player_position",
            Self::BallState { .. } => "ball_state",
            Self::Goal { .. } => "goal",
            Self::RequestRematch => "request_rematch",
            Self::DeclineRematch => "decline_rematch",
            Self::Ping => "ping",
        }
    }
}

/// Occupant summary embedded in `room_joined`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatInfo {
    pub seat: Seat,
    pub user_id: UserId,
    pub ready: bool,
}

/// Payload for the RoomJoined server event.
/// Boxed in ServerEvent to reduce enum size.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoinedPayload {
    pub room_id: RoomId,
    pub code: String,
    /// The seat assigned to the recipient.
    pub seat: Seat,
    pub seats: Vec<SeatInfo>,
}

/// Payload for the GameEnded server event.
/// Boxed in ServerEvent to reduce enum size.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEndedPayload {
    pub outcome: MatchOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<UserId>,
    pub final_score: Score,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<MatchId>,
}

/// Message types sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// First event after a successful attach.
    Welcome {
        session_id: SessionId,
        authenticated: bool,
    },
    /// Successfully joined a room (boxed to reduce enum size).
    RoomJoined(Box<RoomJoinedPayload>),
    /// Join failed because both seats are taken.
    RoomFull { room_id: RoomId },
    /// The opposing player joined the room.
    PlayerJoined { seat: Seat },
    /// The opposing player left the room.
    PlayerLeft { seat: Seat, reason: LeaveReason },
    /// A seat's readiness changed.
    PlayerReadyState {
        seat: Seat,
        ready: bool,
        all_ready: bool,
    },
    /// Both players readied up; the match is live.
    GameStarted {
        #[serde(skip_serializing_if = "Option::is_none")]
        match_id: Option<MatchId>,
        duration_ms: u64,
    },
    /// Relayed opponent position.
    PlayerPosition {
        seat: Seat,
        x: f32,
        y: f32,
        vx: f32,
        vy: f32,
    },
    /// Relayed ball state from the ball-authority.
    BallState { x: f32, y: f32, vx: f32, vy: f32 },
    /// A goal was accepted and the score advanced.
    GoalScored { scorer: Seat, score: Score },
    /// Periodic remaining-time update (whole-second cadence).
    TimerUpdate { time_remaining_ms: u64 },
    /// One-shot warning at a configured threshold (seconds).
    TimerWarning { threshold: u64 },
    /// The match clock reached zero.
    TimeUp {},
    /// The match is over (boxed to reduce enum size).
    GameEnded(Box<GameEndedPayload>),
    /// The opposing player asked for a rematch.
    RematchRequested { seat: Seat },
    /// Both players agreed; the room has been reset to waiting.
    RematchConfirmed {},
    /// A player declined the rematch; the room will be disposed.
    RematchDeclined { seat: Seat },
    /// Nobody agreed within the rematch window; the room will be disposed.
    RematchTimeout {},
    /// Graceful shutdown notification; the session will be closed.
    ServerShutdown {},
    /// Pong response to ping.
    Pong,
    /// Error event; `code` is the stable machine-readable contract.
    Error { code: ErrorCode, message: String },
}

impl ServerEvent {
    /// Build an error event from a code, reusing its canonical description.
    pub fn error(code: ErrorCode) -> Self {
        Self::Error {
            code,
            message: code.description().to_string(),
        }
    }

    /// Build an error event with a context-specific message.
    pub fn error_with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }
}
