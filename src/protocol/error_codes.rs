use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for structured error handling.
///
/// These are stable strings on the wire (`snake_case`); clients branch on
/// the code, not on the human-readable message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Identity errors
    AuthRequired,
    AuthInvalid,
    AlreadyConnected,

    // Registry errors
    NotInRoom,
    AlreadyInRoom,
    RoomFull,
    RoomNotFound,
    BadCode,

    // State machine errors
    BadState,

    // Anti-cheat drops
    SeatSpoof,
    UnauthorizedBallUpdate,
    UnauthorizedGoal,

    // Session faults
    Overloaded,
    MessageTooLarge,
    InvalidPayload,
    ServerShutdown,

    // Server errors
    InternalError,
}

impl ErrorCode {
    /// Returns a human-readable description of this error code.
    ///
    /// Messages are written for SDK developers; the code itself is the
    /// machine-readable contract.
    pub fn description(&self) -> &'static str {
        match self {
            Self::AuthRequired => {
                "Authentication is required. Provide a token via the `token` query parameter, a Bearer header, or the authToken cookie."
            }
            Self::AuthInvalid => {
                "The authentication token is invalid, malformed, or has expired. Obtain a new token and reconnect."
            }
            Self::AlreadyConnected => {
                "This user already has an active session. Close the existing connection before opening a new one."
            }
            Self::NotInRoom => {
                "You are not currently in a room. Join or create a room before performing this action."
            }
            Self::AlreadyInRoom => {
                "You are already seated in a room. Leave the current room before joining another."
            }
            Self::RoomFull => {
                "Both seats in this room are taken. Try a different room or use matchmaking."
            }
            Self::RoomNotFound => {
                "The requested room could not be found. It may have been disposed."
            }
            Self::BadCode => {
                "No live room matches that code. Codes expire when their room is disposed."
            }
            Self::BadState => {
                "The room's current state does not permit this action."
            }
            Self::SeatSpoof => {
                "The message carried a seat that is not yours. The message was dropped."
            }
            Self::UnauthorizedBallUpdate => {
                "Only the ball-authority seat may assert ball state. The update was dropped."
            }
            Self::UnauthorizedGoal => {
                "Only the ball-authority seat may report goals. The goal was dropped."
            }
            Self::Overloaded => {
                "Your outgoing event queue overflowed and the session was closed. Reconnect with a faster consumer."
            }
            Self::MessageTooLarge => {
                "The message size exceeds the maximum allowed limit. Send a smaller message."
            }
            Self::InvalidPayload => {
                "The message could not be parsed. Check the kind string and payload shape."
            }
            Self::ServerShutdown => {
                "The server is shutting down. In-progress matches have been finalized."
            }
            Self::InternalError => {
                "An internal server error occurred. Please try again."
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_error_codes_have_descriptions() {
        let error_codes = [
            ErrorCode::AuthRequired,
            ErrorCode::AuthInvalid,
            ErrorCode::AlreadyConnected,
            ErrorCode::NotInRoom,
            ErrorCode::AlreadyInRoom,
            ErrorCode::RoomFull,
            ErrorCode::RoomNotFound,
            ErrorCode::BadCode,
            ErrorCode::BadState,
            ErrorCode::SeatSpoof,
            ErrorCode::UnauthorizedBallUpdate,
            ErrorCode::UnauthorizedGoal,
            ErrorCode::Overloaded,
            ErrorCode::MessageTooLarge,
            ErrorCode::InvalidPayload,
            ErrorCode::ServerShutdown,
            ErrorCode::InternalError,
        ];

        for error_code in &error_codes {
            let description = error_code.description();
            assert!(
                description.len() > 10,
                "ErrorCode::{:?} has suspiciously short description: '{}'",
                error_code,
                description
            );
        }
    }

    #[test]
    fn test_serialization_is_stable_snake_case() {
        // The wire format is part of the protocol contract
        assert_eq!(
            serde_json::to_string(&ErrorCode::AuthRequired).unwrap(),
            "\"auth_required\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::UnauthorizedBallUpdate).unwrap(),
            "\"unauthorized_ball_update\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::BadCode).unwrap(),
            "\"bad_code\""
        );
    }

    #[test]
    fn test_display_uses_description() {
        let error = ErrorCode::RoomNotFound;
        assert_eq!(format!("{}", error), error.description());
    }
}
