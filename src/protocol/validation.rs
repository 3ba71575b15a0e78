use super::events::ClientEvent;
use super::room_state::RoomStatus;

/// Whether a message kind is permitted while the room is in `status`.
///
/// Room-less kinds (`find_match`, `create_room`, `join_by_code`, `ping`)
/// are gated by the session registry; this table covers the kinds that
/// require a seat. Handlers consult it under the room serializer, so the
/// answer cannot go stale between check and use.
pub fn kind_permitted(event: &ClientEvent, status: RoomStatus) -> bool {
    kind_permitted_in(event.kind(), status)
}

/// Kind-name variant of [`kind_permitted`], for call sites that already
/// destructured the event.
pub fn kind_permitted_in(kind: &str, status: RoomStatus) -> bool {
    match kind {
        "ready" => status == RoomStatus::Waiting,
        "player_position" | "ball_state" | "goal" => status == RoomStatus::Playing,
        "request_rematch" | "decline_rematch" => status == RoomStatus::Finished,
        // Leaving is legal from any seated state.
        _ => true,
    }
}

/// Validate the shape of a wallet address: `0x` + 40 lowercase hex chars.
pub fn validate_wallet_address(address: &str) -> Result<(), String> {
    let Some(hex) = address.strip_prefix("0x") else {
        return Err("Wallet address must start with 0x".to_string());
    };
    if hex.len() != 40 {
        return Err("Wallet address must be 0x followed by 40 hex characters".to_string());
    }
    if !hex
        .chars()
        .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    {
        return Err("Wallet address must be lowercase hex".to_string());
    }
    Ok(())
}

/// Validate a user-supplied room code after normalization.
pub fn validate_room_code(code: &str, expected_length: usize) -> Result<(), String> {
    if code.is_empty() {
        return Err("Room code cannot be empty".to_string());
    }
    if code.len() != expected_length {
        return Err(format!(
            "Room code must be exactly {expected_length} characters"
        ));
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("Room code must be alphanumeric".to_string());
    }
    Ok(())
}
