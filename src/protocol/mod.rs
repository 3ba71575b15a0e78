// Protocol module: wire events, validation, and room state management

pub mod error_codes;
pub mod events;
pub mod room_codes;
pub mod room_state;
pub mod types;
pub mod validation;

// Re-export everything for backward compatibility
// This allows external code to use `use crate::protocol::*`

// From error_codes
pub use error_codes::ErrorCode;

// From types
pub use types::{
    LeaveReason, MatchId, MatchOutcome, Position, Principal, RoomId, Score, Seat, SeatOutcome,
    SessionId, UserId, DEFAULT_ROOM_CODE_LENGTH,
};

// From events
pub use events::{ClientEvent, GameEndedPayload, RoomJoinedPayload, SeatInfo, ServerEvent};

// From room_state
pub use room_state::{RematchState, Room, RoomStatus, SeatSlot, TickOutcome};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn slot(user: &str) -> SeatSlot {
        SeatSlot {
            session_id: Uuid::new_v4(),
            user_id: user.to_string(),
            wallet_address: format!("0x{:040x}", user.len()),
        }
    }

    fn full_room() -> Room {
        let mut room = Room::new("K7QR9P".to_string(), 60_000);
        room.claim_seat(slot("userA"));
        room.claim_seat(slot("userB"));
        room
    }

    fn playing_room() -> Room {
        let mut room = full_room();
        room.apply_ready(Seat::P1, Some(true));
        room.apply_ready(Seat::P2, Some(true));
        room.begin_match();
        room
    }

    #[test]
    fn test_seat_assignment_order() {
        let mut room = Room::new("ABCDEF".to_string(), 60_000);
        assert!(room.is_empty());

        let first = slot("first");
        let second = slot("second");
        let first_session = first.session_id;

        assert_eq!(room.claim_seat(first), Some(Seat::P1));
        assert_eq!(room.claim_seat(second), Some(Seat::P2));
        assert!(room.is_full());
        assert_eq!(room.claim_seat(slot("third")), None);

        assert_eq!(room.seat_of(&first_session), Some(Seat::P1));
        assert_eq!(room.ball_authority, Seat::P1);
    }

    #[test]
    fn test_seat_reclaimed_after_release() {
        let mut room = full_room();
        room.release_seat(Seat::P1);
        assert!(!room.is_full());

        // The next joiner takes the freed p1 seat and with it ball authority.
        assert_eq!(room.claim_seat(slot("userC")), Some(Seat::P1));
    }

    #[test]
    fn test_ready_toggle_round_trip() {
        let mut room = full_room();

        assert!(room.apply_ready(Seat::P1, None));
        assert!(!room.apply_ready(Seat::P1, None));
        assert!(!room.is_ready(Seat::P1));
        assert!(!room.can_start());
    }

    #[test]
    fn test_start_requires_both_seats_and_both_ready() {
        let mut room = Room::new("ABCDEF".to_string(), 60_000);
        room.claim_seat(slot("solo"));
        room.apply_ready(Seat::P1, Some(true));
        // One occupant, even ready, never satisfies the start predicate.
        assert!(!room.can_start());

        room.claim_seat(slot("other"));
        assert!(!room.can_start());
        room.apply_ready(Seat::P2, Some(true));
        assert!(room.can_start());
    }

    #[test]
    fn test_begin_match_resets_match_scoped_state() {
        let mut room = full_room();
        room.apply_ready(Seat::P1, Some(true));
        room.apply_ready(Seat::P2, Some(true));
        room.begin_match();

        assert_eq!(room.status, RoomStatus::Playing);
        assert_eq!(room.score, Score::default());
        assert_eq!(room.time_remaining_ms, 60_000);
        assert!(room.started_at.is_some());
        // Ready flags are consumed by the start so a rematch needs a fresh ready-up.
        assert!(!room.is_ready(Seat::P1));
        assert!(!room.is_ready(Seat::P2));
    }

    #[test]
    fn test_tick_emits_whole_second_updates() {
        let mut room = playing_room();

        // 100ms ticks: the first nine stay within the same second.
        for _ in 0..9 {
            let outcome = room.tick(100, &[30_000, 10_000]);
            assert_eq!(outcome.timer_update, None);
            assert!(!outcome.time_up);
        }
        let outcome = room.tick(100, &[30_000, 10_000]);
        assert_eq!(outcome.timer_update, Some(59_000));
    }

    #[test]
    fn test_tick_monotone_and_clamped() {
        let mut room = playing_room();
        let mut previous = room.time_remaining_ms;
        loop {
            let outcome = room.tick(100, &[30_000, 10_000]);
            assert!(room.time_remaining_ms <= previous);
            previous = room.time_remaining_ms;
            if outcome.time_up {
                break;
            }
        }
        assert_eq!(room.time_remaining_ms, 0);
        // A stray extra tick must not underflow or re-announce warnings.
        let outcome = room.tick(100, &[30_000, 10_000]);
        assert_eq!(room.time_remaining_ms, 0);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_timer_warnings_fire_once() {
        let mut room = playing_room();
        let thresholds = [30_000, 10_000];
        let mut warnings = Vec::new();
        loop {
            let outcome = room.tick(100, &thresholds);
            warnings.extend(outcome.warnings.iter().copied());
            if outcome.time_up {
                break;
            }
        }
        assert_eq!(warnings, vec![30, 10]);
    }

    #[test]
    fn test_zero_duration_match_is_immediately_up() {
        let mut room = Room::new("ABCDEF".to_string(), 0);
        room.claim_seat(slot("a"));
        room.claim_seat(slot("b"));
        room.apply_ready(Seat::P1, Some(true));
        room.apply_ready(Seat::P2, Some(true));
        room.begin_match();

        assert_eq!(room.time_remaining_ms, 0);
        assert_eq!(room.finish_outcome(None), MatchOutcome::Draw);
    }

    #[test]
    fn test_goal_updates_score_and_last_goal() {
        let mut room = playing_room();
        let score = room.record_goal(Seat::P1);
        assert_eq!(score, Score { p1: 1, p2: 0 });
        assert_eq!(room.last_goal, Some(Seat::P1));

        let score = room.record_goal(Seat::P2);
        assert_eq!(score, Score { p1: 1, p2: 1 });
    }

    #[test]
    fn test_outcome_rules() {
        let mut room = playing_room();
        room.record_goal(Seat::P1);
        assert_eq!(room.finish_outcome(None), MatchOutcome::P1Wins);

        room.record_goal(Seat::P2);
        assert_eq!(room.finish_outcome(None), MatchOutcome::Draw);

        // A mid-game leave awards the remaining seat regardless of score.
        room.record_goal(Seat::P1);
        assert_eq!(room.finish_outcome(Some(Seat::P2)), MatchOutcome::P2Wins);
    }

    #[test]
    fn test_position_cap_is_advisory_per_message() {
        let mut room = playing_room();
        assert!(room.accept_position(Seat::P1, 0.0, 0.0, 50.0));
        assert!(room.accept_position(Seat::P1, 30.0, -20.0, 50.0));
        // A 60-unit jump on one axis exceeds the L-infinity cap.
        assert!(!room.accept_position(Seat::P1, 90.0, -20.0, 50.0));
        // The rejected message does not move the reference point.
        assert!(room.accept_position(Seat::P1, 60.0, -20.0, 50.0));
    }

    #[test]
    fn test_position_reference_clears_on_goal() {
        let mut room = playing_room();
        assert!(room.accept_position(Seat::P1, 0.0, 0.0, 50.0));
        room.record_goal(Seat::P1);
        // Players re-centre after a goal; any position is accepted again.
        assert!(room.accept_position(Seat::P1, 400.0, 300.0, 50.0));
    }

    #[test]
    fn test_rematch_needs_both_seats() {
        let mut room = playing_room();
        room.complete();

        assert!(!room.request_rematch(Seat::P1));
        assert!(room.rematch.requested(Seat::P1));
        assert!(!room.rematch.requested(Seat::P2));
        assert!(room.request_rematch(Seat::P2));
    }

    #[test]
    fn test_rematch_reset_matches_fresh_room() {
        let mut room = playing_room();
        room.match_id = Some(Uuid::new_v4());
        room.record_goal(Seat::P1);
        room.tick(100, &[30_000, 10_000]);
        room.complete();
        room.request_rematch(Seat::P1);
        room.request_rematch(Seat::P2);
        room.reset_for_rematch();

        let fresh = Room::new(room.code.clone(), room.match_duration_ms);
        assert_eq!(room.status, fresh.status);
        assert_eq!(room.score, fresh.score);
        assert_eq!(room.time_remaining_ms, fresh.time_remaining_ms);
        assert_eq!(room.rematch, fresh.rematch);
        assert_eq!(room.match_id, None);
        assert_eq!(room.last_goal, None);
        assert_eq!(room.ball_authority, Seat::P1);
        // Occupants are preserved through the reset.
        assert!(room.is_full());
        assert!(!room.is_ready(Seat::P1));
        assert!(!room.is_ready(Seat::P2));
    }

    #[test]
    fn test_elapsed_play_ms_tracks_tick_clock() {
        let mut room = playing_room();
        for _ in 0..100 {
            room.tick(100, &[]);
        }
        assert_eq!(room.elapsed_play_ms(), 10_000);
    }

    #[test]
    fn test_room_code_generation() {
        let code = room_codes::generate_room_code();
        assert_eq!(code.len(), 6);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        // Should not contain confusing characters
        assert!(!code.contains('0'));
        assert!(!code.contains('O'));
        assert!(!code.contains('I'));
        assert!(!code.contains('1'));

        // Generate multiple codes to test uniqueness probability
        let mut codes = std::collections::HashSet::new();
        for _ in 0..100 {
            codes.insert(room_codes::generate_room_code());
        }
        assert!(codes.len() > 90);
    }

    #[test]
    fn test_code_normalization_is_case_insensitive() {
        assert_eq!(room_codes::normalize_code(" k7qr9p "), "K7QR9P");
    }

    #[test]
    fn test_wallet_validation() {
        use validation::validate_wallet_address;

        assert!(validate_wallet_address(&format!("0x{}", "a1".repeat(20))).is_ok());
        assert!(validate_wallet_address("").is_err());
        assert!(validate_wallet_address("0x123").is_err());
        // Uppercase hex is rejected: addresses are stored lowercase.
        assert!(validate_wallet_address(&format!("0x{}", "A1".repeat(20))).is_err());
        assert!(validate_wallet_address(&format!("1x{}", "a1".repeat(20))).is_err());
    }

    #[test]
    fn test_kind_permitted_matrix() {
        use validation::kind_permitted;

        let ready = ClientEvent::Ready { ready: Some(true) };
        let goal = ClientEvent::Goal {
            scoring_seat: Seat::P1,
        };
        let rematch = ClientEvent::RequestRematch;

        assert!(kind_permitted(&ready, RoomStatus::Waiting));
        assert!(!kind_permitted(&ready, RoomStatus::Playing));
        assert!(!kind_permitted(&goal, RoomStatus::Waiting));
        assert!(kind_permitted(&goal, RoomStatus::Playing));
        assert!(!kind_permitted(&rematch, RoomStatus::Playing));
        assert!(kind_permitted(&rematch, RoomStatus::Finished));
        assert!(kind_permitted(&ClientEvent::Leave, RoomStatus::Playing));
        assert!(kind_permitted(&ClientEvent::Leave, RoomStatus::Finished));
    }

    #[test]
    fn test_client_event_wire_shape() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"join_by_code","data":{"code":"K7QR9P"}}"#)
                .expect("valid join payload");
        assert!(matches!(event, ClientEvent::JoinByCode { ref code } if code == "K7QR9P"));

        // `ready` with no data toggles
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"ready","data":{}}"#).expect("valid ready payload");
        assert!(matches!(event, ClientEvent::Ready { ready: None }));

        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"player_position","data":{"seat":"p2","x":1.0,"y":2.0,"vx":0.5,"vy":-0.5}}"#,
        )
        .expect("valid position payload");
        assert!(matches!(
            event,
            ClientEvent::PlayerPosition { seat: Seat::P2, .. }
        ));
    }

    #[test]
    fn test_server_event_wire_shape() {
        let json = serde_json::to_value(ServerEvent::GoalScored {
            scorer: Seat::P1,
            score: Score { p1: 1, p2: 0 },
        })
        .expect("serializable");
        assert_eq!(json["type"], "goal_scored");
        assert_eq!(json["data"]["scorer"], "p1");
        assert_eq!(json["data"]["score"]["p1"], 1);

        let json = serde_json::to_value(ServerEvent::TimerUpdate {
            time_remaining_ms: 59_000,
        })
        .expect("serializable");
        assert_eq!(json["type"], "timer_update");
        assert_eq!(json["data"]["timeRemainingMs"], 59_000);

        let json = serde_json::to_value(ServerEvent::error(ErrorCode::BadCode))
            .expect("serializable");
        assert_eq!(json["data"]["code"], "bad_code");
    }

    proptest! {
        #[test]
        fn generated_codes_use_clean_alphabet(len in 1usize..=10) {
            let code = room_codes::generate_room_code_of_length(len);
            prop_assert_eq!(code.len(), len);
            prop_assert!(code.chars().all(room_codes::is_code_char));
        }

        #[test]
        fn wallet_validation_matches_predicate(raw in "[0-9a-zA-Zx]{0,44}") {
            let expected = raw.len() == 42
                && raw.starts_with("0x")
                && raw[2..].chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
            prop_assert_eq!(
                validation::validate_wallet_address(&raw).is_ok(),
                expected
            );
        }

        #[test]
        fn tick_never_underflows(duration in 0u64..=120_000, dt in 1u64..=1_000) {
            let mut room = Room::new("ABCDEF".to_string(), duration);
            room.claim_seat(slot("a"));
            room.claim_seat(slot("b"));
            room.apply_ready(Seat::P1, Some(true));
            room.apply_ready(Seat::P2, Some(true));
            room.begin_match();

            for _ in 0..=(duration / dt + 2) {
                let before = room.time_remaining_ms;
                room.tick(dt, &[30_000, 10_000]);
                prop_assert!(room.time_remaining_ms <= before);
            }
            prop_assert_eq!(room.time_remaining_ms, 0);
        }
    }
}
