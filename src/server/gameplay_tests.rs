use super::room_service_tests::harness::*;

use crate::protocol::{ClientEvent, ErrorCode, Seat, ServerEvent};

#[tokio::test(start_paused = true)]
async fn positions_relay_to_the_opponent_only() {
    let ts = boot().await;
    let (a, b, _code) = playing_pair(&ts).await;

    a.send(ClientEvent::PlayerPosition {
        seat: Seat::P1,
        x: 10.0,
        y: 5.0,
        vx: 1.0,
        vy: -1.0,
    })
    .await;

    let event = b.recv().await;
    match event.as_ref() {
        ServerEvent::PlayerPosition { seat, x, y, .. } => {
            assert_eq!(*seat, Seat::P1);
            assert_eq!(*x, 10.0);
            assert_eq!(*y, 5.0);
        }
        other => panic!("expected player_position, got {other:?}"),
    }
    // The sender does not hear its own echo.
    assert!(a.queue.is_empty());
}

#[tokio::test(start_paused = true)]
async fn seat_spoof_is_dropped_silently() {
    let ts = boot().await;
    let (a, b, _code) = playing_pair(&ts).await;

    // A sits on p1 but claims p2. Nothing is relayed, nothing is rewritten,
    // and the sender gets no error either; only the log records it.
    a.send(ClientEvent::PlayerPosition {
        seat: Seat::P2,
        x: 0.0,
        y: 0.0,
        vx: 0.0,
        vy: 0.0,
    })
    .await;

    assert!(a.queue.is_empty());
    assert!(b.queue.is_empty());
    assert_eq!(ts.server.metrics.snapshot().anti_cheat_drops, 1);
}

#[tokio::test(start_paused = true)]
async fn ball_state_from_authority_relays() {
    let ts = boot().await;
    let (a, b, _code) = playing_pair(&ts).await;

    a.send(ClientEvent::BallState {
        x: 1.0,
        y: 2.0,
        vx: 3.0,
        vy: 4.0,
    })
    .await;

    let event = b.recv().await;
    assert!(matches!(event.as_ref(), ServerEvent::BallState { .. }));
}

#[tokio::test(start_paused = true)]
async fn ball_state_from_non_authority_errors_sender_only() {
    let ts = boot().await;
    let (a, b, _code) = playing_pair(&ts).await;

    b.send(ClientEvent::BallState {
        x: 1.0,
        y: 2.0,
        vx: 3.0,
        vy: 4.0,
    })
    .await;

    b.expect_error(ErrorCode::UnauthorizedBallUpdate).await;
    assert!(a.queue.is_empty());
    assert_eq!(ts.server.metrics.snapshot().anti_cheat_drops, 1);
}

#[tokio::test(start_paused = true)]
async fn goal_from_authority_scores_either_seat() {
    let ts = boot().await;
    let (a, b, _code) = playing_pair(&ts).await;

    // The ball-authority may report a goal for the opposing seat.
    a.send(ClientEvent::Goal {
        scoring_seat: Seat::P2,
    })
    .await;

    for client in [&a, &b] {
        let event = client
            .recv_until(|event| matches!(event, ServerEvent::GoalScored { .. }))
            .await;
        match event.as_ref() {
            ServerEvent::GoalScored { scorer, score } => {
                assert_eq!(*scorer, Seat::P2);
                assert_eq!((score.p1, score.p2), (0, 1));
            }
            _ => unreachable!(),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn goal_from_non_authority_is_rejected() {
    let ts = boot().await;
    let (a, b, _code) = playing_pair(&ts).await;

    b.send(ClientEvent::Goal {
        scoring_seat: Seat::P2,
    })
    .await;

    b.expect_error(ErrorCode::UnauthorizedGoal).await;
    assert!(a.queue.is_empty());

    // The score is untouched.
    let (room_id, _) = ts.server.sessions.room_of(&a.session_id).unwrap();
    let handle = ts.server.rooms.get(&room_id).unwrap();
    let room = handle.room.lock().await;
    assert_eq!((room.score.p1, room.score.p2), (0, 0));
}

#[tokio::test(start_paused = true)]
async fn oversized_position_jump_is_dropped_but_match_continues() {
    let ts = boot().await;
    let (a, b, _code) = playing_pair(&ts).await;

    a.send(ClientEvent::PlayerPosition {
        seat: Seat::P1,
        x: 0.0,
        y: 0.0,
        vx: 0.0,
        vy: 0.0,
    })
    .await;
    b.recv().await;

    // 200 units in one message blows through the 50-unit cap.
    a.send(ClientEvent::PlayerPosition {
        seat: Seat::P1,
        x: 200.0,
        y: 0.0,
        vx: 0.0,
        vy: 0.0,
    })
    .await;
    assert!(b.queue.is_empty());
    assert!(a.queue.is_empty());

    // A sane follow-up goes through: the cap is advisory, per message.
    a.send(ClientEvent::PlayerPosition {
        seat: Seat::P1,
        x: 30.0,
        y: 0.0,
        vx: 0.0,
        vy: 0.0,
    })
    .await;
    let event = b.recv().await;
    assert!(matches!(event.as_ref(), ServerEvent::PlayerPosition { .. }));
}

#[tokio::test(start_paused = true)]
async fn gameplay_kinds_outside_playing_are_bad_state() {
    let ts = boot().await;
    let (a, _b, _code) = seated_pair(&ts).await;

    a.send(ClientEvent::Goal {
        scoring_seat: Seat::P1,
    })
    .await;
    a.expect_error(ErrorCode::BadState).await;
}

#[tokio::test(start_paused = true)]
async fn ready_while_playing_is_bad_state() {
    let ts = boot().await;
    let (a, _b, _code) = playing_pair(&ts).await;

    a.send(ClientEvent::Ready { ready: Some(true) }).await;
    a.expect_error(ErrorCode::BadState).await;
}

#[tokio::test(start_paused = true)]
async fn ping_answers_pong() {
    let ts = boot().await;
    let a = Client::connect(&ts, "userA").await;

    a.send(ClientEvent::Ping).await;
    let event = a.recv().await;
    assert!(matches!(event.as_ref(), ServerEvent::Pong));
}
