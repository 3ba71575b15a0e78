//! End-to-end match lifecycle: create/join by code, ready-up, the server
//! tick, goals, time-up, mid-game disconnects, and persisted outcomes.


use std::time::Duration;

use arena_duel_server::protocol::{
    ClientEvent, LeaveReason, MatchOutcome, Seat, ServerEvent,
};
use arena_duel_server::server::ServerConfig;
use arena_duel_server::store::{MatchRepo, MatchStatus, UserRepo};
use test_helpers::*;

#[tokio::test(start_paused = true)]
async fn ready_happy_path_leave_awards_remaining_seat() {
    let ts = boot().await;
    let (a, b, _code) = playing_pair(&ts).await;

    // Ten seconds of play produce exactly the ten whole-second updates,
    // with no warning this far above the 30s threshold.
    let mut updates = Vec::new();
    while updates.last() != Some(&50_000u64) {
        let event = b.recv().await;
        match event.as_ref() {
            ServerEvent::TimerUpdate { time_remaining_ms } => updates.push(*time_remaining_ms),
            ServerEvent::TimerWarning { .. } => panic!("warning fired above the 30s threshold"),
            other => panic!("unexpected event during play: {other:?}"),
        }
    }
    let expected: Vec<u64> = (50..=59).rev().map(|s| s * 1000).collect();
    assert_eq!(updates, expected);

    // The creator walks out mid-game: the remaining seat wins regardless
    // of the (goalless) score.
    a.send(ClientEvent::Leave).await;
    b.recv_until(|event| {
        matches!(
            event,
            ServerEvent::PlayerLeft {
                seat: Seat::P1,
                reason: LeaveReason::VoluntaryLeave
            }
        )
    })
    .await;

    let ended = b
        .recv_until(|event| matches!(event, ServerEvent::GameEnded(_)))
        .await;
    let match_id = match ended.as_ref() {
        ServerEvent::GameEnded(payload) => {
            assert_eq!(payload.outcome, MatchOutcome::P2Wins);
            assert_eq!(payload.winner.as_deref(), Some("userB"));
            assert_eq!((payload.final_score.p1, payload.final_score.p2), (0, 0));
            assert_eq!(payload.duration_ms, 10_000);
            payload.match_id.expect("match should be persisted")
        }
        _ => unreachable!(),
    };

    let record = ts.matches.get_match(&match_id).await.unwrap().unwrap();
    assert_eq!(record.status, MatchStatus::Finished);
    let result = record.result.expect("finalized");
    assert_eq!(result.winner_user_id.as_deref(), Some("userB"));
    assert_eq!(result.duration_ms, 10_000);

    // Stat deltas: the leaver still takes the loss.
    let stats_a = ts.users.get_user("userA").await.unwrap().unwrap().game_stats;
    let stats_b = ts.users.get_user("userB").await.unwrap().unwrap().game_stats;
    assert_eq!((stats_a.losses, stats_a.total_matches), (1, 1));
    assert_eq!((stats_b.wins, stats_b.total_matches), (1, 1));
}

#[tokio::test(start_paused = true)]
async fn goal_then_timer_runs_to_time_up() {
    let ts = boot().await;
    let (a, b, _code) = playing_pair(&ts).await;

    // Ball-authority reports a goal for its own seat.
    a.send(ClientEvent::Goal {
        scoring_seat: Seat::P1,
    })
    .await;
    for client in [&a, &b] {
        let event = client
            .recv_until(|event| matches!(event, ServerEvent::GoalScored { .. }))
            .await;
        match event.as_ref() {
            ServerEvent::GoalScored { scorer, score } => {
                assert_eq!(*scorer, Seat::P1);
                assert_eq!((score.p1, score.p2), (1, 0));
            }
            _ => unreachable!(),
        }
    }

    // Run the clock out on B's stream, tracking warnings along the way.
    let mut warnings = Vec::new();
    let mut last_update = u64::MAX;
    loop {
        let event = b.recv().await;
        match event.as_ref() {
            ServerEvent::TimerUpdate { time_remaining_ms } => {
                assert!(*time_remaining_ms < last_update, "timer must be monotone");
                last_update = *time_remaining_ms;
            }
            ServerEvent::TimerWarning { threshold } => {
                if let Some(&previous) = warnings.last() {
                    assert!(*threshold < previous);
                }
                match *threshold {
                    30 => assert_eq!(last_update, 30_000),
                    10 => assert_eq!(last_update, 10_000),
                    other => panic!("unexpected warning threshold {other}"),
                }
                warnings.push(*threshold);
            }
            ServerEvent::TimeUp {} => break,
            other => panic!("unexpected event during play: {other:?}"),
        }
    }
    assert_eq!(warnings, vec![30, 10]);

    let ended = b
        .recv_until(|event| matches!(event, ServerEvent::GameEnded(_)))
        .await;
    match ended.as_ref() {
        ServerEvent::GameEnded(payload) => {
            assert_eq!(payload.outcome, MatchOutcome::P1Wins);
            assert_eq!(payload.winner.as_deref(), Some("userA"));
            assert_eq!((payload.final_score.p1, payload.final_score.p2), (1, 0));
            assert_eq!(payload.duration_ms, 60_000);
        }
        _ => unreachable!(),
    }

    let stats_a = ts.users.get_user("userA").await.unwrap().unwrap().game_stats;
    assert_eq!(stats_a.wins, 1);
}

#[tokio::test(start_paused = true)]
async fn zero_duration_match_ends_in_immediate_draw() {
    let config = ServerConfig {
        match_duration: Duration::ZERO,
        ..ServerConfig::default()
    };
    let ts = boot_with(config).await;
    let (a, b, _code) = seated_pair(&ts).await;

    a.send(ClientEvent::Ready { ready: Some(true) }).await;
    b.send(ClientEvent::Ready { ready: Some(true) }).await;

    for client in [&a, &b] {
        client
            .recv_until(|event| matches!(event, ServerEvent::GameStarted { .. }))
            .await;
        client
            .recv_until(|event| matches!(event, ServerEvent::TimeUp {}))
            .await;
        let ended = client
            .recv_until(|event| matches!(event, ServerEvent::GameEnded(_)))
            .await;
        match ended.as_ref() {
            ServerEvent::GameEnded(payload) => {
                assert_eq!(payload.outcome, MatchOutcome::Draw);
                assert_eq!(payload.winner, None);
                assert_eq!(payload.duration_ms, 0);
            }
            _ => unreachable!(),
        }
    }

    let stats_a = ts.users.get_user("userA").await.unwrap().unwrap().game_stats;
    assert_eq!((stats_a.draws, stats_a.total_matches), (1, 1));
}

#[tokio::test(start_paused = true)]
async fn disconnect_mid_game_finishes_and_finalizes_once() {
    let ts = boot().await;
    let (a, b, _code) = playing_pair(&ts).await;

    a.disconnect().await;

    b.recv_until(|event| {
        matches!(
            event,
            ServerEvent::PlayerLeft {
                reason: LeaveReason::Disconnected,
                ..
            }
        )
    })
    .await;
    let ended = b
        .recv_until(|event| matches!(event, ServerEvent::GameEnded(_)))
        .await;
    let match_id = match ended.as_ref() {
        ServerEvent::GameEnded(payload) => {
            assert_eq!(payload.outcome, MatchOutcome::P2Wins);
            payload.match_id.unwrap()
        }
        _ => unreachable!(),
    };

    // A second finalization attempt is a no-op; the persisted outcome holds.
    let applied = ts
        .matches
        .finalize_match(
            &match_id,
            MatchStatus::Finished,
            arena_duel_server::store::MatchResult {
                winner_user_id: Some("userA".to_string()),
                outcome: MatchOutcome::P1Wins,
                final_score: arena_duel_server::protocol::Score { p1: 9, p2: 0 },
                duration_ms: 1,
            },
        )
        .await
        .unwrap();
    assert!(!applied);

    let record = ts.matches.get_match(&match_id).await.unwrap().unwrap();
    assert_eq!(record.result.unwrap().outcome, MatchOutcome::P2Wins);

    // The disconnected user can attach again.
    let c = Client::connect(&ts, "userA").await;
    drop(c);
}

#[tokio::test(start_paused = true)]
async fn shutdown_finalizes_playing_matches_as_abandoned() {
    let ts = boot().await;
    let (a, b, _code) = playing_pair(&ts).await;

    a.send(ClientEvent::Goal {
        scoring_seat: Seat::P1,
    })
    .await;
    a.recv_until(|event| matches!(event, ServerEvent::GoalScored { .. }))
        .await;

    ts.server.shutdown().await;

    let ended = b
        .recv_until(|event| matches!(event, ServerEvent::GameEnded(_)))
        .await;
    let match_id = match ended.as_ref() {
        ServerEvent::GameEnded(payload) => payload.match_id.unwrap(),
        _ => unreachable!(),
    };
    b.recv_until(|event| matches!(event, ServerEvent::ServerShutdown {}))
        .await;

    let record = ts.matches.get_match(&match_id).await.unwrap().unwrap();
    assert_eq!(record.status, MatchStatus::Abandoned);
    assert_eq!(record.result.unwrap().outcome, MatchOutcome::P1Wins);

    // New attaches are refused during shutdown.
    let principal = ts.server.authenticate(Some("userC")).await.unwrap();
    assert!(ts.server.attach_session(principal).is_err());
}
