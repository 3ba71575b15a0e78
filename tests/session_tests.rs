//! Session registry and identity-gate behavior through the public API.


use arena_duel_server::protocol::{ClientEvent, ErrorCode, Seat, ServerEvent};
use test_helpers::*;

#[tokio::test]
async fn welcome_is_the_first_event() {
    let ts = boot().await;
    let principal = ts.server.authenticate(Some("userA")).await.unwrap();
    let attachment = ts.server.attach_session(principal).unwrap();

    match tokio::time::timeout(
        std::time::Duration::from_secs(5),
        attachment.queue.next(),
    )
    .await
    {
        Ok(arena_duel_server::broadcast::Delivery::Event(event)) => match event.as_ref() {
            ServerEvent::Welcome {
                session_id,
                authenticated,
            } => {
                assert_eq!(*session_id, attachment.session_id);
                assert!(*authenticated);
            }
            other => panic!("expected welcome, got {other:?}"),
        },
        other => panic!("unexpected delivery: {other:?}"),
    }
}

#[tokio::test]
async fn missing_credential_is_auth_required() {
    let ts = boot().await;
    let err = ts.server.authenticate(None).await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::AuthRequired);
}

#[tokio::test]
async fn unknown_user_is_auth_invalid() {
    let ts = boot().await;
    // The token verifies, but the subject does not resolve in the user store.
    let err = ts.server.authenticate(Some("ghost")).await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::AuthInvalid);
}

#[tokio::test]
async fn concurrent_sessions_for_one_user_are_refused() {
    let ts = boot().await;
    let a = Client::connect(&ts, "userA").await;

    let principal = ts.server.authenticate(Some("userA")).await.unwrap();
    assert!(ts.server.attach_session(principal).is_err());

    // After the first session goes away, the user may attach again.
    a.disconnect().await;
    let principal = ts.server.authenticate(Some("userA")).await.unwrap();
    assert!(ts.server.attach_session(principal).is_ok());
}

#[tokio::test]
async fn session_lookup_by_user_follows_the_live_session() {
    let ts = boot().await;
    let a = Client::connect(&ts, "userA").await;
    assert_eq!(ts.server.session_of_user("userA"), Some(a.session_id));

    a.disconnect().await;
    assert_eq!(ts.server.session_of_user("userA"), None);
}

#[tokio::test]
async fn disconnect_in_waiting_room_frees_the_seat() {
    let ts = boot().await;
    let (a, b, code) = seated_pair(&ts).await;

    b.disconnect().await;
    a.recv_until(|event| {
        matches!(
            event,
            ServerEvent::PlayerLeft {
                seat: Seat::P2,
                ..
            }
        )
    })
    .await;

    let c = Client::connect(&ts, "userC").await;
    c.send(ClientEvent::JoinByCode { code }).await;
    match c.recv().await.as_ref() {
        ServerEvent::RoomJoined(payload) => assert_eq!(payload.seat, Seat::P2),
        other => panic!("expected room_joined, got {other:?}"),
    }
}
