use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;

use crate::broadcast::Delivery;
use crate::protocol::{ClientEvent, ErrorCode, LeaveReason, ServerEvent};
use crate::server::{AttachError, MatchServer};

/// Serialize and send one event on the raw socket, bypassing the session
/// queue. Used only before a session exists (auth/attach failures).
async fn send_immediate(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(event)
        .map_err(|err| axum::Error::new(std::io::Error::other(err)))?;
    sender.send(Message::Text(text.into())).await
}

pub(super) async fn handle_socket(
    socket: WebSocket,
    server: Arc<MatchServer>,
    token: Option<String>,
) {
    let (mut sender, mut receiver) = socket.split();

    // Identity gate: verify before anything else is processed. Failures
    // produce exactly one error event, then the socket closes.
    let principal = match server.authenticate(token.as_deref()).await {
        Ok(principal) => principal,
        Err(err) => {
            tracing::warn!(error = %err, "Rejecting connection at the identity gate");
            let _ = send_immediate(&mut sender, &ServerEvent::error(err.error_code())).await;
            let _ = sender.close().await;
            return;
        }
    };

    let attachment = match server.attach_session(principal) {
        Ok(attachment) => attachment,
        Err(err) => {
            let code = match err {
                AttachError::AlreadyConnected { .. } => ErrorCode::AlreadyConnected,
                AttachError::ShuttingDown => ErrorCode::ServerShutdown,
            };
            tracing::warn!(error = %err, "Rejecting session attach");
            let _ = send_immediate(&mut sender, &ServerEvent::error(code)).await;
            let _ = sender.close().await;
            return;
        }
    };
    let session_id = attachment.session_id;
    let queue = attachment.queue;

    // Writer: drain the outbound queue onto the socket. A slow consumer
    // hits the write timeout and is detached.
    let write_timeout = server.config().write_timeout;
    let server_writer = server.clone();
    let send_task = tokio::spawn(async move {
        let mut close_reason = LeaveReason::Disconnected;
        loop {
            match queue.next().await {
                Delivery::Event(event) => {
                    let text = match serde_json::to_string(event.as_ref()) {
                        Ok(text) => text,
                        Err(err) => {
                            tracing::error!(%session_id, error = %err, "Failed to serialize event");
                            continue;
                        }
                    };
                    match tokio::time::timeout(
                        write_timeout,
                        sender.send(Message::Text(text.into())),
                    )
                    .await
                    {
                        Ok(Ok(())) => {}
                        Ok(Err(err)) => {
                            tracing::debug!(%session_id, error = %err, "Socket write failed");
                            break;
                        }
                        Err(_) => {
                            tracing::warn!(%session_id, "Socket write timed out");
                            close_reason = LeaveReason::Overloaded;
                            break;
                        }
                    }
                }
                Delivery::Overloaded => {
                    server_writer.metrics.increment_sessions_overloaded();
                    tracing::warn!(%session_id, "Outbound queue overflowed; closing session");
                    let _ =
                        send_immediate(&mut sender, &ServerEvent::error(ErrorCode::Overloaded))
                            .await;
                    close_reason = LeaveReason::Overloaded;
                    break;
                }
                Delivery::Closed => break,
            }
        }
        let _ = sender.close().await;
        server_writer.detach_session(&session_id, close_reason).await;
    });

    // Reader: parse and route ingress frames. Per-message failures are
    // answered with error events; only transport failures end the loop.
    let server_reader = server.clone();
    let max_message_size = server.config().max_message_size;
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(err) => {
                    tracing::debug!(%session_id, error = %err, "WebSocket error");
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    if text.len() > max_message_size {
                        tracing::warn!(
                            %session_id,
                            size = text.len(),
                            max = max_message_size,
                            "Message exceeds size limit"
                        );
                        server_reader.send_error_to_session(&session_id, ErrorCode::MessageTooLarge);
                        continue;
                    }

                    let event: ClientEvent = match serde_json::from_str(&text) {
                        Ok(event) => event,
                        Err(err) => {
                            tracing::debug!(%session_id, error = %err, "Unparseable frame");
                            server_reader
                                .send_error_to_session(&session_id, ErrorCode::InvalidPayload);
                            continue;
                        }
                    };

                    server_reader.handle_client_event(&session_id, event).await;
                }
                Message::Binary(_) => {
                    server_reader.send_error_to_session(&session_id, ErrorCode::InvalidPayload);
                }
                Message::Close(_) => {
                    tracing::debug!(%session_id, "WebSocket connection closed");
                    break;
                }
                // Ping/pong frames are handled by the transport layer.
                _ => {}
            }
        }

        server_reader
            .detach_session(&session_id, LeaveReason::Disconnected)
            .await;
    });

    // Wait for either side to finish; the other unwinds through the
    // detach/queue-close chain.
    tokio::select! {
        _ = send_task => {
            tracing::debug!(%session_id, "Send task completed");
        }
        _ = recv_task => {
            tracing::debug!(%session_id, "Receive task completed");
        }
    }

    server
        .detach_session(&session_id, LeaveReason::Disconnected)
        .await;
}
