use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::Response;
use std::collections::HashMap;
use std::sync::Arc;

use crate::server::MatchServer;

use super::connection::handle_socket;

/// WebSocket handler for the match protocol.
///
/// The bearer credential travels in one of three places, checked in order:
/// the `token` query parameter, an `Authorization: Bearer` header, or the
/// `authToken` cookie. Verification happens after the upgrade so the
/// failure surfaces as a proper `error` event instead of an opaque HTTP
/// status.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<HashMap<String, String>>,
    State(server): State<Arc<MatchServer>>,
    headers: HeaderMap,
) -> Response {
    let token = extract_credential(&params, &headers);
    ws.on_upgrade(move |socket| handle_socket(socket, server, token))
}

fn extract_credential(params: &HashMap<String, String>, headers: &HeaderMap) -> Option<String> {
    if let Some(token) = params.get("token") {
        let trimmed = token.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }

    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        if let Some(rest) = value.strip_prefix("Bearer ") {
            let trimmed = rest.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }

    if let Some(cookies) = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
    {
        for pair in cookies.split(';') {
            if let Some(value) = pair.trim().strip_prefix("authToken=") {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }

    None
}
