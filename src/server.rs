use std::sync::Arc;

use thiserror::Error;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::auth::{AuthError, IdentityGate, TokenVerifier};
use crate::broadcast::OutboundQueue;
use crate::metrics::ServerMetrics;
use crate::protocol::{LeaveReason, Principal, ServerEvent, SessionId};
use crate::store::{MatchRepo, UserRepo};

mod connection_manager;
mod gameplay;
#[cfg(test)]
mod gameplay_tests;
mod message_router;
mod messaging;
mod persistence;
mod ready_state;
mod rematch;
mod room_registry;
mod room_service;
mod ticker;

use connection_manager::ConnectionManager;
use room_registry::RoomRegistry;

/// Runtime server configuration, mapped from the file config in `main.rs`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub match_duration: Duration,
    pub tick: Duration,
    pub rematch_timeout: Duration,
    /// Delay between a room entering `Disposing` and its deletion.
    pub dispose_grace: Duration,
    /// One-shot timer warning marks in milliseconds, largest first.
    pub timer_warning_thresholds_ms: Vec<u64>,
    pub outbound_queue_depth: usize,
    pub max_position_delta: f32,
    pub max_message_size: usize,
    pub write_timeout: Duration,
    pub room_code_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            match_duration: Duration::from_millis(60_000),
            tick: Duration::from_millis(100),
            rematch_timeout: Duration::from_secs(180),
            dispose_grace: Duration::from_secs(2),
            timer_warning_thresholds_ms: vec![30_000, 10_000],
            outbound_queue_depth: 256,
            max_position_delta: 50.0,
            max_message_size: 65536, // 64KB
            write_timeout: Duration::from_secs(5),
            room_code_length: 6,
        }
    }
}

#[derive(Debug, Error)]
pub enum AttachError {
    #[error("user `{user_id}` already has an active session")]
    AlreadyConnected { user_id: String },
    #[error("server is shutting down")]
    ShuttingDown,
}

/// Result of a successful session attach: the id plus the outbound queue
/// the socket writer drains.
pub struct SessionAttachment {
    pub session_id: SessionId,
    pub queue: Arc<OutboundQueue>,
}

/// The session orchestrator: owns the session and room registries, routes
/// ingress events through validation into the per-room state machines, and
/// coordinates tickers, rematch timers and match persistence.
pub struct MatchServer {
    /// User identities and aggregate stats (injected store)
    users: Arc<dyn UserRepo>,
    /// Match records (injected store)
    matches: Arc<dyn MatchRepo>,
    /// Credential verification + user resolution
    identity: IdentityGate,
    /// Session registry (sessions by id and by user)
    sessions: ConnectionManager,
    /// Room registry (rooms by id and by code)
    rooms: RoomRegistry,
    config: ServerConfig,
    pub(crate) metrics: Arc<ServerMetrics>,
    /// Instance identifier for log correlation
    instance_id: Uuid,
    /// Root cancellation token; tickers and timers are children of it
    shutdown: CancellationToken,
}

impl MatchServer {
    pub fn new(
        config: ServerConfig,
        users: Arc<dyn UserRepo>,
        matches: Arc<dyn MatchRepo>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Arc<Self> {
        let metrics = Arc::new(ServerMetrics::new());
        let identity = IdentityGate::new(verifier, users.clone());
        Arc::new(Self {
            users,
            matches,
            identity,
            sessions: ConnectionManager::new(metrics.clone()),
            rooms: RoomRegistry::new(),
            config,
            metrics,
            instance_id: Uuid::new_v4(),
            shutdown: CancellationToken::new(),
        })
    }

    /// Run the identity gate for a raw credential.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<Principal, AuthError> {
        self.identity.authenticate(token).await
    }

    /// Register an authenticated connection and greet it.
    pub fn attach_session(&self, principal: Principal) -> Result<SessionAttachment, AttachError> {
        if self.shutdown.is_cancelled() {
            return Err(AttachError::ShuttingDown);
        }

        let queue = Arc::new(OutboundQueue::new(self.config.outbound_queue_depth));
        let user_id = principal.user_id.clone();
        let session_id = self
            .sessions
            .attach(principal, queue.clone())
            .map_err(|_| {
                self.metrics.increment_sessions_rejected();
                AttachError::AlreadyConnected {
                    user_id: user_id.clone(),
                }
            })?;

        queue.push(Arc::new(ServerEvent::Welcome {
            session_id,
            authenticated: true,
        }));

        tracing::info!(
            %session_id,
            user_id = %user_id,
            instance_id = %self.instance_id,
            "Session attached"
        );
        Ok(SessionAttachment { session_id, queue })
    }

    /// Remove a session. If it holds a seat, the room FSM observes a leave
    /// with the given reason. Idempotent: later calls are no-ops.
    pub async fn detach_session(self: &Arc<Self>, session_id: &SessionId, reason: LeaveReason) {
        let Some(entry) = self.sessions.detach(session_id) else {
            return;
        };
        entry.queue.close();
        self.metrics
            .add_events_dropped(entry.queue.dropped());

        if entry.room_id.is_some() {
            self.handle_leave(session_id, &entry, reason).await;
        }

        tracing::info!(
            %session_id,
            user_id = %entry.principal.user_id,
            ?reason,
            instance_id = %self.instance_id,
            "Session detached"
        );
    }

    /// Find the live session for a user, if any.
    pub fn session_of_user(&self, user_id: &str) -> Option<SessionId> {
        self.sessions.lookup_by_user(user_id)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<ServerMetrics> {
        self.metrics.clone()
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Child token for ticker/timer tasks; cancelling the root stops all.
    pub(crate) fn child_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Graceful shutdown: stop accepting sessions, finalize in-progress
    /// matches as abandoned, notify and close every session.
    pub async fn shutdown(self: &Arc<Self>) {
        if self.shutdown.is_cancelled() {
            return;
        }
        tracing::info!(instance_id = %self.instance_id, "Server shutting down");
        self.shutdown.cancel();

        for handle in self.rooms.snapshot() {
            self.abort_room_for_shutdown(&handle).await;
        }

        let shutdown_event = Arc::new(ServerEvent::ServerShutdown {});
        for session_id in self.sessions.all_session_ids() {
            self.send_to_session(&session_id, shutdown_event.clone());
            if let Some(queue) = self.sessions.queue_of(&session_id) {
                queue.close();
            }
            self.detach_session(&session_id, LeaveReason::ServerShutdown)
                .await;
        }
    }
}
