#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_excessive_bools,
    clippy::too_many_arguments,
    clippy::too_many_lines,
    clippy::similar_names
)]

//! # Arena Duel Server
//!
//! A realtime WebSocket match server for 1-vs-1 arcade games.
//!
//! The server authenticates clients, matches them into two-seat rooms,
//! enforces the ready/start/play/finish/rematch lifecycle, relays validated
//! gameplay events, and persists match outcomes. Physics stays on the
//! clients; seats, ball-authority, scoring, the match timer and persistence
//! are authoritative here.

/// Identity gate: token verification and principal resolution
pub mod auth;

/// Outbound event queues with priority-aware back-pressure
pub mod broadcast;

/// Server configuration and environment variables
pub mod config;

/// Structured logging configuration
pub mod logging;

/// Metrics collection and reporting
pub mod metrics;

/// Wire protocol definitions and room state machine
pub mod protocol;

/// Main server orchestration
pub mod server;

/// User and match storage abstractions
pub mod store;

/// WebSocket connection handling
pub mod websocket;
