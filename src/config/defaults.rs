//! Default value functions for configuration fields.
//!
//! This module contains all the default value functions used by serde's
//! `#[serde(default = ...)]` attributes throughout the configuration system.

use super::logging::LogFormat;

// =============================================================================
// Port & Root Config
// =============================================================================

pub const fn default_port() -> u16 {
    3700
}

// =============================================================================
// Match Defaults
// =============================================================================

pub const fn default_match_duration_ms() -> u64 {
    60_000
}

/// Timer-only cadence; the wire protocol does not need sub-frame ticks.
pub const fn default_tick_ms() -> u64 {
    100
}

pub const fn default_rematch_timeout_ms() -> u64 {
    180_000 // 3 minutes
}

/// Delay between a room entering `Disposing` and its deletion.
pub const fn default_dispose_grace_ms() -> u64 {
    2_000
}

pub fn default_timer_warning_thresholds_ms() -> Vec<u64> {
    vec![30_000, 10_000]
}

/// Advisory anti-cheat cap on per-message position movement.
pub const fn default_max_position_delta() -> f32 {
    50.0
}

// =============================================================================
// Session Defaults
// =============================================================================

pub const fn default_outbound_queue_depth() -> usize {
    256
}

pub const fn default_max_message_size() -> usize {
    65536 // 64KB
}

pub const fn default_write_timeout_secs() -> u64 {
    5
}

// =============================================================================
// Protocol Defaults
// =============================================================================

pub const fn default_room_code_length() -> usize {
    6
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    true
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

// =============================================================================
// Security Defaults
// =============================================================================

pub fn default_cors_origins() -> String {
    "http://localhost:3000,http://localhost:5173".to_string()
}
