//! Match and session behavior configuration types.

use super::defaults::{
    default_dispose_grace_ms, default_match_duration_ms, default_max_message_size,
    default_max_position_delta, default_outbound_queue_depth, default_rematch_timeout_ms,
    default_tick_ms, default_timer_warning_thresholds_ms, default_write_timeout_secs,
};
use serde::{Deserialize, Serialize};

/// Server configuration for room lifecycle and session back-pressure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Match length (milliseconds)
    #[serde(default = "default_match_duration_ms")]
    pub match_duration_ms: u64,
    /// Timer-update cadence (milliseconds)
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Idle budget for a finished room before disposal (milliseconds)
    #[serde(default = "default_rematch_timeout_ms")]
    pub rematch_timeout_ms: u64,
    /// Delay between entering disposing and deletion (milliseconds)
    #[serde(default = "default_dispose_grace_ms")]
    pub dispose_grace_ms: u64,
    /// One-shot timer warning marks (milliseconds, largest first)
    #[serde(default = "default_timer_warning_thresholds_ms")]
    pub timer_warning_thresholds_ms: Vec<u64>,
    /// Per-session outgoing queue depth
    #[serde(default = "default_outbound_queue_depth")]
    pub outbound_queue_depth: usize,
    /// Advisory anti-cheat cap on per-message position movement (units)
    #[serde(default = "default_max_position_delta")]
    pub max_position_delta: f32,
    /// Maximum accepted frame size (bytes)
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Socket write timeout (seconds); on expiry the session is detached
    #[serde(default = "default_write_timeout_secs")]
    pub write_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            match_duration_ms: default_match_duration_ms(),
            tick_ms: default_tick_ms(),
            rematch_timeout_ms: default_rematch_timeout_ms(),
            dispose_grace_ms: default_dispose_grace_ms(),
            timer_warning_thresholds_ms: default_timer_warning_thresholds_ms(),
            outbound_queue_depth: default_outbound_queue_depth(),
            max_position_delta: default_max_position_delta(),
            max_message_size: default_max_message_size(),
            write_timeout_secs: default_write_timeout_secs(),
        }
    }
}
