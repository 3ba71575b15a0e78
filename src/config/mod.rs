//! Configuration module for the match server.
//!
//! Configuration is merged from a JSON file, `ARENA_DUEL__*` environment
//! overrides, and compiled defaults, in the manner of
//! [`crate::config::loader`].
//!
//! # Module Structure
//!
//! - [`crate::config::types`]: Root `Config` struct
//! - [`server`]: Match and session behavior (durations, tick, queues)
//! - [`protocol`]: Wire protocol settings (room codes)
//! - [`security`]: CORS and token verification settings
//! - [`logging`]: Logging configuration
//! - [`crate::config::loader`]: Configuration loading functions
//! - [`crate::config::validation`]: Configuration validation functions
//! - [`crate::config::defaults`]: Default value functions

// Submodules
pub mod defaults;
pub mod loader;
pub mod logging;
pub mod protocol;
pub mod security;
pub mod server;
pub mod types;
pub mod validation;

// Re-exports for convenience
pub use loader::load;

pub use logging::{LogFormat, LogLevel, LoggingConfig};

pub use protocol::ProtocolConfig;

pub use security::{AuthConfig, SecurityConfig};

pub use server::ServerConfig;

pub use types::Config;

pub use validation::{is_production_mode, validate_config};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();

        assert_eq!(config.port, 3700);
        assert_eq!(config.server.match_duration_ms, 60_000);
        assert_eq!(config.server.tick_ms, 100);
        assert_eq!(config.server.rematch_timeout_ms, 180_000);
        assert_eq!(config.server.dispose_grace_ms, 2_000);
        assert_eq!(config.server.outbound_queue_depth, 256);
        assert_eq!(config.server.max_position_delta, 50.0);
        assert_eq!(config.server.timer_warning_thresholds_ms, vec![30_000, 10_000]);

        assert_eq!(config.protocol.room_code_length, 6);

        assert_eq!(config.logging.dir, "logs");
        assert_eq!(config.logging.filename, "server.log");
        assert_eq!(config.logging.rotation, "daily");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(config.port, deserialized.port);
        assert_eq!(
            config.server.match_duration_ms,
            deserialized.server.match_duration_ms
        );
        assert_eq!(
            config.protocol.room_code_length,
            deserialized.protocol.room_code_length
        );
    }

    #[test]
    fn test_log_level_round_trip() {
        assert_eq!(LogLevel::Trace.to_string(), "trace");
        assert_eq!(LogLevel::Warn.as_str(), "warn");

        let level: LogLevel = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(level, LogLevel::Warn);
        assert!(serde_json::from_str::<LogLevel>("\"verbose\"").is_err());
    }

    #[test]
    fn test_validation_rejects_zero_tick() {
        let mut config = Config::default();
        config.server.tick_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_rejects_unsorted_warning_thresholds() {
        let mut config = Config::default();
        config.server.timer_warning_thresholds_ms = vec![10_000, 30_000];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_accepts_defaults() {
        assert!(validate_config(&Config::default()).is_ok());
    }
}
