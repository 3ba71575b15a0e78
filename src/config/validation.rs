//! Configuration validation functions.

use super::Config;

/// Whether the process is running in production mode
/// (`ARENA_DUEL_ENV=production`).
pub fn is_production_mode() -> bool {
    std::env::var("ARENA_DUEL_ENV")
        .map(|v| v.trim().eq_ignore_ascii_case("production"))
        .unwrap_or(false)
}

/// Validate invariants the rest of the server assumes.
///
/// Hard failures return `Err`; softer concerns are logged by the caller.
pub fn validate_config(config: &Config) -> Result<(), String> {
    let mut problems = Vec::new();

    if config.server.tick_ms == 0 {
        problems.push("server.tick_ms must be greater than zero".to_string());
    } else if 1000 % config.server.tick_ms != 0 {
        // Timer updates land on whole-second remaining values.
        problems.push("server.tick_ms must divide 1000 evenly".to_string());
    }
    if config.server.outbound_queue_depth == 0 {
        problems.push("server.outbound_queue_depth must be greater than zero".to_string());
    }
    if config.server.max_message_size == 0 {
        problems.push("server.max_message_size must be greater than zero".to_string());
    }
    if config.server.write_timeout_secs == 0 {
        problems.push("server.write_timeout_secs must be greater than zero".to_string());
    }
    if !(4..=12).contains(&config.protocol.room_code_length) {
        problems.push(format!(
            "protocol.room_code_length must be between 4 and 12 (got {})",
            config.protocol.room_code_length
        ));
    }
    if config
        .server
        .timer_warning_thresholds_ms
        .windows(2)
        .any(|pair| pair[0] <= pair[1])
    {
        problems.push(
            "server.timer_warning_thresholds_ms must be strictly decreasing".to_string(),
        );
    }
    if config.security.auth.public_key_pem.is_some() && config.security.auth.secret.is_some() {
        problems.push(
            "security.auth: configure either public_key_pem or secret, not both".to_string(),
        );
    }
    if is_production_mode() && !config.security.auth.is_configured() {
        problems.push(
            "security.auth: a verifier key (public_key_pem or secret) is required in production"
                .to_string(),
        );
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems.join("\n"))
    }
}
