#![cfg_attr(not(test), deny(clippy::panic))]

use arena_duel_server::auth::{JwtVerifier, JwtVerifierConfig};
use arena_duel_server::config;
use arena_duel_server::logging;
use arena_duel_server::server::{MatchServer, ServerConfig};
use arena_duel_server::store::{InMemoryMatchRepo, InMemoryUserRepo};
use arena_duel_server::websocket;
use clap::Parser;
use std::{net::SocketAddr, sync::Arc};
use tokio::time::Duration;

/// Arena Duel -- realtime WebSocket match server for 1v1 arcade games
#[derive(Parser, Debug)]
#[command(name = "arena-duel-server")]
#[command(about = "A realtime WebSocket match server for 1-vs-1 arcade games")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines and pre-deployment checks.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    /// Useful for debugging configuration loading from multiple sources.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration from config.json if present; otherwise use code defaults.
    let cfg = Arc::new(config::load());

    // Handle --print-config: output the loaded configuration as JSON
    if cli.print_config {
        let json = serde_json::to_string_pretty(&*cfg)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    // config::load() already ran validation but only warns; capture the
    // result here to provide a proper exit code and fail hard in production.
    let validation_result = config::validate_config(&cfg);

    // Handle --validate-config: exit after validation
    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!("  Match duration: {} ms", cfg.server.match_duration_ms);
                println!("  Tick: {} ms", cfg.server.tick_ms);
                println!("  Rematch window: {} ms", cfg.server.rematch_timeout_ms);
                println!("  Auth configured: {}", cfg.security.auth.is_configured());
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }

    // In normal operation, propagate validation errors
    validation_result.map_err(|e| anyhow::anyhow!(e))?;

    // Initialize logging from config.
    logging::init_with_config(&cfg.logging);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!(%addr, "Starting Arena Duel server");

    if !cfg.security.auth.is_configured() {
        tracing::warn!(
            "No verifier key configured; every connection attempt will be rejected with auth_invalid"
        );
    }

    let server_config = ServerConfig {
        match_duration: Duration::from_millis(cfg.server.match_duration_ms),
        tick: Duration::from_millis(cfg.server.tick_ms),
        rematch_timeout: Duration::from_millis(cfg.server.rematch_timeout_ms),
        dispose_grace: Duration::from_millis(cfg.server.dispose_grace_ms),
        timer_warning_thresholds_ms: cfg.server.timer_warning_thresholds_ms.clone(),
        outbound_queue_depth: cfg.server.outbound_queue_depth,
        max_position_delta: cfg.server.max_position_delta,
        max_message_size: cfg.server.max_message_size,
        write_timeout: Duration::from_secs(cfg.server.write_timeout_secs),
        room_code_length: cfg.protocol.room_code_length,
    };

    let verifier = Arc::new(JwtVerifier::new(JwtVerifierConfig {
        issuer: cfg.security.auth.issuer.clone(),
        audience: cfg.security.auth.audience.clone(),
        public_key_pem: cfg.security.auth.public_key_pem.clone(),
        secret: cfg.security.auth.secret.clone(),
        skip_expiry: cfg.security.auth.skip_expiry,
    }));

    // In-memory stores; production deployments wire durable UserRepo /
    // MatchRepo implementations here.
    let users = Arc::new(InMemoryUserRepo::new());
    let matches = Arc::new(InMemoryMatchRepo::new());

    let server = MatchServer::new(server_config, users, matches, verifier);

    let app = websocket::create_router(&cfg.security.cors_origins).with_state(server.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        cors_origins = %cfg.security.cors_origins,
        "Server started - WebSocket: /ws, Health: /health, Metrics: /metrics"
    );

    let shutdown_server = server.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::error!("Failed to listen for shutdown signal");
            return;
        }
        shutdown_server.shutdown().await;
    })
    .await?;

    Ok(())
}
