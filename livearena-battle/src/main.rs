//! LiveArena Battle Engine (livearena-battle) - Main entry point
//!
//! HTTP service hosting live creator battles and duet tip settlement.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use livearena_battle::config::TomlConfig;
use livearena_battle::{build_router, AppState};

/// Command-line arguments for livearena-battle
#[derive(Parser, Debug)]
#[command(name = "livearena-battle")]
#[command(about = "Live creator battle engine for LiveArena")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "LIVEARENA_BATTLE_PORT")]
    port: Option<u16>,

    /// Path to the TOML config file
    #[arg(short, long, env = "LIVEARENA_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting LiveArena Battle Engine v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!(
        "Rules: prize multiplier {}, vote points {}, platform fee {} bps",
        config.rules.prize_multiplier, config.rules.vote_points, config.rules.platform_fee_bps
    );

    let state = AppState::in_memory(&config);
    let app = build_router(state);

    let port = args.port.unwrap_or(config.port);
    let host: std::net::IpAddr = config
        .host
        .parse()
        .with_context(|| format!("Invalid host address: {}", config.host))?;
    let addr = SocketAddr::new(host, port);

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
