//! Arena Duel - host-authoritative two-player arena shooter
//!
//! One binary, three roles:
//! - `host`: listen for a guest, own the simulation, stream snapshots
//! - `client`: dial a host, apply its snapshots, send input every tick
//! - `practice`: host against a local bot with no network at all

mod config;
mod game;
mod mapgen;
mod protocol;
mod session;
mod transport;
mod util;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, ConfigError, Role};
use crate::session::{ClientOutcome, ClientSession, HostSession, Opponent};
use crate::transport::TransportManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    info!(role = ?config.role, seed = config.seed, "Starting Arena Duel");

    match config.role {
        Role::Host => run_host(&config).await?,
        Role::Practice => {
            let session = HostSession::new(config.seed, config.match_secs, Opponent::Bot);
            if let Some(over) = session.run(shutdown_signal()).await {
                info!(winner = ?over.winner_id, reason = ?over.reason, "Practice match finished");
            }
        }
        Role::Client => run_client(&config).await?,
    }

    info!("Shutdown complete");
    Ok(())
}

async fn run_host(config: &Config) -> anyhow::Result<()> {
    let (transport, events) = TransportManager::new(config.server_addr);
    let peer_id = transport.initialize(config.room.clone()).await?;

    info!("Share this peer id with your opponent: {}", peer_id);
    info!("Health check: http://{}/health", config.server_addr);

    let session = HostSession::new(
        config.seed,
        config.match_secs,
        Opponent::Remote { transport, events },
    );
    match session.run(shutdown_signal()).await {
        Some(over) => info!(winner = ?over.winner_id, reason = ?over.reason, "Match finished"),
        None => info!("Match abandoned"),
    }
    Ok(())
}

async fn run_client(config: &Config) -> anyhow::Result<()> {
    let remote = config
        .remote
        .as_deref()
        .ok_or(ConfigError::Missing("ARENA_REMOTE"))?;

    let (transport, events) = TransportManager::new(config.server_addr);
    let session = ClientSession::new(transport, events);

    match session.run(remote, shutdown_signal()).await? {
        ClientOutcome::Finished(over) => {
            info!(winner = ?over.winner_id, reason = ?over.reason, "Match finished")
        }
        ClientOutcome::HostLeft => warn!("Host left before the match ended"),
        ClientOutcome::Interrupted => info!("Client interrupted"),
    }
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
