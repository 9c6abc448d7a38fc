//! Wikirace server binary.
//!
//! # Usage
//!
//! ```bash
//! # Pure in-memory server on the default port
//! wikirace-server
//!
//! # With crash-safe snapshots and the admin surface
//! wikirace-server --bind 0.0.0.0:9454 --db rooms.redb \
//!     --admin-bind 127.0.0.1:9455 --admin-secret hunter2
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use wikirace_engine::spawn_idle_sweeper;
use wikirace_resolver::RestResolver;
use wikirace_server::{WikiraceServer, admin, restore_rooms, save_rooms};
use wikirace_store::RedbStore;

/// Wikipedia race game server
#[derive(Parser, Debug)]
#[command(name = "wikirace-server")]
#[command(about = "Real-time Wikipedia race game server")]
#[command(version)]
struct Args {
    /// Address to bind the game WebSocket endpoint to
    #[arg(short, long, default_value = "127.0.0.1:9454")]
    bind: String,

    /// Path to the snapshot database; omit for pure in-memory mode
    #[arg(long)]
    db: Option<PathBuf>,

    /// Address for the read-only admin surface (requires --admin-secret)
    #[arg(long)]
    admin_bind: Option<String>,

    /// Shared secret for the x-admin-secret header
    #[arg(long)]
    admin_secret: Option<String>,

    /// Seconds between idle-room garbage collection sweeps
    #[arg(long, default_value = "60")]
    gc_interval_secs: u64,

    /// Seconds of inactivity after which a room is reclaimed
    #[arg(long, default_value = "1800")]
    idle_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Wikirace server starting");

    let server = WikiraceServer::bind(&args.bind, RestResolver::new()).await?;
    let registry = server.registry();

    // Persistence is optional and never fatal.
    let store: Option<RedbStore> = match &args.db {
        Some(path) => match RedbStore::open(path) {
            Ok(store) => Some(store),
            Err(e) => {
                tracing::warn!(error = %e, "snapshot store unavailable, running in-memory");
                None
            }
        },
        None => None,
    };
    if let Some(store) = &store {
        restore_rooms(&registry, store).await;
    }

    let _sweeper = spawn_idle_sweeper(
        registry.clone(),
        Duration::from_secs(args.gc_interval_secs),
        Duration::from_secs(args.idle_timeout_secs),
    );

    match (args.admin_bind, args.admin_secret) {
        (Some(bind), Some(secret)) => {
            let admin_registry = registry.clone();
            tokio::spawn(async move {
                if let Err(e) = admin::serve(bind, admin_registry, secret).await {
                    tracing::error!(error = %e, "admin surface failed");
                }
            });
        }
        (Some(_), None) => {
            tracing::warn!("--admin-bind ignored: --admin-secret is required");
        }
        _ => {}
    }

    tracing::info!(bind = %args.bind, "accepting connections");
    tokio::select! {
        result = server.run() => result?,
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
            if let Some(store) = &store {
                save_rooms(&registry, store).await;
            }
        }
    }

    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
