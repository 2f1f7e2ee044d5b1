#![doc = include_str!("../README.md")]

mod server;

use charpool::{MemoryStore, RedbStore};
use clap::Parser;
use server::config::{CliArgs, ServerConfig};
use server::handler::{AppState, SharedStore, router};
use server::telemetry::init_telemetry;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry()?;

    let store = open_store(&config)?;
    let state = AppState::new(store, config.allocator.clone());
    log_startup_info(&config, &state).await?;

    let listener = TcpListener::bind(&config.server_addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Service shut down successfully");
    providers.shutdown();
    Ok(())
}

fn open_store(config: &ServerConfig) -> anyhow::Result<SharedStore> {
    match &config.database_path {
        Some(path) => Ok(Arc::new(RedbStore::open(path)?)),
        None => {
            tracing::warn!("DATABASE_PATH not set, participants are kept in memory only");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn log_startup_info(config: &ServerConfig, state: &AppState) -> anyhow::Result<()> {
    let remaining = {
        let state = state.clone();
        tokio::task::spawn_blocking(move || state.service().remaining()).await??
    };
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting allocation service on {} with full config: {:#?}",
            config.server_addr,
            config
        );
    } else {
        tracing::info!(
            "Starting allocation service on {} with a pool of {} tokens",
            config.server_addr,
            config.allocator.alphabet.len()
        );
    }
    tracing::info!("{remaining} tokens remaining");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");
}
