//! Quire API Server
//!
//! Usage:
//!   quire-api --profile release --config configs/quire.toml
//!   quire-api --in-memory

use anyhow::Context;
use clap::Parser;
use quire_api::{create_router, state::AppState};
use quire_core::{AppConfig, LoggingConfig, Profile};
use quire_store::SurrealStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quire-api")]
#[command(about = "Content publishing REST API")]
#[command(version)]
struct Cli {
    /// Configuration profile to load from the config file (debug or release)
    #[arg(long, default_value = "debug")]
    profile: Profile,

    /// Path to the TOML configuration file
    #[arg(long, default_value = "configs/quire.toml")]
    config: PathBuf,

    /// Keep all data in memory instead of connecting to SurrealDB
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Missing file is not an error; defaults and env still apply
    let file_config = if cli.config.exists() {
        Some(AppConfig::from_file(&cli.config, cli.profile)?)
    } else {
        None
    };
    let loaded_from_file = file_config.is_some();
    let config = file_config.unwrap_or_default().with_env_override()?;

    init_tracing(&config.logging);

    if !loaded_from_file {
        tracing::warn!(path = %cli.config.display(), "Config file not found, using defaults");
    }
    config.validate(cli.profile)?;

    let state = if cli.in_memory {
        tracing::warn!("Running with the in-memory store; data is lost on exit");
        AppState::in_memory(config)
    } else {
        let store = Arc::new(
            SurrealStore::new(&config.database)
                .await
                .context("connecting to SurrealDB")?,
        );
        store.init_schema().await.context("initializing schema")?;
        AppState::new(config, store.clone(), store)
    };

    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let app = create_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(profile = %cli.profile, "Quire API Server starting on http://{}", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
