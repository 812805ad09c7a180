//! interview-server - mock-interview analysis backend
//!
//! Accepts recorded interview answers, normalizes and stores them, and runs
//! speech, emotion, gaze and LLM analysis in the background.

use anyhow::{Context, Result};
use clap::Parser;
use interview_common::config::{
    load_service_config, resolve_config_path, RootFolderInitializer, RootFolderResolver,
};
use interview_common::events::EventBus;
use interview_server::services::{ArtifactStore, FfmpegToolkit, HttpAnalysisGateway};
use interview_server::{AppState, PipelineDeps};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "interview-server", version, about)]
struct Args {
    /// Path to the TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root folder for database and media storage
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Listen address (host:port)
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let config = load_service_config(config_path.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level())),
        )
        .with_target(true)
        .init();

    info!("Starting interview-server");
    info!(
        "Version: {} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );
    if let Some(path) = &config_path {
        info!("Config file: {}", path.display());
    }

    let root_folder = RootFolderResolver::new()
        .with_cli_arg(args.root_folder)
        .with_config(&config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder, &config.storage);
    initializer
        .ensure_directory_exists()
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;
    info!("Root folder: {}", initializer.root().display());

    let db_path = initializer.database_path();
    let db_pool = interview_server::db::init_database_pool(&db_path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open database {}: {}", db_path.display(), e))?;
    info!("Database: {}", db_path.display());

    let store = Arc::new(
        ArtifactStore::open(initializer.storage_dir()).context("Failed to open artifact store")?,
    );
    let media = Arc::new(FfmpegToolkit::new(
        &config.pipeline,
        initializer.scratch_dir().to_path_buf(),
        initializer.storage_dir().to_path_buf(),
    ));
    let gateway = Arc::new(
        HttpAnalysisGateway::new(&config.gateway).context("Failed to build analysis gateway")?,
    );
    info!(
        stt = %config.gateway.stt_url,
        emotion = %config.gateway.emotion_url,
        vision = %config.gateway.vision_url,
        llm = %config.gateway.llm_url,
        "Analysis services configured"
    );

    let event_bus = EventBus::new(256);
    let state = AppState::new(
        db_pool,
        event_bus,
        PipelineDeps {
            media,
            gateway,
            store,
            scratch_dir: initializer.scratch_dir().to_path_buf(),
            pipeline: config.pipeline.clone(),
        },
    );

    let app = interview_server::build_router(state);

    let bind_address = args.bind.unwrap_or_else(|| config.bind_address());
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
