use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wavesmith_core::{
    config_path_from_env, load_config, load_config_from_env, validate_config, BatchController,
    Config, ConfigError, EngineAdapter, FfmpegEngine,
};
use wavesmith_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

/// Where the effective configuration came from.
enum ConfigSource {
    File,
    Defaults,
}

fn read_config(path: &Path) -> Result<(Config, ConfigSource), ConfigError> {
    match load_config(path) {
        Ok(config) => Ok((config, ConfigSource::File)),
        Err(ConfigError::FileNotFound(_)) => {
            load_config_from_env().map(|config| (config, ConfigSource::Defaults))
        }
        Err(e) => Err(e),
    }
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run() -> Result<()> {
    let config_path = config_path_from_env();
    let loaded = read_config(&config_path);

    // Logging format is itself configured, so it starts once the config is read
    init_logging(
        loaded
            .as_ref()
            .map(|(config, _)| config.logging.json)
            .unwrap_or(false),
    );

    let (config, source) =
        loaded.with_context(|| format!("Failed to load config from {:?}", config_path))?;
    match source {
        ConfigSource::File => info!("Loaded configuration from {:?}", config_path),
        ConfigSource::Defaults => warn!(
            "Config file {:?} not found, using defaults and environment",
            config_path
        ),
    }

    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        version = VERSION,
        config_hash = &config_hash[..16],
        "Configuration loaded successfully"
    );
    info!("FFmpeg binary: {:?}", config.engine.ffmpeg_path);
    info!(
        max_jobs = config.batch.max_jobs,
        default_format = %config.batch.default_format,
        "Batch limits"
    );

    // The engine loads lazily on the first job
    let engine = Arc::new(FfmpegEngine::new(config.engine.clone()));
    let session_dir = engine.session_dir().clone();
    info!("Engine scratch directory: {:?}", session_dir);
    let adapter = EngineAdapter::new(engine);
    let controller = BatchController::new(config.batch.clone(), adapter);

    let state = Arc::new(AppState::new(config.clone(), controller));
    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    match tokio::fs::remove_dir_all(&session_dir).await {
        Ok(()) => info!("Removed engine scratch directory"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove engine scratch directory: {}", e),
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
