use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vibe_core::{
    load_config, load_config_from_env, pipeline::StateUpdateCallback, validate_config, Config,
    PipelineOrchestrator, PipelineState, PredictionService, ReplicateClient,
};
use vibe_server::{api::create_router, metrics::observe_pipeline_state, state::AppState};

/// Config file used when `VIBE_CONFIG` is not set.
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load()?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Prediction service: {}", config.replicate.api_base);
    info!("Overlap policy: {:?}", config.pipeline.overlap_policy);
    if config.replicate.api_token().is_none() {
        warn!("REPLICATE_API_TOKEN is not set; generation requests will fail");
    }

    // Create prediction service
    let service: Arc<dyn PredictionService> = Arc::new(
        ReplicateClient::new(config.replicate.clone(), config.models.clone())
            .context("Failed to create prediction client")?,
    );
    info!("Using prediction service: {}", service.name());

    // Keep the phase gauge in step with every published state
    let update_callback: StateUpdateCallback = Arc::new(|state: &PipelineState| {
        debug!(phase = %state.phase, "Pipeline state updated");
        observe_pipeline_state(state);
    });

    let orchestrator = Arc::new(
        PipelineOrchestrator::new(
            config.pipeline.clone(),
            config.models.clone(),
            Arc::clone(&service),
        )
        .with_update_callback(update_callback),
    );
    observe_pipeline_state(&orchestrator.state());

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        service,
        Arc::clone(&orchestrator),
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Stop any run still in flight
    info!("Server shutting down...");
    orchestrator.reset().await;

    Ok(())
}

/// Load the config file named by `VIBE_CONFIG` (required when set), or
/// `config.toml` if present, or defaults plus environment.
fn load() -> Result<Config> {
    match std::env::var("VIBE_CONFIG") {
        Ok(path) => {
            let path = PathBuf::from(path);
            info!("Loading configuration from {:?}", path);
            load_config(&path).with_context(|| format!("Failed to load config from {:?}", path))
        }
        Err(_) => {
            let path = PathBuf::from(DEFAULT_CONFIG_PATH);
            if path.exists() {
                info!("Loading configuration from {:?}", path);
                load_config(&path)
                    .with_context(|| format!("Failed to load config from {:?}", path))
            } else {
                info!("No config file found, using defaults and environment");
                load_config_from_env().context("Failed to load config from environment")
            }
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
