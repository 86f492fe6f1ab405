use anyhow::{Context, Result};
use imagegen_gateway::{
    config::AppConfig,
    services::generation::{GeminiBackend, GenerationBackend, UnconfiguredBackend},
    state::AppState,
};
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- .env before anything reads the environment ---
    let dotenv = dotenvy::dotenv();

    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;
    tracing::info!("Starting imagegen-gateway with config: {:?}", cfg);

    // --- Ensure storage directory exists ---
    if !cfg.storage_dir.exists() {
        std::fs::create_dir_all(&cfg.storage_dir).with_context(|| {
            format!("creating storage directory {}", cfg.storage_dir.display())
        })?;
        tracing::info!("Created storage directory at {}", cfg.storage_dir.display());
    }

    // --- Generation backend ---
    let backend: Arc<dyn GenerationBackend> = match &cfg.api_key {
        Some(key) => Arc::new(
            GeminiBackend::new(&cfg.backend_endpoint, key.as_str())
                .context("building generation backend HTTP client")?,
        ),
        None => {
            tracing::warn!("GOOGLE_API_KEY not set; generation requests will fail");
            Arc::new(UnconfiguredBackend)
        }
    };

    // --- Build router ---
    let addr = cfg.addr();
    let host = cfg.host.clone();
    let port = cfg.port;
    let app = imagegen_gateway::app(AppState::new(cfg, backend));

    // --- Start server ---
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
