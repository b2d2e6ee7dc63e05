use std::process::ExitCode;

use cuartel_server::cache::SnapshotCache;
use cuartel_server::config::{ConfigError, ServerConfig};
use cuartel_server::fetch::{FetchError, StationFetcher};
use cuartel_server::web::{AppState, create_router};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Errors that stop the server from starting.
#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to create station fetcher: {0}")]
    Fetcher(#[from] FetchError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cuartel_server=info,tower_http=info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Server stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let config = ServerConfig::from_env()?;
    let registry = config.load_registry()?;
    let fetcher = StationFetcher::new(config.fetch.clone())?;

    let cache = SnapshotCache::new(fetcher, registry, &config.cache);

    // Start filling the cache before the first request arrives; until it
    // completes, reads return an empty list.
    cache.spawn_refresh();

    let state = AppState::new(cache.clone(), config.include_personnel);
    let app = create_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        %addr,
        stations = cache.registry().len(),
        ttl_secs = config.cache.ttl.as_secs(),
        include_personnel = config.include_personnel,
        "Station status server listening"
    );
    info!("  GET /api/carros  - Station vehicle status");
    info!("  GET /api/estado  - Cache freshness");
    info!("  GET /health      - Health check");

    axum::serve(listener, app).await?;
    Ok(())
}
