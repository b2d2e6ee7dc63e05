//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, Uri},
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::fetch::StationFetch;

use super::dto::*;
use super::state::AppState;

/// Create the application router.
///
/// CORS is open to any origin; the endpoints are public and read-only.
pub fn create_router<F: StationFetch>(state: AppState<F>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/carros", get(list_stations::<F>))
        .route("/api/estado", get(cache_status::<F>))
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Current station snapshot.
///
/// Always answers immediately from the cache. Upstream failures show up as
/// sentinel vehicles inside the payload, never as an error status.
async fn list_stations<F: StationFetch>(
    State(state): State<AppState<F>>,
) -> Json<Vec<StationResult>> {
    let snapshot = state.cache.get_snapshot().await;
    Json(station_results(&snapshot, state.include_personnel))
}

/// Snapshot freshness. Does not trigger a refresh.
async fn cache_status<F: StationFetch>(
    State(state): State<AppState<F>>,
) -> Json<CacheStatusResponse> {
    let snapshot = state.cache.current().await;

    Json(CacheStatusResponse {
        cuarteles: snapshot.records().len(),
        degradados: snapshot.degraded_count(),
        actualizado: snapshot.fetched_at(),
        antiguedad_segundos: snapshot.age(Utc::now()).map(|age| age.as_secs()),
        actualizando: state.cache.is_refreshing(),
        ttl_segundos: state.cache.ttl().as_secs(),
    })
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound {
        message: format!("no route for {}", uri.path()),
    }
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    NotFound { message: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
        };

        warn!(%status, %message, "Request failed");

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
