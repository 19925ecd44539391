use axum::{extract::State, http::StatusCode, middleware, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    db::MovieStore,
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    services::PosterFetcher,
};

pub mod extract;
pub mod movies;
pub mod posters;
pub mod recommendations;

/// Shared, read-only application state
pub struct AppState {
    pub store: Arc<MovieStore>,
    pub posters: PosterFetcher,
    pub settings: ApiSettings,
}

/// Request defaults the handlers fall back to
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub default_recommendations: usize,
    pub max_recommendations: usize,
    pub placeholder_poster_url: String,
}

impl AppState {
    pub fn new(store: Arc<MovieStore>, posters: PosterFetcher, settings: ApiSettings) -> Self {
        Self {
            store,
            posters,
            settings,
        }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/movies", get(movies::list))
        .route("/recommendations", get(recommendations::recommend))
        .route("/posters/:movie_id", get(posters::poster))
}

/// Health check endpoint
async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "movies": state.store.len(),
            "loaded_at": state.store.loaded_at(),
        })),
    )
}
