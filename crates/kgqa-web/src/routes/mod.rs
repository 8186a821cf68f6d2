//! HTTP routes for the question-answering API.

mod api;

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/nodes", get(api::get_nodes))
        .route("/api/edges", get(api::get_edges))
        .route("/api/build", post(api::build))
        .route("/api/ask", post(api::ask))
        // CORS for development
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
