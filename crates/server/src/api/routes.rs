use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{generation, handlers, middleware::metrics_middleware, predictions};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Prediction proxy
        .route("/predictions", post(predictions::create_prediction))
        .route("/predictions/{id}", get(predictions::get_prediction))
        // Pipeline
        .route(
            "/generation",
            post(generation::start_generation)
                .get(generation::get_generation)
                .delete(generation::reset_generation),
        );

    Router::new()
        .nest("/api", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
