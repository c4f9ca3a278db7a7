use crate::api::{handlers, AppState};
use crate::metrics::track_metrics;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};

/// Build the main API router
///
/// CORS is left to the caller so it can follow configuration.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Liveness
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health_check))
        // Inference
        .route("/predict", post(handlers::predict))
        // Prometheus scrape endpoint
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(track_metrics))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
}
