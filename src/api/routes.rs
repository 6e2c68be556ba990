use crate::api::{handlers, AppState};
use crate::metrics::track_http;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    let timeout = state.request_timeout;

    Router::new()
        // Health and metrics
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        // Webhook ingestion, one path per source
        .route("/inbound/:source/:org_key", post(handlers::receive_webhook))
        // Operational controls
        .route("/api/safety/stats", get(handlers::safety_stats))
        .route("/api/safety/cleanup", post(handlers::safety_cleanup))
        // Incident lookup
        .route("/v1/incidents/:id", get(handlers::get_incident))
        .route_layer(middleware::from_fn(track_http))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(false))
                .on_response(DefaultOnResponse::new()),
        )
        .layer(TimeoutLayer::new(timeout))
        .layer(CorsLayer::permissive())
}
