use crate::api::handlers::{
    dashboard::{current, index, radar, series},
    health::health_check,
    observations::add_observation,
};
use crate::api::schemas::AppState;
use axum::{routing::get, Router};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_seconds);

    Router::new()
        // Station upload
        .route("/addWeatherObservation", get(add_observation))
        // Dashboard
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/api/current", get(current))
        .route("/api/series", get(series))
        .route("/api/radar.gif", get(radar))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(timeout))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
