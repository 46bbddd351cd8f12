use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: std::sync::Arc<services::AppState>) -> Router {
    // Host dashboards are browser clients; participant endpoints are called
    // from the quiz frontend as well.
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any); // TODO: restrict to specific origins in production

    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        // Participant endpoints (anonymous, client-generated participant ids)
        .nest("/api/v1/live", live_routes())
        .route("/api/v1/attempts", post(handlers::scores::record_attempt))
        .nest("/api/v1/scores", score_routes())
        // Host endpoints (require JWT)
        .nest(
            "/api/v1/host",
            host_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .with_state(app_state)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn live_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/responses", post(handlers::live::submit_response))
        .route(
            "/responses/{session_code}/{quiz_id}/{question_id}",
            get(handlers::live::get_tally),
        )
}

fn score_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route(
            "/participant/{participant_id}",
            get(handlers::scores::get_by_participant),
        )
        .route(
            "/session/{session_code}",
            get(handlers::scores::get_by_session),
        )
        .route(
            "/session/{session_code}/participant/{participant_id}",
            get(handlers::scores::get_by_session_and_participant),
        )
}

fn host_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route(
            "/sessions/{session_code}/analytics",
            get(handlers::analytics::session_analytics),
        )
        .route("/reset", post(handlers::analytics::reset))
}
