//! Router

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{
    allocate, analyze_session, create_session, get_session, health_check, list_news,
    news_status, news_summary, reset_session, search_news,
};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & info
        .route("/health", get(health_check))
        // Allocation
        .route("/api/allocate", post(allocate))
        // Sessions
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session))
        .route("/api/sessions/{id}/analyze", post(analyze_session))
        .route("/api/sessions/{id}/reset", post(reset_session))
        // News
        .route("/api/news", get(list_news))
        .route("/api/news/status", get(news_status))
        .route("/api/news/summary", get(news_summary))
        .route("/api/news/search", get(search_news))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
