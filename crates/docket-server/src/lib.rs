pub mod logging;
pub mod page;
pub mod routes;

use std::{sync::Arc, time::Instant};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use docket_core::{analysis::Analyzer, config::Config, llm::CompletionBackend, session::SessionStore};
use tower_http::trace::TraceLayer;

use crate::logging::LogHub;

// ── AppState ──────────────────────────────────────────────────────────────

pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: SessionStore,
    pub analyzer: Analyzer,
    pub logs: LogHub,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config, backend: Arc<dyn CompletionBackend>, logs: LogHub) -> Self {
        Self {
            sessions: SessionStore::new(config.session_max_age_minutes),
            analyzer: Analyzer::new(backend, config.chat_history_turns),
            config: Arc::new(config),
            logs,
            start_time: Instant::now(),
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    // Multipart framing adds a little on top of the file itself.
    let body_limit = state.config.max_upload_bytes() + 64 * 1024;

    Router::new()
        // Page
        .route("/", get(routes::index))
        .route("/analyze", post(routes::analyze))
        .route("/chat", post(routes::chat))
        .route("/reset", post(routes::reset))
        .route("/export", get(routes::export))
        // JSON API
        .route("/api/health", get(routes::health))
        .route("/api/session", get(routes::get_session))
        // SSE logs
        .route("/api/logs", get(routes::sse_logs))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Periodically drop idle sessions.
pub fn spawn_session_pruner(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            state.sessions.prune_expired().await;
        }
    })
}
