//! netra-server library interface
//!
//! Exposes the router for integration testing.

pub mod api;
pub mod error;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use netra_core::SessionAnalyzer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<SessionAnalyzer>,
}

impl AppState {
    pub fn new(analyzer: SessionAnalyzer) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::home))
        .route("/process", post(api::process))
        .route("/sessions", post(api::create_session))
        // Uploads carry whole recordings; no size limit is imposed here.
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
