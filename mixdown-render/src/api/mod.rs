//! REST API for the render service
//!
//! Implements preview submission, job polling, artifact retrieval, job
//! deletion and the SSE lifecycle event stream.

pub mod handlers;
pub mod sse;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::ledger::JobLedger;
use crate::orchestrator::RenderOrchestrator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Render orchestrator
    pub orchestrator: Arc<RenderOrchestrator>,
    /// Job ledger (polling, listing, SSE subscription)
    pub ledger: Arc<JobLedger>,
    /// Server port
    pub port: u16,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check (no prefix for health endpoint)
        .route("/health", get(health_check))

        // API v1 routes
        .nest("/api/v1", Router::new()
            // Preview rendering
            .route("/preview", post(handlers::submit_preview))
            .route("/preview/:job_id/artifact", get(handlers::get_artifact))

            // Job polling and management
            .route("/jobs", get(handlers::list_jobs))
            .route("/jobs/:job_id", get(handlers::get_job).delete(handlers::delete_job))

            // SSE lifecycle events
            .route("/events", get(sse::sse_handler))
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "mixdown-render",
        "version": env!("CARGO_PKG_VERSION"),
        "port": state.port
    }))
}
