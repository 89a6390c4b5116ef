//! HTTP front end for merging QBR report fields into PPTX templates.

pub mod api;
pub mod config;
pub mod error;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use state::AppState;

pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/process-pptx", post(api::process_pptx))
        .route("/health", get(api::health_check))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}
