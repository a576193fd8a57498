pub mod health;

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /generate                 submit a generation job
///
/// /jobs                     list jobs (query: user_id, status, limit, offset)
/// /jobs/{id}                fetch one job
/// /jobs/{id}/result         serve the persisted result artifact
/// /jobs/{id}/rerun          resubmit as a new job
///
/// /settings                 upsert backend credentials and endpoints
/// ```
///
/// Result files are additionally served statically under `/results`
/// at the root level (see `main.rs`).
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/generate", post(handlers::generate::generate))
        .route("/jobs", get(handlers::jobs::list_jobs))
        .route("/jobs/{id}", get(handlers::jobs::get_job))
        .route("/jobs/{id}/result", get(handlers::jobs::get_job_result))
        .route("/jobs/{id}/rerun", post(handlers::jobs::rerun_job))
        .route("/settings", put(handlers::settings::put_settings))
}
