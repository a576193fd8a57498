use std::sync::Arc;

use crate::config::ServerConfig;
use crate::engine::poller::PollerSupervisor;
use crate::storage::LocalStorage;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: pixelmill_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Durable local storage for results and archived inputs.
    pub storage: Arc<LocalStorage>,
    /// Shared HTTP client (RunPod submissions, result downloads).
    pub http: reqwest::Client,
    /// Supervisor for detached completion-poller tasks.
    pub poller: Arc<PollerSupervisor>,
}
