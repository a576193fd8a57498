//! Per-user remote backend settings.

use pixelmill_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `backend_settings` table.
///
/// Supplies the bearer credential, the per-model endpoint map, and an
/// optional poll-timeout override. Absence of any required piece is a
/// configuration error at submission time, never a crash.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BackendSettings {
    pub user_id: String,
    pub api_key: String,
    /// Map of `model_id` to RunPod endpoint identifier.
    pub endpoints: serde_json::Value,
    pub poll_timeout_secs: Option<i32>,
    pub updated_at: Timestamp,
}

impl BackendSettings {
    /// Resolve the endpoint identifier configured for a model.
    pub fn endpoint_for(&self, model_id: &str) -> Option<&str> {
        self.endpoints.get(model_id).and_then(|v| v.as_str())
    }
}

/// DTO for `PUT /api/v1/settings`.
#[derive(Debug, Deserialize)]
pub struct UpsertSettings {
    pub user_id: String,
    pub api_key: String,
    pub endpoints: serde_json::Value,
    pub poll_timeout_secs: Option<i32>,
}
