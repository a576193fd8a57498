//! Backend settings handler.
//!
//! Routes:
//! - `PUT /settings` — create or replace a user's RunPod credentials
//!   and per-model endpoint map.

use axum::extract::State;
use axum::Json;
use pixelmill_core::error::CoreError;
use pixelmill_db::models::settings::{BackendSettings, UpsertSettings};
use pixelmill_db::repositories::SettingsRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// PUT /api/v1/settings
pub async fn put_settings(
    State(state): State<AppState>,
    Json(input): Json<UpsertSettings>,
) -> AppResult<Json<DataResponse<BackendSettings>>> {
    if input.poll_timeout_secs.is_some_and(|secs| secs < 0) {
        return Err(AppError::Core(CoreError::Validation(
            "poll_timeout_secs must not be negative".into(),
        )));
    }

    let settings = SettingsRepo::upsert(&state.pool, &input).await?;
    tracing::info!(user_id = %settings.user_id, "Backend settings updated");
    Ok(Json(DataResponse { data: settings }))
}
