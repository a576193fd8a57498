//! Generation submission handler.
//!
//! Routes:
//! - `POST /generate` — validate, persist a job, submit it to the
//!   remote backend, and hand off to a detached completion poller.
//!
//! Submission order is deliberate: the Job row exists before the
//! remote call, so a backend rejection is recorded on a durable row
//! and the client receives its id.

use axum::extract::State;
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use pixelmill_core::error::CoreError;
use pixelmill_core::model::{self, MediaKind, ModelSpec};
use pixelmill_core::types::JobId;
use pixelmill_db::models::job::NewJob;
use pixelmill_db::models::settings::BackendSettings;
use pixelmill_db::models::status::JobStatus;
use pixelmill_db::repositories::{JobRepo, LedgerRepo, SettingsRepo};
use pixelmill_runpod::{payload, RunpodClient};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /api/v1/generate request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub user_id: String,
    pub workspace_id: Option<String>,
    pub model_id: String,

    pub prompt: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub seed: Option<i64>,
    pub guidance: Option<f64>,
    pub cfg: Option<f64>,
    pub num_frames: Option<u32>,

    /// Base64 input image for models that consume one.
    pub input_image: Option<String>,
    /// Base64 audio tracks for models that consume them.
    #[serde(default)]
    pub audio_tracks: Vec<String>,
}

/// Hand-off response. Returned bare (no `data` envelope) because its
/// shape is part of the client contract.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub job_id: JobId,
    pub external_job_id: String,
    pub status: JobStatus,
}

/// POST /api/v1/generate
///
/// Validation and configuration errors reject the request before any
/// Job row exists. After the row is created, failures surface as
/// `SUBMISSION_FAILED` with the job id.
pub async fn generate(
    State(state): State<AppState>,
    Json(input): Json<GenerateRequest>,
) -> AppResult<Json<GenerateResponse>> {
    let spec = model::find(&input.model_id).ok_or_else(|| {
        AppError::Core(CoreError::Validation(format!(
            "Unknown model '{}'",
            input.model_id
        )))
    })?;

    let params = build_params(&input);

    if spec.required_params.contains(&"prompt") {
        model::validate_prompt(input.prompt.as_deref().unwrap_or("")).map_err(AppError::Core)?;
    }
    model::validate_params(spec, &params).map_err(AppError::Core)?;
    model::validate_media(spec, input.input_image.is_some(), input.audio_tracks.len())
        .map_err(AppError::Core)?;

    let settings = load_settings(&state, &input.user_id).await?;
    let endpoint_id = resolve_endpoint(&settings, spec)?.to_string();

    let job_id = uuid::Uuid::now_v7();

    // Archive the input image before creating the row so the row can
    // reference it.
    let input_path = match &input.input_image {
        Some(image) => Some(archive_input_image(&state, job_id, image).await?),
        None => None,
    };

    let job = JobRepo::create(
        &state.pool,
        &NewJob {
            id: job_id,
            user_id: &input.user_id,
            workspace_id: input.workspace_id.as_deref(),
            job_type: job_type(spec),
            model_id: spec.id,
            prompt: input.prompt.as_deref().unwrap_or(""),
            params: &Value::Object(params.clone()),
            input_path: input_path.as_deref(),
            endpoint_id: &endpoint_id,
            status: JobStatus::Processing,
        },
    )
    .await?;

    if let Err(err) = LedgerRepo::debit(&state.pool, &input.user_id, job.id, spec.id, spec.cost).await
    {
        return Err(fail_job(&state, job.id, format!("failed to record ledger debit: {err}")).await);
    }

    let request_input = payload::build_input(
        spec,
        &params,
        input.input_image.as_deref(),
        &input.audio_tracks,
    );

    let external_job_id = submit_and_track(&state, &settings, &endpoint_id, job.id, &request_input).await?;

    Ok(Json(GenerateResponse {
        job_id: job.id,
        external_job_id,
        status: JobStatus::Processing,
    }))
}

// ---------------------------------------------------------------------------
// Shared submission helpers (also used by re-run)
// ---------------------------------------------------------------------------

/// Fetch the user's backend settings or reject with a setup-required
/// configuration error.
pub(crate) async fn load_settings(
    state: &AppState,
    user_id: &str,
) -> AppResult<BackendSettings> {
    SettingsRepo::find_by_user(&state.pool, user_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Configuration(
                "RunPod API key is not configured".into(),
            ))
        })
}

/// Resolve the endpoint configured for a model or reject with a
/// configuration error.
pub(crate) fn resolve_endpoint<'a>(
    settings: &'a BackendSettings,
    spec: &ModelSpec,
) -> AppResult<&'a str> {
    settings.endpoint_for(spec.id).ok_or_else(|| {
        AppError::Core(CoreError::Configuration(format!(
            "No endpoint configured for model '{}'",
            spec.id
        )))
    })
}

/// Submit to the remote backend, record the external reference, and
/// start the completion poller.
///
/// On rejection the job is marked failed before the error is returned,
/// so the stored record and the response agree.
pub(crate) async fn submit_and_track(
    state: &AppState,
    settings: &BackendSettings,
    endpoint_id: &str,
    job_id: JobId,
    request_input: &Value,
) -> AppResult<String> {
    let client = RunpodClient::with_http(
        state.http.clone(),
        &state.config.runpod_base_url,
        &settings.api_key,
    );

    let external_job_id = match client.submit(endpoint_id, request_input).await {
        Ok(id) => id,
        Err(err) => return Err(fail_job(state, job_id, err.to_string()).await),
    };

    match JobRepo::attach_external_id(&state.pool, job_id, &external_job_id).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(job_id = %job_id, "Job became terminal before its external id was recorded");
        }
        Err(err) => {
            return Err(fail_job(
                state,
                job_id,
                format!("failed to record backend reference: {err}"),
            )
            .await);
        }
    }

    state.poller.spawn_poller(job_id);

    tracing::info!(
        job_id = %job_id,
        external_job_id = %external_job_id,
        endpoint_id,
        "Job submitted"
    );

    Ok(external_job_id)
}

/// Record a post-creation failure on the job row and surface it with
/// the job id.
///
/// Every error after the Job record exists goes through here, so the
/// row always reaches a terminal state and the client can re-read it.
pub(crate) async fn fail_job(state: &AppState, job_id: JobId, message: String) -> AppError {
    if let Err(db_err) = JobRepo::fail(&state.pool, job_id, &message).await {
        tracing::error!(job_id = %job_id, error = %db_err, "Failed to record job failure");
    }
    AppError::Submission { job_id, message }
}

pub(crate) fn job_type(spec: &ModelSpec) -> &'static str {
    match spec.kind {
        MediaKind::Image => "image",
        MediaKind::Video => "video",
    }
}

/// Decode and archive a base64 input image, returning its stored path.
async fn archive_input_image(
    state: &AppState,
    job_id: JobId,
    image: &str,
) -> AppResult<String> {
    let bytes = BASE64
        .decode(image.as_bytes())
        .map_err(|_| AppError::BadRequest("input image is not valid base64".into()))?;
    state
        .storage
        .archive_input(job_id, "image", &bytes)
        .await
        .map_err(|err| AppError::InternalError(format!("failed to archive input image: {err}")))
}

/// Collect the optional generation parameters into the map stored on
/// the job row and forwarded to the backend.
fn build_params(input: &GenerateRequest) -> Map<String, Value> {
    let mut params = Map::new();
    if let Some(prompt) = &input.prompt {
        params.insert("prompt".into(), Value::String(prompt.clone()));
    }
    if let Some(width) = input.width {
        params.insert("width".into(), width.into());
    }
    if let Some(height) = input.height {
        params.insert("height".into(), height.into());
    }
    if let Some(seed) = input.seed {
        params.insert("seed".into(), seed.into());
    }
    if let Some(guidance) = input.guidance {
        params.insert("guidance".into(), guidance.into());
    }
    if let Some(cfg) = input.cfg {
        params.insert("cfg".into(), cfg.into());
    }
    if let Some(num_frames) = input.num_frames {
        params.insert("num_frames".into(), num_frames.into());
    }
    params
}
