//! Job read and re-run handlers.
//!
//! Routes:
//! - `GET  /jobs`              — list a user's jobs
//! - `GET  /jobs/{id}`         — fetch one job
//! - `GET  /jobs/{id}/result`  — serve the persisted result artifact
//! - `POST /jobs/{id}/rerun`   — resubmit a job as a new job

use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use pixelmill_core::error::CoreError;
use pixelmill_core::model;
use pixelmill_core::types::JobId;
use pixelmill_db::models::job::{Job, JobListQuery, NewJob};
use pixelmill_db::models::status::JobStatus;
use pixelmill_db::repositories::{JobRepo, LedgerRepo};

use crate::error::{AppError, AppResult};
use crate::handlers::generate::{
    fail_job, job_type, load_settings, resolve_endpoint, submit_and_track,
};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<Json<DataResponse<Job>>> {
    let job = find_job(&state, job_id).await?;
    Ok(Json(DataResponse { data: job }))
}

/// GET /api/v1/jobs?user_id=...&status=...&limit=...&offset=...
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> AppResult<Json<DataResponse<Vec<Job>>>> {
    let jobs = JobRepo::list(&state.pool, &query).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/jobs/{id}/result
///
/// Serves the locally persisted artifact. This is also the fallback
/// reference handed out when ingestion could not store a file, so a
/// missing file is an expected 404, not a server error.
pub async fn get_job_result(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let job = find_job(&state, job_id).await?;

    let extension = model::find(&job.model_id)
        .map(|spec| spec.extension)
        .unwrap_or("png");

    let path = match &job.result_path {
        Some(path) => std::path::PathBuf::from(path),
        None => state.storage.result_file_path(job.id, extension),
    };

    let bytes = tokio::fs::read(&path).await.map_err(|_| {
        AppError::Core(CoreError::NotFound {
            entity: "Result",
            id: job.id,
        })
    })?;

    Ok(([(CONTENT_TYPE, content_type(extension))], bytes))
}

/// POST /api/v1/jobs/{id}/rerun
///
/// Creates a fresh job from a previous job's stored prompt and
/// parameters and submits it. Models that consume audio tracks cannot
/// be re-run: the tracks are not archived at submission time.
pub async fn rerun_job(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<Json<crate::handlers::generate::GenerateResponse>> {
    let original = find_job(&state, job_id).await?;

    let spec = model::find(&original.model_id).ok_or_else(|| {
        AppError::Core(CoreError::Validation(format!(
            "Model '{}' is no longer available",
            original.model_id
        )))
    })?;

    if spec.takes_audio {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Model '{}' cannot be re-run: audio tracks are not archived",
            spec.id
        ))));
    }

    // Re-encode the archived input image, if the model consumed one.
    let input_image = match (&original.input_path, spec.takes_input_image) {
        (Some(path), true) => {
            let bytes = tokio::fs::read(path).await.map_err(|err| {
                AppError::InternalError(format!("archived input is unreadable: {err}"))
            })?;
            Some(BASE64.encode(bytes))
        }
        _ => None,
    };

    let settings = load_settings(&state, &original.user_id).await?;
    let endpoint_id = resolve_endpoint(&settings, spec)?.to_string();

    let new_id = uuid::Uuid::now_v7();
    let job = JobRepo::create(
        &state.pool,
        &NewJob {
            id: new_id,
            user_id: &original.user_id,
            workspace_id: original.workspace_id.as_deref(),
            job_type: job_type(spec),
            model_id: spec.id,
            prompt: &original.prompt,
            params: &original.params,
            input_path: original.input_path.as_deref(),
            endpoint_id: &endpoint_id,
            status: JobStatus::Queued,
        },
    )
    .await?;

    if let Err(err) =
        LedgerRepo::debit(&state.pool, &original.user_id, job.id, spec.id, spec.cost).await
    {
        return Err(fail_job(&state, job.id, format!("failed to record ledger debit: {err}")).await);
    }

    let params = original
        .params
        .as_object()
        .cloned()
        .unwrap_or_default();
    let request_input =
        pixelmill_runpod::payload::build_input(spec, &params, input_image.as_deref(), &[]);

    match JobRepo::mark_processing(&state.pool, job.id).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(job_id = %job.id, "Re-run job left the queued state unexpectedly");
        }
        Err(err) => {
            return Err(fail_job(&state, job.id, format!("failed to start processing: {err}")).await);
        }
    }

    let external_job_id =
        submit_and_track(&state, &settings, &endpoint_id, job.id, &request_input).await?;

    tracing::info!(job_id = %job.id, original_job_id = %job_id, "Job re-run submitted");

    Ok(Json(crate::handlers::generate::GenerateResponse {
        job_id: job.id,
        external_job_id,
        status: JobStatus::Processing,
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_job(state: &AppState, job_id: JobId) -> AppResult<Job> {
    JobRepo::find_by_id(&state.pool, job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))
}

fn content_type(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}
