//! Result ingestion: normalize a terminal backend output map into a
//! web-addressable artifact on the job row.
//!
//! Every path through here ends in a completed job with a non-null
//! result reference. When nothing can be persisted the reference
//! degrades (remote URL kept as-is, or the retrieval-endpoint
//! fallback) and an `ingest_note` records how.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use pixelmill_core::model::{self, MediaKind};
use pixelmill_core::output::{fallback_result_path, redact_echo, select_source, OutputSource};
use pixelmill_core::types::JobId;
use pixelmill_db::models::job::{IngestedResult, Job};
use pixelmill_db::repositories::JobRepo;

use crate::engine::poller::PollerContext;
use crate::storage::LocalStorage;

/// The backend returned no recognizable artifact field.
pub const NOTE_NO_OUTPUT: &str = "no_output";
/// An artifact was found but could not be decoded or written locally.
pub const NOTE_FAILED_TO_SAVE: &str = "failed_to_save";
/// A remote URL could not be mirrored locally and is served as-is.
pub const NOTE_KEPT_REMOTE_URL: &str = "kept_remote_url";

/// The resolved result reference for a completed job.
#[derive(Debug)]
pub struct Artifact {
    /// Web-addressable result reference (local `/results/...` path,
    /// the original remote URL, or the retrieval-endpoint fallback).
    pub result_url: String,
    /// Filesystem path when the artifact was persisted locally.
    pub result_path: Option<String>,
    /// Degradation marker, absent on the happy path.
    pub note: Option<&'static str>,
}

/// Resolve the output map into a result reference, persisting the
/// artifact locally when possible.
///
/// Database-free so the precedence and degradation rules are testable
/// without a pool.
pub async fn resolve_artifact(
    storage: &LocalStorage,
    http: &reqwest::Client,
    job_id: JobId,
    kind: MediaKind,
    extension: &str,
    output: Option<&serde_json::Value>,
) -> Artifact {
    match select_source(kind, output) {
        OutputSource::Inline { field, data } => {
            let bytes = match BASE64.decode(data.as_bytes()) {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::warn!(job_id = %job_id, field, error = %err, "Inline payload is not valid base64");
                    return fallback(job_id, NOTE_FAILED_TO_SAVE);
                }
            };
            match storage.save_result(job_id, extension, &bytes).await {
                Ok(saved) => Artifact {
                    result_url: saved.url,
                    result_path: Some(saved.path),
                    note: None,
                },
                Err(err) => {
                    tracing::warn!(job_id = %job_id, field, error = %err, "Failed to write result file");
                    fallback(job_id, NOTE_FAILED_TO_SAVE)
                }
            }
        }

        OutputSource::RemoteUrl { field, url } => {
            match download(http, &url).await {
                Ok(bytes) => match storage.save_result(job_id, extension, &bytes).await {
                    Ok(saved) => Artifact {
                        result_url: saved.url,
                        result_path: Some(saved.path),
                        note: None,
                    },
                    Err(err) => {
                        tracing::warn!(job_id = %job_id, field, error = %err, "Failed to mirror remote result locally");
                        Artifact {
                            result_url: url,
                            result_path: None,
                            note: Some(NOTE_KEPT_REMOTE_URL),
                        }
                    }
                },
                Err(err) => {
                    tracing::warn!(job_id = %job_id, field, url = %url, error = %err, "Failed to download remote result");
                    Artifact {
                        result_url: url,
                        result_path: None,
                        note: Some(NOTE_KEPT_REMOTE_URL),
                    }
                }
            }
        }

        OutputSource::Unrecognized => {
            tracing::warn!(job_id = %job_id, "Backend output had no recognizable artifact field");
            fallback(job_id, NOTE_NO_OUTPUT)
        }
    }
}

/// Ingest a COMPLETED job's output and move the row to `completed`.
pub async fn ingest_result(
    ctx: &PollerContext,
    job: &Job,
    output: Option<serde_json::Value>,
) -> Result<(), sqlx::Error> {
    let (kind, extension) = match model::find(&job.model_id) {
        Some(spec) => (spec.kind, spec.extension),
        None => {
            // Catalog drift: the model was removed after submission.
            tracing::warn!(job_id = %job.id, model_id = %job.model_id, "Unknown model at ingestion, assuming image/png");
            (MediaKind::Image, "png")
        }
    };

    let artifact = resolve_artifact(
        &ctx.storage,
        &ctx.http,
        job.id,
        kind,
        extension,
        output.as_ref(),
    )
    .await;

    let echo = output.as_ref().map(redact_echo);

    let updated = JobRepo::complete_ingested(
        &ctx.pool,
        job.id,
        &IngestedResult {
            result_url: &artifact.result_url,
            result_path: artifact.result_path.as_deref(),
            output_echo: echo.as_ref(),
            ingest_note: artifact.note,
        },
    )
    .await?;

    if updated {
        tracing::info!(
            job_id = %job.id,
            result_url = %artifact.result_url,
            ingest_note = artifact.note.unwrap_or("-"),
            "Job completed"
        );
    } else {
        tracing::warn!(job_id = %job.id, "Job reached a terminal state before ingestion; result discarded");
    }
    Ok(())
}

fn fallback(job_id: JobId, note: &'static str) -> Artifact {
    Artifact {
        result_url: fallback_result_path(job_id),
        result_path: None,
        note: Some(note),
    }
}

async fn download(http: &reqwest::Client, url: &str) -> Result<Vec<u8>, reqwest::Error> {
    let response = http.get(url).send().await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}
