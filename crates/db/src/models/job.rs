//! Job entity model and DTOs.
//!
//! The job row uses typed, independently-updatable columns per
//! concern (request fields, backend linkage, ingestion metadata,
//! failure) instead of a single mutable options blob, so concurrent
//! writers never clobber each other's fields.

use pixelmill_core::types::{JobId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::JobStatus;

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: JobId,
    pub user_id: String,
    pub workspace_id: Option<String>,

    pub job_type: String,
    pub model_id: String,
    pub prompt: String,
    /// Submission parameters, written once at creation.
    pub params: serde_json::Value,
    /// Local path of archived input media, if any.
    pub input_path: Option<String>,

    /// RunPod endpoint the job was submitted to.
    pub endpoint_id: String,
    /// Reference handed out by the remote backend. `None` until
    /// submission succeeds; required before polling can start.
    pub external_job_id: Option<String>,

    pub status: JobStatus,

    pub result_url: Option<String>,
    pub result_path: Option<String>,
    /// Redacted echo of the backend's output map.
    pub output_echo: Option<serde_json::Value>,
    /// Degradation marker from ingestion (`no_output`,
    /// `failed_to_save`, `kept_remote_url`).
    pub ingest_note: Option<String>,
    pub ingested_at: Option<Timestamp>,

    pub error: Option<String>,

    /// Poller single-flight lease; only the holder may poll.
    pub lease_expires_at: Option<Timestamp>,

    pub created_at: Timestamp,
    /// Set exactly once, on the first terminal transition.
    pub completed_at: Option<Timestamp>,
}

/// Fields for inserting a new job row.
#[derive(Debug)]
pub struct NewJob<'a> {
    pub id: JobId,
    pub user_id: &'a str,
    pub workspace_id: Option<&'a str>,
    pub job_type: &'a str,
    pub model_id: &'a str,
    pub prompt: &'a str,
    pub params: &'a serde_json::Value,
    pub input_path: Option<&'a str>,
    pub endpoint_id: &'a str,
    pub status: JobStatus,
}

/// Result artifact handed to the final ingestion update.
#[derive(Debug)]
pub struct IngestedResult<'a> {
    pub result_url: &'a str,
    pub result_path: Option<&'a str>,
    pub output_echo: Option<&'a serde_json::Value>,
    pub ingest_note: Option<&'a str>,
}

/// Query parameters for `GET /api/v1/jobs`.
#[derive(Debug, Deserialize)]
pub struct JobListQuery {
    pub user_id: String,
    pub status: Option<JobStatus>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}
