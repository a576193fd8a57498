//! Repository for the `jobs` table.
//!
//! Every mutation is a field-level `UPDATE` scoped to one concern
//! (backend linkage, ingestion metadata, failure), so independent
//! asynchronous writers never read-merge-write a shared blob.
//! Terminal transitions are guarded: they only apply while the job is
//! still in a non-terminal status, which both keeps the status
//! monotonic and makes `completed_at` single-assignment.

use pixelmill_core::types::JobId;
use sqlx::PgPool;

use crate::models::job::{IngestedResult, Job, JobListQuery, NewJob};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, user_id, workspace_id, job_type, model_id, prompt, params, \
    input_path, endpoint_id, external_job_id, status, \
    result_url, result_path, output_echo, ingest_note, ingested_at, \
    error, lease_expires_at, created_at, completed_at";

/// Maximum page size for job listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for job listing.
const DEFAULT_LIMIT: i64 = 50;

/// Provides CRUD and lifecycle operations for generation jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a new job row.
    pub async fn create(pool: &PgPool, input: &NewJob<'_>) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs \
                 (id, user_id, workspace_id, job_type, model_id, prompt, \
                  params, input_path, endpoint_id, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(input.id)
            .bind(input.user_id)
            .bind(input.workspace_id)
            .bind(input.job_type)
            .bind(input.model_id)
            .bind(input.prompt)
            .bind(input.params)
            .bind(input.input_path)
            .bind(input.endpoint_id)
            .bind(input.status)
            .fetch_one(pool)
            .await
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: JobId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's jobs, newest first, with optional status filter.
    pub async fn list(pool: &PgPool, params: &JobListQuery) -> Result<Vec<Job>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = params.offset.unwrap_or(0);

        let query = if params.status.is_some() {
            format!(
                "SELECT {COLUMNS} FROM jobs \
                 WHERE user_id = $1 AND status = $2 \
                 ORDER BY created_at DESC LIMIT $3 OFFSET $4"
            )
        } else {
            format!(
                "SELECT {COLUMNS} FROM jobs \
                 WHERE user_id = $1 \
                 ORDER BY created_at DESC LIMIT $2 OFFSET $3"
            )
        };

        let mut q = sqlx::query_as::<_, Job>(&query).bind(&params.user_id);
        if let Some(status) = params.status {
            q = q.bind(status);
        }
        q.bind(limit).bind(offset).fetch_all(pool).await
    }

    /// Record the external job reference after a successful submission.
    ///
    /// Returns `false` if the job no longer exists or already reached a
    /// terminal state.
    pub async fn attach_external_id(
        pool: &PgPool,
        id: JobId,
        external_job_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET external_job_id = $2 \
             WHERE id = $1 AND status IN ('queued', 'processing')",
        )
        .bind(id)
        .bind(external_job_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move a queued job (e.g. a re-run) into `processing`.
    pub async fn mark_processing(pool: &PgPool, id: JobId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'processing' WHERE id = $1 AND status = 'queued'",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a job as failed with the given error text.
    ///
    /// First terminal transition wins: a job that is already completed
    /// or failed is left untouched and `false` is returned. The same
    /// applies when the row was deleted mid-flight.
    pub async fn fail(pool: &PgPool, id: JobId, error: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status = 'failed', error = $2, completed_at = NOW(), \
                 lease_expires_at = NULL \
             WHERE id = $1 AND status IN ('queued', 'processing')",
        )
        .bind(id)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a job as completed with its ingested result artifact.
    ///
    /// Single update covering all ingestion metadata. Guarded the same
    /// way as [`fail`](Self::fail).
    pub async fn complete_ingested(
        pool: &PgPool,
        id: JobId,
        result: &IngestedResult<'_>,
    ) -> Result<bool, sqlx::Error> {
        let updated = sqlx::query(
            "UPDATE jobs \
             SET status = 'completed', result_url = $2, result_path = $3, \
                 output_echo = $4, ingest_note = $5, \
                 ingested_at = NOW(), completed_at = NOW(), \
                 lease_expires_at = NULL \
             WHERE id = $1 AND status IN ('queued', 'processing')",
        )
        .bind(id)
        .bind(result.result_url)
        .bind(result.result_path)
        .bind(result.output_echo)
        .bind(result.ingest_note)
        .execute(pool)
        .await?;
        Ok(updated.rows_affected() > 0)
    }

    /// Try to acquire the poll lease for a job.
    ///
    /// Compare-and-swap on `lease_expires_at`: succeeds only when no
    /// lease is held or the previous one expired, so at most one poller
    /// is authoritative for a job at a time (including across process
    /// restarts).
    pub async fn acquire_lease(
        pool: &PgPool,
        id: JobId,
        ttl_secs: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET lease_expires_at = NOW() + make_interval(secs => $2) \
             WHERE id = $1 \
               AND status = 'processing' \
               AND (lease_expires_at IS NULL OR lease_expires_at < NOW())",
        )
        .bind(id)
        .bind(ttl_secs as f64)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Release the poll lease without touching the status. Used when a
    /// poller is cancelled during shutdown so a restarted process can
    /// resume immediately instead of waiting out the lease.
    pub async fn release_lease(pool: &PgPool, id: JobId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE jobs SET lease_expires_at = NULL \
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Jobs whose poller should be restarted after a process restart:
    /// still `processing`, already submitted, and not covered by a
    /// live lease.
    pub async fn find_resumable(pool: &PgPool) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE status = 'processing' \
               AND external_job_id IS NOT NULL \
               AND (lease_expires_at IS NULL OR lease_expires_at < NOW()) \
             ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, Job>(&query).fetch_all(pool).await
    }
}
