//! Supervised completion pollers.
//!
//! Each submitted job gets a detached task that polls the remote
//! backend until the job reaches a terminal state. Tasks are spawned
//! on a [`TaskTracker`] under a shared [`CancellationToken`] so
//! shutdown can stop and await them instead of abandoning them, and
//! each task must win the per-job database lease before polling so a
//! job is never polled twice concurrently.

use std::sync::Arc;
use std::time::Duration;

use pixelmill_core::model;
use pixelmill_core::types::JobId;
use pixelmill_db::repositories::{JobRepo, SettingsRepo};
use pixelmill_db::DbPool;
use pixelmill_runpod::{RunpodClient, RunpodError};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::ServerConfig;
use crate::engine::ingest;
use crate::storage::LocalStorage;

/// Lease headroom past the poll timeout, covering ingestion and the
/// final database write.
const LEASE_GRACE_SECS: i64 = 120;

/// Poll timeout used when neither the user settings nor the model
/// catalog provide one.
const FALLBACK_TIMEOUT_SECS: u64 = 1800;

/// Everything a poller task needs, cloneable per spawn.
#[derive(Clone)]
pub struct PollerContext {
    pub pool: DbPool,
    pub config: Arc<ServerConfig>,
    pub storage: Arc<LocalStorage>,
    pub http: reqwest::Client,
}

/// Owns the lifecycle of all completion-poller tasks.
pub struct PollerSupervisor {
    ctx: PollerContext,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl PollerSupervisor {
    pub fn new(ctx: PollerContext) -> Self {
        Self {
            ctx,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Spawn a detached poller for a submitted job.
    pub fn spawn_poller(&self, job_id: JobId) {
        let ctx = self.ctx.clone();
        let cancel = self.cancel.child_token();
        self.tracker.spawn(async move {
            run_poller(ctx, job_id, cancel).await;
        });
    }

    /// Restart pollers for jobs that were in flight when the previous
    /// process stopped. Returns how many were resumed.
    pub async fn resume_incomplete(&self) -> Result<usize, sqlx::Error> {
        let jobs = JobRepo::find_resumable(&self.ctx.pool).await?;
        for job in &jobs {
            tracing::info!(job_id = %job.id, "Resuming completion poller");
            self.spawn_poller(job.id);
        }
        Ok(jobs.len())
    }

    /// Cancel all pollers and wait for them to finish, up to `timeout`.
    pub async fn shutdown(&self, timeout: Duration) {
        self.cancel.cancel();
        self.tracker.close();
        if tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_err()
        {
            tracing::warn!("Completion pollers did not stop within the shutdown timeout");
        }
    }
}

/// Poll one job to a terminal state.
///
/// Errors inside the task never escape it: every outcome is recorded
/// on the job row or logged.
async fn run_poller(ctx: PollerContext, job_id: JobId, cancel: CancellationToken) {
    let job = match JobRepo::find_by_id(&ctx.pool, job_id).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            tracing::warn!(job_id = %job_id, "Poller started for a job that no longer exists");
            return;
        }
        Err(err) => {
            tracing::error!(job_id = %job_id, error = %err, "Failed to load job for polling");
            return;
        }
    };

    let Some(external_job_id) = job.external_job_id.clone() else {
        mark_failed(&ctx.pool, job_id, "job has no backend reference").await;
        return;
    };

    let settings = match SettingsRepo::find_by_user(&ctx.pool, &job.user_id).await {
        Ok(Some(settings)) => settings,
        Ok(None) => {
            mark_failed(&ctx.pool, job_id, "backend settings were removed before completion").await;
            return;
        }
        Err(err) => {
            tracing::error!(job_id = %job_id, error = %err, "Failed to load backend settings for polling");
            return;
        }
    };

    // A negative stored override is treated as absent.
    let timeout_secs = settings
        .poll_timeout_secs
        .and_then(|secs| u64::try_from(secs).ok())
        .or_else(|| model::find(&job.model_id).map(|spec| spec.default_timeout_secs))
        .unwrap_or(FALLBACK_TIMEOUT_SECS);

    match JobRepo::acquire_lease(&ctx.pool, job_id, timeout_secs as i64 + LEASE_GRACE_SECS).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!(job_id = %job_id, "Poll lease is held elsewhere, skipping");
            return;
        }
        Err(err) => {
            tracing::error!(job_id = %job_id, error = %err, "Failed to acquire poll lease");
            return;
        }
    }

    let client = RunpodClient::with_http(
        ctx.http.clone(),
        &ctx.config.runpod_base_url,
        &settings.api_key,
    )
    .with_poll_interval(ctx.config.poll_interval);

    tracing::info!(
        job_id = %job_id,
        external_job_id = %external_job_id,
        timeout_secs,
        "Polling for completion"
    );

    tokio::select! {
        _ = cancel.cancelled() => {
            if let Err(err) = JobRepo::release_lease(&ctx.pool, job_id).await {
                tracing::error!(job_id = %job_id, error = %err, "Failed to release poll lease on shutdown");
            } else {
                tracing::info!(job_id = %job_id, "Poller cancelled, lease released");
            }
        }

        result = client.wait_for_completion(
            &job.endpoint_id,
            &external_job_id,
            Duration::from_secs(timeout_secs),
        ) => match result {
            Ok(output) => {
                if let Err(err) = ingest::ingest_result(&ctx, &job, output).await {
                    tracing::error!(job_id = %job_id, error = %err, "Failed to record ingested result");
                }
            }
            Err(RunpodError::BackendFailed(message)) => {
                // Stored verbatim so the client sees what the worker said.
                mark_failed(&ctx.pool, job_id, &message).await;
            }
            Err(err) => {
                mark_failed(&ctx.pool, job_id, &err.to_string()).await;
            }
        },
    }
}

async fn mark_failed(pool: &DbPool, job_id: JobId, message: &str) {
    match JobRepo::fail(pool, job_id, message).await {
        Ok(true) => tracing::info!(job_id = %job_id, error = %message, "Job failed"),
        Ok(false) => {
            tracing::warn!(job_id = %job_id, "Job already terminal, failure not recorded")
        }
        Err(err) => {
            tracing::error!(job_id = %job_id, error = %err, "Failed to record job failure")
        }
    }
}
