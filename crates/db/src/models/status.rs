//! Job lifecycle status.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a generation job.
///
/// Transitions are strictly forward: `Queued -> Processing ->
/// {Completed | Failed}`. A job never re-enters `Processing` after
/// reaching a terminal state; the repository enforces this with
/// status guards on every terminal update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether no further automatic transition will occur.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}
