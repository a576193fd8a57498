//! Repository for the `ledger_entries` table.

use pixelmill_core::types::JobId;
use sqlx::PgPool;

use crate::models::ledger::LedgerEntry;

const COLUMNS: &str = "id, user_id, job_id, model_id, amount, created_at";

/// Records generation debits. One entry per submission.
pub struct LedgerRepo;

impl LedgerRepo {
    /// Record a debit for a submitted job.
    pub async fn debit(
        pool: &PgPool,
        user_id: &str,
        job_id: JobId,
        model_id: &str,
        amount: i64,
    ) -> Result<LedgerEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO ledger_entries (user_id, job_id, model_id, amount) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, LedgerEntry>(&query)
            .bind(user_id)
            .bind(job_id)
            .bind(model_id)
            .bind(amount)
            .fetch_one(pool)
            .await
    }

    /// All ledger entries recorded for a job.
    pub async fn find_by_job(pool: &PgPool, job_id: JobId) -> Result<Vec<LedgerEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM ledger_entries WHERE job_id = $1");
        sqlx::query_as::<_, LedgerEntry>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }
}
