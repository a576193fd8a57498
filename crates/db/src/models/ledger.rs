//! Ledger entry model: one debit row per generation submission.

use pixelmill_core::types::{JobId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `ledger_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub user_id: String,
    pub job_id: JobId,
    pub model_id: String,
    pub amount: i64,
    pub created_at: Timestamp,
}
