//! Repository for the `backend_settings` table.

use sqlx::PgPool;

use crate::models::settings::{BackendSettings, UpsertSettings};

const COLUMNS: &str = "user_id, api_key, endpoints, poll_timeout_secs, updated_at";

/// Per-user RunPod credentials and endpoint configuration.
pub struct SettingsRepo;

impl SettingsRepo {
    /// Fetch a user's backend settings, if configured.
    pub async fn find_by_user(
        pool: &PgPool,
        user_id: &str,
    ) -> Result<Option<BackendSettings>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM backend_settings WHERE user_id = $1");
        sqlx::query_as::<_, BackendSettings>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert or replace a user's backend settings.
    pub async fn upsert(
        pool: &PgPool,
        input: &UpsertSettings,
    ) -> Result<BackendSettings, sqlx::Error> {
        let query = format!(
            "INSERT INTO backend_settings (user_id, api_key, endpoints, poll_timeout_secs) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id) DO UPDATE \
                 SET api_key = EXCLUDED.api_key, \
                     endpoints = EXCLUDED.endpoints, \
                     poll_timeout_secs = EXCLUDED.poll_timeout_secs, \
                     updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BackendSettings>(&query)
            .bind(&input.user_id)
            .bind(&input.api_key)
            .bind(&input.endpoints)
            .bind(input.poll_timeout_secs)
            .fetch_one(pool)
            .await
    }
}
