//! # Settings Repository
//!
//! Durable key-value pairs. The server keeps the cashier's last selected
//! event and point-of-sale here so a restart resumes in the same scope.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Key of the persisted event selection.
pub const SELECTED_EVENT_KEY: &str = "pos.selectedEventId";

/// Key of the persisted point-of-sale selection.
pub const SELECTED_POINT_OF_SALE_KEY: &str = "pos.selectedPointOfSaleId";

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    /// Upserts a value.
    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        debug!(key = %key, "Saving setting");

        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Removes a key. Absent keys are ignored.
    pub async fn remove(&self, key: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM settings WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Sets the key when `value` is present, removes it otherwise.
    pub async fn set_optional(&self, key: &str, value: Option<&str>) -> DbResult<()> {
        match value {
            Some(value) => self.set(key, value).await,
            None => self.remove(key).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_set_get_overwrite_remove() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let settings = db.settings();

        assert_eq!(settings.get(SELECTED_EVENT_KEY).await.unwrap(), None);

        settings.set(SELECTED_EVENT_KEY, "e1").await.unwrap();
        settings.set(SELECTED_EVENT_KEY, "e2").await.unwrap();
        assert_eq!(settings.get(SELECTED_EVENT_KEY).await.unwrap().as_deref(), Some("e2"));

        settings.set_optional(SELECTED_EVENT_KEY, None).await.unwrap();
        assert_eq!(settings.get(SELECTED_EVENT_KEY).await.unwrap(), None);
    }
}
