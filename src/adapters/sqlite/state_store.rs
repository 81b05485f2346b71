//! SQLite implementation of the StateStore.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::StoreError;
use crate::domain::models::{DedupState, DedupStrategy, InstanceKey};
use crate::domain::ports::StateStore;

/// Durable per-instance dedup state, one row per trigger instance.
#[derive(Clone)]
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All persisted instances with their strategy and last update time,
    /// ordered by instance key.
    pub async fn list(&self) -> Result<Vec<(InstanceKey, DedupStrategy, String)>, StoreError> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT instance_key, strategy, updated_at FROM trigger_state ORDER BY instance_key",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(key, strategy, updated_at)| {
                let strategy = DedupStrategy::from_str(&strategy).ok_or_else(|| {
                    StoreError::Serialization(format!("Unknown strategy '{strategy}' for {key}"))
                })?;
                Ok((InstanceKey::new(key), strategy, updated_at))
            })
            .collect()
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn get(&self, instance: &InstanceKey) -> Result<Option<DedupState>, StoreError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT state_json FROM trigger_state WHERE instance_key = ?")
                .bind(instance.as_str())
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((json,)) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, instance: &InstanceKey, state: &DedupState) -> Result<(), StoreError> {
        let state_json = serde_json::to_string(state)?;

        sqlx::query(
            "INSERT INTO trigger_state (instance_key, strategy, state_json, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(instance_key) DO UPDATE SET
                strategy = excluded.strategy,
                state_json = excluded.state_json,
                updated_at = excluded.updated_at",
        )
        .bind(instance.as_str())
        .bind(state.strategy().as_str())
        .bind(&state_json)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, instance: &InstanceKey) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM trigger_state WHERE instance_key = ?")
            .bind(instance.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
