use serde_json::Value;

use crate::db::Database;
use crate::error::AppResult;
use crate::models::plain_config::PlainConfig;

/// Direct row access to `configs`. Absence is reported as `None` or a zero
/// row count, never as an error.
pub struct PlainConfigService<'a> {
    db: &'a Database,
}

impl<'a> PlainConfigService<'a> {
    pub fn new(db: &'a Database) -> Self {
        PlainConfigService { db }
    }

    pub async fn get_all_configs(&self) -> AppResult<Vec<PlainConfig>> {
        let configs = sqlx::query_as::<_, PlainConfig>("SELECT id, data FROM configs ORDER BY id")
            .fetch_all(&self.db.pool)
            .await?;

        Ok(configs)
    }

    pub async fn get_config_by_id(&self, id: i64) -> AppResult<Option<PlainConfig>> {
        let config = sqlx::query_as::<_, PlainConfig>("SELECT id, data FROM configs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await?;

        Ok(config)
    }

    pub async fn update_config_data(&self, id: i64, data: &Value) -> AppResult<u64> {
        let result = sqlx::query("UPDATE configs SET data = $1 WHERE id = $2")
            .bind(data)
            .bind(id)
            .execute(&self.db.pool)
            .await?;

        tracing::info!("Updated config {}: {} row(s)", id, result.rows_affected());
        Ok(result.rows_affected())
    }

    pub async fn delete_config(&self, id: i64) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM configs WHERE id = $1")
            .bind(id)
            .execute(&self.db.pool)
            .await?;

        tracing::info!("Deleted config {}: {} row(s)", id, result.rows_affected());
        Ok(result.rows_affected())
    }
}
