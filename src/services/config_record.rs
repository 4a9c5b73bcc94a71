use serde_json::{Map, Value};

use crate::db::Database;
use crate::document::{self, DocumentError, Stamp};
use crate::error::{AppError, AppResult};
use crate::models::config_record::ConfigRecord;
use crate::utils::time::current_timestamp_iso;

/// Section-level reads and writes against `cfgadmindata`.
///
/// Writes run in one transaction: the module row is locked with
/// `SELECT ... FOR UPDATE`, the section is rebuilt in memory, and only that
/// key is written back with `jsonb_set`. Concurrent writers to the same module
/// queue on the row lock instead of overwriting each other.
pub struct ConfigRecordService<'a> {
    db: &'a Database,
}

impl<'a> ConfigRecordService<'a> {
    pub fn new(db: &'a Database) -> Self {
        ConfigRecordService { db }
    }

    /// Returns the value stored under `section` in the module's document.
    pub async fn get_section(&self, module: &str, section: &str) -> AppResult<Value> {
        let result = sqlx::query_scalar::<_, Value>(
            r#"
            SELECT jsoncontent -> $1 AS section_data
            FROM cfgadmindata
            WHERE UPPER(module) = UPPER($2) AND jsoncontent ? $1
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(section)
        .bind(module)
        .fetch_optional(&self.db.pool)
        .await?;

        tracing::debug!("Fetched section {}/{}: found={}", module, section, result.is_some());

        result.ok_or_else(|| AppError::NotFound("No data found for this section".to_string()))
    }

    /// Appends `entry` to the section, creating the section when missing.
    /// `createdBy`/`createdOn` are always set by the server.
    pub async fn append_entry(
        &self,
        module: &str,
        section: &str,
        mut entry: Map<String, Value>,
        actor: &str,
    ) -> AppResult<ConfigRecord> {
        Stamp::Created.apply(&mut entry, actor, &current_timestamp_iso());

        let record = self
            .modify_section(module, section, |doc| {
                document::append_entry(doc, section, Value::Object(entry))
            })
            .await?;

        tracing::info!("Appended entry to {}/{} by {}", module, section, actor);
        Ok(record)
    }

    /// Shallow-merges `patch` into every entry whose id matches `id`.
    pub async fn update_entry(
        &self,
        module: &str,
        section: &str,
        id: &str,
        mut patch: Map<String, Value>,
        actor: &str,
    ) -> AppResult<ConfigRecord> {
        Stamp::Updated.apply(&mut patch, actor, &current_timestamp_iso());

        let record = self
            .modify_section(module, section, |doc| {
                document::merge_entries(doc, section, id, &patch)
            })
            .await?;

        tracing::info!("Updated entry {}/{}/{} by {}", module, section, id, actor);
        Ok(record)
    }

    /// Marks every entry whose id matches `id` as deleted. Entries stay in place.
    pub async fn soft_delete_entry(
        &self,
        module: &str,
        section: &str,
        id: &str,
        deleted_by: &str,
    ) -> AppResult<ConfigRecord> {
        let deleted_on = current_timestamp_iso();

        let record = self
            .modify_section(module, section, |doc| {
                document::soft_delete_entries(doc, section, id, deleted_by, &deleted_on)
            })
            .await?;

        tracing::info!("Soft-deleted entry {}/{}/{} by {}", module, section, id, deleted_by);
        Ok(record)
    }

    /// Removes the row with primary key `id` in `module`. Returns the number of
    /// rows removed; a missing row is not an error.
    pub async fn delete_record(&self, module: &str, id: &str) -> AppResult<u64> {
        let Ok(row_id) = id.trim().parse::<i64>() else {
            tracing::debug!("Skipping delete for non-numeric id {} in {}", id, module);
            return Ok(0);
        };

        let result = sqlx::query("DELETE FROM cfgadmindata WHERE id = $1 AND UPPER(module) = UPPER($2)")
            .bind(row_id)
            .bind(module)
            .execute(&self.db.pool)
            .await?;

        tracing::info!(
            "Deleted record {} in {}: {} row(s)",
            row_id,
            module,
            result.rows_affected()
        );
        Ok(result.rows_affected())
    }

    async fn modify_section<F>(&self, module: &str, section: &str, f: F) -> AppResult<ConfigRecord>
    where
        F: FnOnce(&Value) -> Result<Vec<Value>, DocumentError>,
    {
        let mut tx = self.db.begin().await?;

        let current = sqlx::query_as::<_, ConfigRecord>(
            r#"
            SELECT id, module, jsoncontent
            FROM cfgadmindata
            WHERE UPPER(module) = UPPER($1)
            ORDER BY id
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(module)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Module '{}' not found", module)))?;

        let entries = f(&current.jsoncontent).map_err(|e| match e {
            DocumentError::SectionNotFound(_) => AppError::NotFound(format!(
                "Section '{}' not found in module '{}'",
                section, module
            )),
            other => other.into(),
        })?;

        let updated = sqlx::query_as::<_, ConfigRecord>(
            r#"
            UPDATE cfgadmindata
            SET jsoncontent = jsonb_set(jsoncontent, $1, $2, true)
            WHERE id = $3
            RETURNING id, module, jsoncontent
            "#,
        )
        .bind(vec![section.to_string()])
        .bind(Value::Array(entries))
        .bind(current.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }
}
