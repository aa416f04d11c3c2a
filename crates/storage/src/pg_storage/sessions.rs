//! SessionStore implementation for PgStorage.

use async_trait::async_trait;
use ora2pg_assist_core::{ClientId, MigrationSession, Phase, WorkflowStatus};
use sqlx::Row;
use uuid::Uuid;

use super::{from_i32, from_i64, to_i32, to_i64, PgStorage, SESSION_COLUMNS};
use crate::error::StorageError;
use crate::traits::SessionStore;

const TERMINAL_STATUSES: &str = "('completed', 'partial', 'failed')";

fn row_to_session(row: &sqlx::postgres::PgRow) -> Result<MigrationSession, StorageError> {
    let status: String = row.try_get("workflow_status")?;
    let phase: String = row.try_get("phase")?;
    let errors: serde_json::Value = row.try_get("errors")?;
    let options: serde_json::Value = row.try_get("options")?;
    let config_snapshot: serde_json::Value = row.try_get("config_snapshot")?;
    Ok(MigrationSession {
        id: row.try_get("id")?,
        client_id: row.try_get("client_id")?,
        session_name: row.try_get("session_name")?,
        export_type: row.try_get("export_type")?,
        status: status.parse::<WorkflowStatus>()?,
        phase: phase.parse::<Phase>()?,
        created_at: row.try_get("created_at")?,
        completed_at: row.try_get("completed_at")?,
        total_objects: from_i32(row.try_get("total_objects")?, "total_objects")?,
        processed_objects: from_i32(row.try_get("processed_objects")?, "processed_objects")?,
        successful: from_i32(row.try_get("successful")?, "successful")?,
        failed: from_i32(row.try_get("failed")?, "failed")?,
        prompt_tokens: from_i64(row.try_get("prompt_tokens")?, "prompt_tokens")?,
        completion_tokens: from_i64(row.try_get("completion_tokens")?, "completion_tokens")?,
        total_tokens: from_i64(row.try_get("total_tokens")?, "total_tokens")?,
        estimated_cost: row.try_get("estimated_cost")?,
        ai_calls: from_i32(row.try_get("ai_calls")?, "ai_calls")?,
        cache_hits: from_i32(row.try_get("cache_hits")?, "cache_hits")?,
        errors: serde_json::from_value(errors)?,
        options: serde_json::from_value(options)?,
        config_snapshot: serde_json::from_value(config_snapshot)?,
    })
}

#[async_trait]
impl SessionStore for PgStorage {
    async fn insert_session(&self, session: &MigrationSession) -> Result<(), StorageError> {
        sqlx::query(&format!(
            "INSERT INTO migration_sessions ({SESSION_COLUMNS})
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21)"
        ))
        .bind(session.id)
        .bind(session.client_id)
        .bind(&session.session_name)
        .bind(&session.export_type)
        .bind(session.status.as_str())
        .bind(session.phase.as_str())
        .bind(session.created_at)
        .bind(session.completed_at)
        .bind(to_i32(session.total_objects, "total_objects")?)
        .bind(to_i32(session.processed_objects, "processed_objects")?)
        .bind(to_i32(session.successful, "successful")?)
        .bind(to_i32(session.failed, "failed")?)
        .bind(to_i64(session.prompt_tokens, "prompt_tokens")?)
        .bind(to_i64(session.completion_tokens, "completion_tokens")?)
        .bind(to_i64(session.total_tokens, "total_tokens")?)
        .bind(session.estimated_cost)
        .bind(to_i32(session.ai_calls, "ai_calls")?)
        .bind(to_i32(session.cache_hits, "cache_hits")?)
        .bind(serde_json::to_value(&session.errors)?)
        .bind(serde_json::to_value(&session.options)?)
        .bind(serde_json::to_value(&session.config_snapshot)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_session(&self, session: &MigrationSession) -> Result<bool, StorageError> {
        let result = sqlx::query(&format!(
            "UPDATE migration_sessions SET
               workflow_status = $2, phase = $3, completed_at = $4,
               total_objects = $5, processed_objects = $6, successful = $7, failed = $8,
               prompt_tokens = $9, completion_tokens = $10, total_tokens = $11,
               estimated_cost = $12, ai_calls = $13, cache_hits = $14, errors = $15
             WHERE id = $1 AND workflow_status NOT IN {TERMINAL_STATUSES}"
        ))
        .bind(session.id)
        .bind(session.status.as_str())
        .bind(session.phase.as_str())
        .bind(session.completed_at)
        .bind(to_i32(session.total_objects, "total_objects")?)
        .bind(to_i32(session.processed_objects, "processed_objects")?)
        .bind(to_i32(session.successful, "successful")?)
        .bind(to_i32(session.failed, "failed")?)
        .bind(to_i64(session.prompt_tokens, "prompt_tokens")?)
        .bind(to_i64(session.completion_tokens, "completion_tokens")?)
        .bind(to_i64(session.total_tokens, "total_tokens")?)
        .bind(session.estimated_cost)
        .bind(to_i32(session.ai_calls, "ai_calls")?)
        .bind(to_i32(session.cache_hits, "cache_hits")?)
        .bind(serde_json::to_value(&session.errors)?)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<MigrationSession>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM migration_sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_session(&r)).transpose()
    }

    async fn list_sessions(&self, client_id: ClientId) -> Result<Vec<MigrationSession>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM migration_sessions
             WHERE client_id = $1 ORDER BY created_at DESC"
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_session).collect()
    }

    async fn latest_session(
        &self,
        client_id: ClientId,
    ) -> Result<Option<MigrationSession>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM migration_sessions
             WHERE client_id = $1 ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_session(&r)).transpose()
    }
}
