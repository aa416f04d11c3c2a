//! FileStore implementation for PgStorage.

use async_trait::async_trait;
use ora2pg_assist_core::{FailureKind, FileFilter, FileStatus, MigrationFile, ObjectType, TokenUsage};
use sqlx::Row;
use uuid::Uuid;

use super::{from_i32, from_i64, to_i32, to_i64, PgStorage, FILE_COLUMNS};
use crate::error::StorageError;
use crate::traits::FileStore;

fn row_to_file(row: &sqlx::postgres::PgRow) -> Result<MigrationFile, StorageError> {
    let object_type: String = row.try_get("object_type")?;
    let status: String = row.try_get("status")?;
    let failure_kind: Option<String> = row.try_get("failure_kind")?;
    Ok(MigrationFile {
        id: row.try_get("id")?,
        session_id: row.try_get("session_id")?,
        ordinal: from_i32(row.try_get("ordinal")?, "ordinal")?,
        object_name: row.try_get("object_name")?,
        object_type: object_type.parse::<ObjectType>()?,
        parent_table: row.try_get("parent_table")?,
        status: status.parse::<FileStatus>()?,
        source_ddl: row.try_get("source_ddl")?,
        corrected_ddl: row.try_get("corrected_ddl")?,
        ai_attempts: from_i32(row.try_get("ai_attempts")?, "ai_attempts")?,
        usage: TokenUsage {
            prompt_tokens: from_i64(row.try_get("prompt_tokens")?, "prompt_tokens")?,
            completion_tokens: from_i64(row.try_get("completion_tokens")?, "completion_tokens")?,
            total_tokens: from_i64(row.try_get("total_tokens")?, "total_tokens")?,
        },
        cache_hit: row.try_get("cache_hit")?,
        failure_kind: failure_kind.map(|k| k.parse::<FailureKind>()).transpose()?,
        error: row.try_get("error_message")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl FileStore for PgStorage {
    async fn insert_files(&self, files: &[MigrationFile]) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;
        for file in files {
            sqlx::query(&format!(
                "INSERT INTO migration_files ({FILE_COLUMNS})
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18)"
            ))
            .bind(file.id)
            .bind(file.session_id)
            .bind(to_i32(file.ordinal, "ordinal")?)
            .bind(&file.object_name)
            .bind(file.object_type.as_str())
            .bind(&file.parent_table)
            .bind(file.status.as_str())
            .bind(&file.source_ddl)
            .bind(&file.corrected_ddl)
            .bind(to_i32(file.ai_attempts, "ai_attempts")?)
            .bind(to_i64(file.usage.prompt_tokens, "prompt_tokens")?)
            .bind(to_i64(file.usage.completion_tokens, "completion_tokens")?)
            .bind(to_i64(file.usage.total_tokens, "total_tokens")?)
            .bind(file.cache_hit)
            .bind(file.failure_kind.map(FailureKind::as_str))
            .bind(&file.error)
            .bind(file.created_at)
            .bind(file.updated_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn update_file(&self, file: &MigrationFile) -> Result<(), StorageError> {
        let result = sqlx::query(
            "UPDATE migration_files SET
               status = $2, source_ddl = $3, corrected_ddl = $4, ai_attempts = $5,
               prompt_tokens = $6, completion_tokens = $7, total_tokens = $8,
               cache_hit = $9, failure_kind = $10, error_message = $11, updated_at = $12
             WHERE id = $1",
        )
        .bind(file.id)
        .bind(file.status.as_str())
        .bind(&file.source_ddl)
        .bind(&file.corrected_ddl)
        .bind(to_i32(file.ai_attempts, "ai_attempts")?)
        .bind(to_i64(file.usage.prompt_tokens, "prompt_tokens")?)
        .bind(to_i64(file.usage.completion_tokens, "completion_tokens")?)
        .bind(to_i64(file.usage.total_tokens, "total_tokens")?)
        .bind(file.cache_hit)
        .bind(file.failure_kind.map(FailureKind::as_str))
        .bind(&file.error)
        .bind(file.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound { entity: "migration_file", id: file.id.to_string() });
        }
        Ok(())
    }

    async fn list_files(
        &self,
        session_id: Uuid,
        filter: FileFilter,
    ) -> Result<Vec<MigrationFile>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {FILE_COLUMNS} FROM migration_files
             WHERE session_id = $1
               AND ($2::TEXT IS NULL OR object_type = $2)
               AND ($3::TEXT IS NULL OR status = $3)
             ORDER BY ordinal"
        ))
        .bind(session_id)
        .bind(filter.object_type.map(ObjectType::as_str))
        .bind(filter.status.map(FileStatus::as_str))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_file).collect()
    }
}
