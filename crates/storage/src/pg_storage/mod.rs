//! PostgreSQL storage backend using sqlx.
//!
//! Split into modular files by domain concern.

mod clients;
mod ddl_cache;
mod files;
mod sessions;

use std::time::Duration;

use ora2pg_assist_core::constants::{
    PG_POOL_ACQUIRE_TIMEOUT_SECS, PG_POOL_IDLE_TIMEOUT_SECS, PG_POOL_MAX_CONNECTIONS,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::error::StorageError;

use super::pg_migrations::run_pg_migrations;

#[derive(Clone, Debug)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(PG_POOL_MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(PG_POOL_ACQUIRE_TIMEOUT_SECS))
            .idle_timeout(Duration::from_secs(PG_POOL_IDLE_TIMEOUT_SECS))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;
        run_pg_migrations(&pool).await.map_err(|e| StorageError::Migration(e.to_string()))?;
        tracing::info!("PgStorage initialized");
        Ok(Self { pool })
    }

    /// Round-trips a trivial query.
    pub async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub(crate) fn to_i32(value: u32, field: &str) -> Result<i32, StorageError> {
    i32::try_from(value).map_err(|e| StorageError::corrupt(format!("{field} exceeds i32::MAX"), e))
}

pub(crate) fn to_i64(value: u64, field: &str) -> Result<i64, StorageError> {
    i64::try_from(value).map_err(|e| StorageError::corrupt(format!("{field} exceeds i64::MAX"), e))
}

pub(crate) fn from_i32(value: i32, field: &str) -> Result<u32, StorageError> {
    u32::try_from(value).map_err(|e| StorageError::corrupt(format!("negative {field} in DB"), e))
}

pub(crate) fn from_i64(value: i64, field: &str) -> Result<u64, StorageError> {
    u64::try_from(value).map_err(|e| StorageError::corrupt(format!("negative {field} in DB"), e))
}

pub(crate) const SESSION_COLUMNS: &str =
    "id, client_id, session_name, export_type, workflow_status, phase, created_at, completed_at,
     total_objects, processed_objects, successful, failed, prompt_tokens, completion_tokens,
     total_tokens, estimated_cost, ai_calls, cache_hits, errors, options, config_snapshot";

pub(crate) const FILE_COLUMNS: &str =
    "id, session_id, ordinal, object_name, object_type, parent_table, status, source_ddl,
     corrected_ddl, ai_attempts, prompt_tokens, completion_tokens, total_tokens, cache_hit,
     failure_kind, error_message, created_at, updated_at";

pub(crate) const CACHE_COLUMNS: &str =
    "client_id, cache_key, object_type, corrected_ddl, hit_count, created_at, last_used_at";

pub(crate) const CLIENT_COLUMNS: &str = "id, name, config, created_at";
