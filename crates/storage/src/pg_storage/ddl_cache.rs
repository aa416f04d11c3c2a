//! DdlCacheStore implementation for PgStorage.
//!
//! Both read and write paths are single statements, so concurrent sessions
//! never observe a half-applied hit count or a duplicate key.

use async_trait::async_trait;
use ora2pg_assist_core::{CachePut, ClientId, DdlCacheEntry, ObjectType};
use sqlx::Row;

use super::{from_i64, to_i64, PgStorage, CACHE_COLUMNS};
use crate::error::StorageError;
use crate::traits::DdlCacheStore;

fn row_to_entry(row: &sqlx::postgres::PgRow) -> Result<DdlCacheEntry, StorageError> {
    let object_type: String = row.try_get("object_type")?;
    Ok(DdlCacheEntry {
        client_id: row.try_get("client_id")?,
        cache_key: row.try_get("cache_key")?,
        object_type: object_type.parse::<ObjectType>()?,
        corrected_ddl: row.try_get("corrected_ddl")?,
        hit_count: from_i64(row.try_get("hit_count")?, "hit_count")?,
        created_at: row.try_get("created_at")?,
        last_used_at: row.try_get("last_used_at")?,
    })
}

#[async_trait]
impl DdlCacheStore for PgStorage {
    async fn get_and_touch(
        &self,
        client_id: ClientId,
        cache_key: &str,
    ) -> Result<Option<DdlCacheEntry>, StorageError> {
        let row = sqlx::query(&format!(
            "UPDATE ddl_cache SET hit_count = hit_count + 1, last_used_at = NOW()
             WHERE client_id = $1 AND cache_key = $2
             RETURNING {CACHE_COLUMNS}"
        ))
        .bind(client_id)
        .bind(cache_key)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_entry(&r)).transpose()
    }

    async fn insert_or_hit(&self, entry: &DdlCacheEntry) -> Result<CachePut, StorageError> {
        // xmax is 0 only for a freshly inserted tuple.
        let row = sqlx::query(&format!(
            "INSERT INTO ddl_cache ({CACHE_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (client_id, cache_key) DO UPDATE
               SET hit_count = ddl_cache.hit_count + 1, last_used_at = NOW()
             RETURNING {CACHE_COLUMNS}, (xmax = 0) AS inserted"
        ))
        .bind(entry.client_id)
        .bind(&entry.cache_key)
        .bind(entry.object_type.as_str())
        .bind(&entry.corrected_ddl)
        .bind(to_i64(entry.hit_count, "hit_count")?)
        .bind(entry.created_at)
        .bind(entry.last_used_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(CachePut { entry: row_to_entry(&row)?, inserted: row.try_get("inserted")? })
    }

    async fn list_cache_entries(
        &self,
        client_id: ClientId,
    ) -> Result<Vec<DdlCacheEntry>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {CACHE_COLUMNS} FROM ddl_cache
             WHERE client_id = $1 ORDER BY hit_count DESC, last_used_at DESC"
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_entry).collect()
    }

    async fn clear_cache(&self, client_id: ClientId) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM ddl_cache WHERE client_id = $1")
            .bind(client_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
