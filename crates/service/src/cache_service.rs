use std::sync::Arc;

use ora2pg_assist_core::{cache_key, CachePut, CacheStats, ClientId, DdlCacheEntry, ObjectType};
use ora2pg_assist_storage::traits::DdlCacheStore;
use ora2pg_assist_storage::StorageBackend;

use crate::ServiceError;

/// Content-addressed store of AI-corrected SQL, scoped per client.
pub struct DdlCache {
    storage: Arc<StorageBackend>,
}

impl DdlCache {
    #[must_use]
    pub const fn new(storage: Arc<StorageBackend>) -> Self {
        Self { storage }
    }

    #[must_use]
    pub fn key(
        source_ddl: &str,
        object_type: ObjectType,
        provider: &str,
        model: &str,
        client_id: ClientId,
    ) -> String {
        cache_key(source_ddl, object_type, provider, model, client_id)
    }

    /// A hit bumps `hit_count` and `last_used_at` in the same storage operation as the read.
    pub async fn get(
        &self,
        client_id: ClientId,
        key: &str,
    ) -> Result<Option<DdlCacheEntry>, ServiceError> {
        let entry = self.storage.get_and_touch(client_id, key).await?;
        match &entry {
            Some(e) => tracing::debug!(client_id, hits = e.hit_count, "ddl cache hit"),
            None => tracing::debug!(client_id, "ddl cache miss"),
        }
        Ok(entry)
    }

    /// Stores a correction unless another writer got there first, in which
    /// case the existing entry is hit instead and returned unchanged.
    pub async fn put(
        &self,
        client_id: ClientId,
        key: String,
        object_type: ObjectType,
        corrected_ddl: String,
    ) -> Result<CachePut, ServiceError> {
        let entry = DdlCacheEntry::new(client_id, key, object_type, corrected_ddl);
        let put = self.storage.insert_or_hit(&entry).await?;
        if !put.inserted {
            tracing::debug!(client_id, "ddl cache key already present, kept first writer");
        }
        Ok(put)
    }

    pub async fn stats(&self, client_id: ClientId) -> Result<CacheStats, ServiceError> {
        let entries = self.storage.list_cache_entries(client_id).await?;
        Ok(CacheStats {
            client_id,
            total_entries: entries.len() as u64,
            total_hits: entries.iter().map(|e| e.hit_count).sum(),
            entries,
        })
    }

    /// Removes every entry of one client. Irreversible.
    pub async fn clear(&self, client_id: ClientId) -> Result<u64, ServiceError> {
        let removed = self.storage.clear_cache(client_id).await?;
        tracing::info!(client_id, removed, "ddl cache cleared");
        Ok(removed)
    }
}
