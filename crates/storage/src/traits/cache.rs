use async_trait::async_trait;
use ora2pg_assist_core::{CachePut, ClientId, DdlCacheEntry};

use crate::error::StorageError;

/// Content-addressed store of AI corrections, scoped per client.
#[async_trait]
pub trait DdlCacheStore: Send + Sync {
    /// Look up an entry, incrementing `hit_count` and `last_used_at` in the same step.
    async fn get_and_touch(
        &self,
        client_id: ClientId,
        cache_key: &str,
    ) -> Result<Option<DdlCacheEntry>, StorageError>;

    /// Insert if absent. If the key already exists the stored value is kept,
    /// its `hit_count` is incremented, and `inserted` is `false`.
    async fn insert_or_hit(&self, entry: &DdlCacheEntry) -> Result<CachePut, StorageError>;

    /// Entries of a client ordered by `hit_count` descending.
    async fn list_cache_entries(
        &self,
        client_id: ClientId,
    ) -> Result<Vec<DdlCacheEntry>, StorageError>;

    /// Remove every entry of a client. Returns the number removed.
    async fn clear_cache(&self, client_id: ClientId) -> Result<u64, StorageError>;
}
