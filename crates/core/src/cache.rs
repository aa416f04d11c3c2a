//! DDL correction cache entries and key derivation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::ClientId;
use crate::ddl::normalize_ddl;
use crate::object_type::ObjectType;

/// A previously AI-corrected statement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DdlCacheEntry {
    pub client_id: ClientId,
    pub cache_key: String,
    pub object_type: ObjectType,
    pub corrected_ddl: String,
    pub hit_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

impl DdlCacheEntry {
    #[must_use]
    pub fn new(client_id: ClientId, cache_key: String, object_type: ObjectType, corrected_ddl: String) -> Self {
        let now = Utc::now();
        Self { client_id, cache_key, object_type, corrected_ddl, hit_count: 0, created_at: now, last_used_at: now }
    }
}

/// Result of an insert-if-absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePut {
    /// The stored entry. When `inserted` is false this is the earlier writer's value.
    pub entry: DdlCacheEntry,
    pub inserted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheStats {
    pub client_id: ClientId,
    pub total_entries: u64,
    pub total_hits: u64,
    /// Ordered by `hit_count` descending.
    pub entries: Vec<DdlCacheEntry>,
}

/// Deterministic key for a correction.
///
/// Whitespace differences in the source DDL do not change the key; every other
/// input does. The client id is part of the key so entries never cross clients.
#[must_use]
pub fn cache_key(
    source_ddl: &str,
    object_type: ObjectType,
    provider: &str,
    model: &str,
    client_id: ClientId,
) -> String {
    let material = format!(
        "{client_id}\u{1f}{}\u{1f}{provider}\u{1f}{model}\u{1f}{}",
        object_type.as_str(),
        normalize_ddl(source_ddl),
    );
    blake3::hash(material.as_bytes()).to_hex().to_string()
}
