//! In-process storage backend used when no `DATABASE_URL` is configured.
//!
//! Non-durable. A single `RwLock` guards all tables, so every trait method
//! is atomic with respect to the others.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use ora2pg_assist_core::{
    CachePut, Client, ClientConfig, ClientId, DdlCacheEntry, FileFilter, MigrationFile,
    MigrationSession,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StorageError;
use crate::traits::{ClientStore, DdlCacheStore, FileStore, SessionStore};

#[derive(Debug, Default)]
struct Tables {
    clients: HashMap<ClientId, Client>,
    next_client_id: ClientId,
    sessions: HashMap<Uuid, MigrationSession>,
    files: HashMap<Uuid, MigrationFile>,
    cache: HashMap<(ClientId, String), DdlCacheEntry>,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientStore for MemoryStorage {
    async fn get_client(&self, id: ClientId) -> Result<Option<Client>, StorageError> {
        Ok(self.tables.read().await.clients.get(&id).cloned())
    }

    async fn create_client(&self, name: &str, config: &ClientConfig) -> Result<Client, StorageError> {
        let mut tables = self.tables.write().await;
        tables.next_client_id += 1;
        let client = Client {
            id: tables.next_client_id,
            name: name.to_owned(),
            config: config.clone(),
            created_at: Utc::now(),
        };
        tables.clients.insert(client.id, client.clone());
        Ok(client)
    }
}

#[async_trait]
impl SessionStore for MemoryStorage {
    async fn insert_session(&self, session: &MigrationSession) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        if tables.sessions.contains_key(&session.id) {
            return Err(StorageError::Duplicate(format!("session {}", session.id)));
        }
        tables.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn update_session(&self, session: &MigrationSession) -> Result<bool, StorageError> {
        let mut tables = self.tables.write().await;
        match tables.sessions.get_mut(&session.id) {
            Some(stored) if !stored.is_terminal() => {
                *stored = session.clone();
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<MigrationSession>, StorageError> {
        Ok(self.tables.read().await.sessions.get(&id).cloned())
    }

    async fn list_sessions(&self, client_id: ClientId) -> Result<Vec<MigrationSession>, StorageError> {
        let tables = self.tables.read().await;
        let mut sessions: Vec<MigrationSession> =
            tables.sessions.values().filter(|s| s.client_id == client_id).cloned().collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn latest_session(
        &self,
        client_id: ClientId,
    ) -> Result<Option<MigrationSession>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .values()
            .filter(|s| s.client_id == client_id)
            .max_by_key(|s| s.created_at)
            .cloned())
    }
}

#[async_trait]
impl FileStore for MemoryStorage {
    async fn insert_files(&self, files: &[MigrationFile]) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        if let Some(dup) = files.iter().find(|f| tables.files.contains_key(&f.id)) {
            return Err(StorageError::Duplicate(format!("migration_file {}", dup.id)));
        }
        for file in files {
            tables.files.insert(file.id, file.clone());
        }
        Ok(())
    }

    async fn update_file(&self, file: &MigrationFile) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables.files.get_mut(&file.id) else {
            return Err(StorageError::NotFound { entity: "migration_file", id: file.id.to_string() });
        };
        let session_id = stored.session_id;
        *stored = MigrationFile { session_id, ..file.clone() };
        Ok(())
    }

    async fn list_files(
        &self,
        session_id: Uuid,
        filter: FileFilter,
    ) -> Result<Vec<MigrationFile>, StorageError> {
        let tables = self.tables.read().await;
        let mut files: Vec<MigrationFile> = tables
            .files
            .values()
            .filter(|f| f.session_id == session_id && filter.matches(f))
            .cloned()
            .collect();
        files.sort_by_key(|f| f.ordinal);
        Ok(files)
    }
}

#[async_trait]
impl DdlCacheStore for MemoryStorage {
    async fn get_and_touch(
        &self,
        client_id: ClientId,
        cache_key: &str,
    ) -> Result<Option<DdlCacheEntry>, StorageError> {
        let mut tables = self.tables.write().await;
        Ok(tables.cache.get_mut(&(client_id, cache_key.to_owned())).map(|entry| {
            entry.hit_count += 1;
            entry.last_used_at = Utc::now();
            entry.clone()
        }))
    }

    async fn insert_or_hit(&self, entry: &DdlCacheEntry) -> Result<CachePut, StorageError> {
        let mut tables = self.tables.write().await;
        let key = (entry.client_id, entry.cache_key.clone());
        if let Some(existing) = tables.cache.get_mut(&key) {
            existing.hit_count += 1;
            existing.last_used_at = Utc::now();
            return Ok(CachePut { entry: existing.clone(), inserted: false });
        }
        tables.cache.insert(key, entry.clone());
        Ok(CachePut { entry: entry.clone(), inserted: true })
    }

    async fn list_cache_entries(
        &self,
        client_id: ClientId,
    ) -> Result<Vec<DdlCacheEntry>, StorageError> {
        let tables = self.tables.read().await;
        let mut entries: Vec<DdlCacheEntry> =
            tables.cache.values().filter(|e| e.client_id == client_id).cloned().collect();
        entries.sort_by(|a, b| {
            b.hit_count.cmp(&a.hit_count).then_with(|| b.last_used_at.cmp(&a.last_used_at))
        });
        Ok(entries)
    }

    async fn clear_cache(&self, client_id: ClientId) -> Result<u64, StorageError> {
        let mut tables = self.tables.write().await;
        let before = tables.cache.len();
        tables.cache.retain(|(owner, _), _| *owner != client_id);
        Ok((before - tables.cache.len()) as u64)
    }
}
