//! Unified storage backend with enum dispatch.

use async_trait::async_trait;
use ora2pg_assist_core::{
    CachePut, Client, ClientConfig, ClientId, DdlCacheEntry, FileFilter, MigrationFile,
    MigrationSession,
};
use uuid::Uuid;

use crate::error::StorageError;
use crate::memory::MemoryStorage;
use crate::pg_storage::PgStorage;
use crate::traits::{ClientStore, DdlCacheStore, FileStore, SessionStore};

macro_rules! dispatch {
    ($self:expr, $trait:path, $method:ident ( $($arg:expr),* $(,)? )) => {
        match $self {
            StorageBackend::Postgres(s) => <PgStorage as $trait>::$method(s, $($arg),*).await,
            StorageBackend::Memory(s) => <MemoryStorage as $trait>::$method(s, $($arg),*).await,
        }
    };
}

#[derive(Clone, Debug)]
pub enum StorageBackend {
    Postgres(PgStorage),
    Memory(MemoryStorage),
}

impl StorageBackend {
    pub async fn new_postgres(database_url: &str) -> Result<Self, StorageError> {
        Ok(Self::Postgres(PgStorage::new(database_url).await?))
    }

    #[must_use]
    pub fn new_memory() -> Self {
        Self::Memory(MemoryStorage::new())
    }

    /// PostgreSQL when a URL is given, otherwise the in-memory backend.
    pub async fn connect(database_url: Option<&str>) -> Result<Self, StorageError> {
        match database_url.filter(|url| !url.is_empty()) {
            Some(url) => Self::new_postgres(url).await,
            None => {
                tracing::warn!("DATABASE_URL not set, using non-durable in-memory storage");
                Ok(Self::new_memory())
            },
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }

    pub async fn ping(&self) -> Result<(), StorageError> {
        match self {
            Self::Postgres(s) => s.ping().await,
            Self::Memory(_) => Ok(()),
        }
    }
}

// ── ClientStore ──────────────────────────────────────────────────

#[async_trait]
impl ClientStore for StorageBackend {
    async fn get_client(&self, id: ClientId) -> Result<Option<Client>, StorageError> {
        dispatch!(self, ClientStore, get_client(id))
    }

    async fn create_client(&self, name: &str, config: &ClientConfig) -> Result<Client, StorageError> {
        dispatch!(self, ClientStore, create_client(name, config))
    }
}

// ── SessionStore ─────────────────────────────────────────────────

#[async_trait]
impl SessionStore for StorageBackend {
    async fn insert_session(&self, session: &MigrationSession) -> Result<(), StorageError> {
        dispatch!(self, SessionStore, insert_session(session))
    }

    async fn update_session(&self, session: &MigrationSession) -> Result<bool, StorageError> {
        dispatch!(self, SessionStore, update_session(session))
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<MigrationSession>, StorageError> {
        dispatch!(self, SessionStore, get_session(id))
    }

    async fn list_sessions(&self, client_id: ClientId) -> Result<Vec<MigrationSession>, StorageError> {
        dispatch!(self, SessionStore, list_sessions(client_id))
    }

    async fn latest_session(
        &self,
        client_id: ClientId,
    ) -> Result<Option<MigrationSession>, StorageError> {
        dispatch!(self, SessionStore, latest_session(client_id))
    }
}

// ── FileStore ────────────────────────────────────────────────────

#[async_trait]
impl FileStore for StorageBackend {
    async fn insert_files(&self, files: &[MigrationFile]) -> Result<(), StorageError> {
        dispatch!(self, FileStore, insert_files(files))
    }

    async fn update_file(&self, file: &MigrationFile) -> Result<(), StorageError> {
        dispatch!(self, FileStore, update_file(file))
    }

    async fn list_files(
        &self,
        session_id: Uuid,
        filter: FileFilter,
    ) -> Result<Vec<MigrationFile>, StorageError> {
        dispatch!(self, FileStore, list_files(session_id, filter))
    }
}

// ── DdlCacheStore ────────────────────────────────────────────────

#[async_trait]
impl DdlCacheStore for StorageBackend {
    async fn get_and_touch(
        &self,
        client_id: ClientId,
        cache_key: &str,
    ) -> Result<Option<DdlCacheEntry>, StorageError> {
        dispatch!(self, DdlCacheStore, get_and_touch(client_id, cache_key))
    }

    async fn insert_or_hit(&self, entry: &DdlCacheEntry) -> Result<CachePut, StorageError> {
        dispatch!(self, DdlCacheStore, insert_or_hit(entry))
    }

    async fn list_cache_entries(
        &self,
        client_id: ClientId,
    ) -> Result<Vec<DdlCacheEntry>, StorageError> {
        dispatch!(self, DdlCacheStore, list_cache_entries(client_id))
    }

    async fn clear_cache(&self, client_id: ClientId) -> Result<u64, StorageError> {
        dispatch!(self, DdlCacheStore, clear_cache(client_id))
    }
}
