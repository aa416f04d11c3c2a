use async_trait::async_trait;
use ora2pg_assist_core::{ClientId, MigrationSession};
use uuid::Uuid;

use crate::error::StorageError;

/// Migration session persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new session. Fails with `Duplicate` if the ID exists.
    async fn insert_session(&self, session: &MigrationSession) -> Result<(), StorageError>;

    /// Overwrite a stored session unless the stored copy is already terminal.
    /// Returns `false` when the write was refused.
    async fn update_session(&self, session: &MigrationSession) -> Result<bool, StorageError>;

    /// Get session by ID.
    async fn get_session(&self, id: Uuid) -> Result<Option<MigrationSession>, StorageError>;

    /// All sessions of a client, newest first.
    async fn list_sessions(&self, client_id: ClientId) -> Result<Vec<MigrationSession>, StorageError>;

    /// Most recently created session of a client.
    async fn latest_session(
        &self,
        client_id: ClientId,
    ) -> Result<Option<MigrationSession>, StorageError>;
}
