use async_trait::async_trait;
use ora2pg_assist_core::{FileFilter, MigrationFile};
use uuid::Uuid;

use crate::error::StorageError;

/// Per-object file rows of a session.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Insert file rows. All rows are written or none.
    async fn insert_files(&self, files: &[MigrationFile]) -> Result<(), StorageError>;

    /// Update status, SQL and usage of an existing row. `session_id` is never changed.
    async fn update_file(&self, file: &MigrationFile) -> Result<(), StorageError>;

    /// Files of a session matching `filter`, in ordinal order.
    async fn list_files(
        &self,
        session_id: Uuid,
        filter: FileFilter,
    ) -> Result<Vec<MigrationFile>, StorageError>;
}
