use async_trait::async_trait;
use ora2pg_assist_core::{Client, ClientConfig, ClientId};

use crate::error::StorageError;

/// Read access to clients, plus creation for seeding and tests.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Get client by ID.
    async fn get_client(&self, id: ClientId) -> Result<Option<Client>, StorageError>;

    /// Create a client and assign its ID.
    async fn create_client(&self, name: &str, config: &ClientConfig) -> Result<Client, StorageError>;
}
