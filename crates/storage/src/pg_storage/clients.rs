//! ClientStore implementation for PgStorage.

use async_trait::async_trait;
use ora2pg_assist_core::{Client, ClientConfig, ClientId};
use sqlx::Row;

use super::{CLIENT_COLUMNS, PgStorage};
use crate::error::StorageError;
use crate::traits::ClientStore;

fn row_to_client(row: &sqlx::postgres::PgRow) -> Result<Client, StorageError> {
    let config: serde_json::Value = row.try_get("config")?;
    Ok(Client {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        config: serde_json::from_value(config)?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl ClientStore for PgStorage {
    async fn get_client(&self, id: ClientId) -> Result<Option<Client>, StorageError> {
        let row = sqlx::query(&format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_client(&r)).transpose()
    }

    async fn create_client(&self, name: &str, config: &ClientConfig) -> Result<Client, StorageError> {
        let row = sqlx::query(&format!(
            "INSERT INTO clients (name, config) VALUES ($1, $2) RETURNING {CLIENT_COLUMNS}"
        ))
        .bind(name)
        .bind(serde_json::to_value(config)?)
        .fetch_one(&self.pool)
        .await?;
        row_to_client(&row)
    }
}
