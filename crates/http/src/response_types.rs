//! Response types (Serialize)

use ora2pg_assist_core::{ClientId, RunningMigrationEntry};
use ora2pg_assist_service::MigrationStatus;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct StartMigrationResponse {
    pub session_id: Uuid,
}

/// Latest session for a client, or `{"status": "no_migration"}`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MigrationStatusResponse {
    Session(Box<MigrationStatus>),
    NoMigration { status: &'static str },
}

impl From<Option<MigrationStatus>> for MigrationStatusResponse {
    fn from(status: Option<MigrationStatus>) -> Self {
        match status {
            Some(s) => Self::Session(Box::new(s)),
            None => Self::NoMigration { status: "no_migration" },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunningMigrationsResponse {
    pub migrations: Vec<RunningMigrationEntry>,
    pub running_count: usize,
}

#[derive(Debug, Serialize)]
pub struct CacheClearResponse {
    pub client_id: ClientId,
    pub removed: u64,
}

#[derive(Debug, Serialize)]
pub struct CreateDatabaseResponse {
    pub created: bool,
}
