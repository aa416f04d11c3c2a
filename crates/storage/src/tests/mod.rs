//! Test utilities and module declarations for storage tests.

mod cache_tests;

use ora2pg_assist_core::{
    ClientConfig, ClientId, MigrationFile, MigrationOptions, MigrationSession, ObjectType,
};
use uuid::Uuid;

use crate::MemoryStorage;

pub fn create_test_storage() -> MemoryStorage {
    MemoryStorage::new()
}

pub fn create_test_session(client_id: ClientId) -> MigrationSession {
    MigrationSession::new(
        client_id,
        "DDL".to_owned(),
        MigrationOptions::default(),
        ClientConfig::default(),
        20,
    )
}

pub fn create_test_file(session_id: Uuid, ordinal: u32, name: &str, object_type: ObjectType) -> MigrationFile {
    MigrationFile::new(session_id, ordinal, name.to_owned(), object_type, None)
}
