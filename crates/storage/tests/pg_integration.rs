//! Integration tests for PgStorage.
//! Run with: DATABASE_URL=... cargo test -p ora2pg-assist-storage -- --ignored pg_

#![allow(clippy::unwrap_used, reason = "integration test code")]

use std::sync::Arc;

use ora2pg_assist_core::{
    ClientConfig, DdlCacheEntry, FileFilter, FileStatus, MigrationFile, MigrationOptions,
    MigrationSession, ObjectType, WorkflowStatus,
};
use ora2pg_assist_storage::traits::{ClientStore, DdlCacheStore, FileStore, SessionStore};
use ora2pg_assist_storage::PgStorage;
use uuid::Uuid;

async fn create_pg_storage() -> PgStorage {
    let url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for PgStorage integration tests");
    PgStorage::new(&url).await.expect("Failed to connect to PostgreSQL")
}

fn make_session(client_id: i64) -> MigrationSession {
    MigrationSession::new(
        client_id,
        "DDL".to_owned(),
        MigrationOptions::default(),
        ClientConfig { ai_api_key: Some("sk-test".to_owned()), ..ClientConfig::default() },
        200,
    )
}

#[tokio::test]
#[ignore]
async fn pg_session_roundtrip_and_terminal_guard() {
    let storage = create_pg_storage().await;
    let client = storage.create_client("pg-it", &ClientConfig::default()).await.unwrap();
    let mut session = make_session(client.id);
    storage.insert_session(&session).await.unwrap();

    session.advance(WorkflowStatus::Discovering).unwrap();
    session.finish_discovery(2).unwrap();
    session.record_success().unwrap();
    session.record_failure("emp", "syntax error").unwrap();
    assert!(storage.update_session(&session).await.unwrap());

    session.finalize(WorkflowStatus::Partial).unwrap();
    assert!(storage.update_session(&session).await.unwrap());

    let mut late = session.clone();
    late.status = WorkflowStatus::Completed;
    assert!(!storage.update_session(&late).await.unwrap());

    let stored = storage.get_session(session.id).await.unwrap().unwrap();
    assert_eq!(stored.status, WorkflowStatus::Partial);
    assert_eq!(stored.processed_objects, 2);
    assert_eq!(stored.errors.total(), 1);
    assert_eq!(stored.config_snapshot.ai_api_key.as_deref(), Some("sk-test"));
    assert_eq!(storage.latest_session(client.id).await.unwrap().unwrap().id, session.id);
}

#[tokio::test]
#[ignore]
async fn pg_files_filter_by_status() {
    let storage = create_pg_storage().await;
    let client = storage.create_client("pg-it", &ClientConfig::default()).await.unwrap();
    let session = make_session(client.id);
    storage.insert_session(&session).await.unwrap();

    let mut index = MigrationFile::new(session.id, 1, "idx_emp".to_owned(), ObjectType::Index, Some("emp".to_owned()));
    let table = MigrationFile::new(session.id, 0, "emp".to_owned(), ObjectType::Table, None);
    storage.insert_files(&[index.clone(), table]).await.unwrap();

    index.mark_corrected("CREATE INDEX idx_emp ON emp (id);".to_owned(), None);
    index.mark_validated(None);
    storage.update_file(&index).await.unwrap();

    let validated = storage
        .list_files(session.id, FileFilter { object_type: None, status: Some(FileStatus::Validated) })
        .await
        .unwrap();
    assert_eq!(validated.len(), 1);
    assert_eq!(validated[0].parent_table.as_deref(), Some("emp"));
    assert!(validated[0].cache_hit);

    let all = storage.list_files(session.id, FileFilter::default()).await.unwrap();
    assert_eq!(all[0].object_name, "emp");
}

#[tokio::test]
#[ignore]
async fn pg_cache_first_writer_wins() {
    let storage = Arc::new(create_pg_storage().await);
    let client = storage.create_client("pg-it", &ClientConfig::default()).await.unwrap();
    let client_id = client.id;
    let key = format!("key-{}", Uuid::new_v4());

    let mut handles = vec![];
    for i in 0..8 {
        let storage = Arc::clone(&storage);
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            let entry = DdlCacheEntry::new(client_id, key, ObjectType::Table, format!("writer {i}"));
            storage.insert_or_hit(&entry).await.unwrap()
        }));
    }
    let mut inserted = 0;
    for handle in handles {
        if handle.await.unwrap().inserted {
            inserted += 1;
        }
    }
    assert_eq!(inserted, 1);

    let hit = storage.get_and_touch(client.id, &key).await.unwrap().unwrap();
    assert_eq!(hit.hit_count, 8);
    assert!(storage.get_and_touch(client.id + 1_000_000, &key).await.unwrap().is_none());

    assert_eq!(storage.clear_cache(client.id).await.unwrap(), 1);
}
