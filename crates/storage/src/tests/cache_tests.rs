use std::sync::Arc;

use ora2pg_assist_core::{DdlCacheEntry, ObjectType};

use super::create_test_storage;
use crate::traits::DdlCacheStore;

fn entry(client_id: i64, key: &str, ddl: &str) -> DdlCacheEntry {
    DdlCacheEntry::new(client_id, key.to_owned(), ObjectType::Table, ddl.to_owned())
}

#[tokio::test]
async fn test_get_increments_hit_count() {
    let storage = create_test_storage();
    storage.insert_or_hit(&entry(1, "k", "CREATE TABLE t ();")).await.unwrap();

    let first = storage.get_and_touch(1, "k").await.unwrap().unwrap();
    assert_eq!(first.hit_count, 1);
    let second = storage.get_and_touch(1, "k").await.unwrap().unwrap();
    assert_eq!(second.hit_count, 2);
    assert_eq!(second.corrected_ddl, "CREATE TABLE t ();");
}

#[tokio::test]
async fn test_entries_scoped_per_client() {
    let storage = create_test_storage();
    storage.insert_or_hit(&entry(1, "k", "a")).await.unwrap();
    assert!(storage.get_and_touch(2, "k").await.unwrap().is_none());
}

#[tokio::test]
async fn test_first_writer_wins_under_race() {
    let storage = Arc::new(create_test_storage());
    let mut handles = vec![];
    for i in 0..10 {
        let storage = Arc::clone(&storage);
        handles.push(tokio::spawn(async move {
            storage.insert_or_hit(&entry(1, "same", &format!("writer {i}"))).await.unwrap()
        }));
    }
    let mut inserted = 0;
    for handle in handles {
        if handle.await.unwrap().inserted {
            inserted += 1;
        }
    }
    assert_eq!(inserted, 1);

    let entries = storage.list_cache_entries(1).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].hit_count, 9);
}

#[tokio::test]
async fn test_stats_order_and_clear() {
    let storage = create_test_storage();
    storage.insert_or_hit(&entry(1, "cold", "a")).await.unwrap();
    storage.insert_or_hit(&entry(1, "hot", "b")).await.unwrap();
    storage.insert_or_hit(&entry(2, "other", "c")).await.unwrap();
    storage.get_and_touch(1, "hot").await.unwrap();

    let entries = storage.list_cache_entries(1).await.unwrap();
    assert_eq!(entries[0].cache_key, "hot");

    assert_eq!(storage.clear_cache(1).await.unwrap(), 2);
    assert!(storage.list_cache_entries(1).await.unwrap().is_empty());
    assert_eq!(storage.list_cache_entries(2).await.unwrap().len(), 1);
}
