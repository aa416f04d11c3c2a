//! Process-wide index of sessions currently being orchestrated.
//!
//! Entries are immutable snapshots behind `Arc`; an update swaps the whole
//! snapshot, so a reader holding an entry never sees it change under it.

use std::collections::HashMap;
use std::sync::Arc;

use ora2pg_assist_core::RunningMigrationEntry;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct RunningRegistry {
    entries: RwLock<HashMap<Uuid, Arc<RunningMigrationEntry>>>,
}

impl RunningRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, entry: RunningMigrationEntry) {
        let session_id = entry.session_id;
        self.entries.write().await.insert(session_id, Arc::new(entry));
        tracing::debug!(%session_id, "registered running migration");
    }

    /// Replaces the snapshot of a registered session. Returns `false` if the
    /// session is not registered (already finished).
    pub async fn update(&self, entry: RunningMigrationEntry) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get_mut(&entry.session_id) {
            Some(slot) => {
                *slot = Arc::new(entry);
                true
            },
            None => false,
        }
    }

    pub async fn unregister(&self, session_id: Uuid) -> bool {
        let removed = self.entries.write().await.remove(&session_id).is_some();
        if removed {
            tracing::debug!(%session_id, "unregistered running migration");
        }
        removed
    }

    pub async fn get(&self, session_id: Uuid) -> Option<Arc<RunningMigrationEntry>> {
        self.entries.read().await.get(&session_id).cloned()
    }

    /// Snapshot of all active sessions, oldest first.
    pub async fn list_active(&self) -> Vec<RunningMigrationEntry> {
        let mut active: Vec<RunningMigrationEntry> =
            self.entries.read().await.values().map(|e| RunningMigrationEntry::clone(e)).collect();
        active.sort_by_key(|e| e.started_at);
        active
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
