use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ora2pg_assist_core::constants::{DEFAULT_EXPORT_TYPE, STATUS_ERROR_LIMIT};
use ora2pg_assist_core::{
    Client, ClientId, ErrorEntry, FileFilter, FileStatus, MigrationFile, MigrationOptions,
    MigrationSession, Phase, WorkflowStatus,
};
use ora2pg_assist_storage::traits::{ClientStore, FileStore, SessionStore};
use ora2pg_assist_storage::StorageBackend;
use serde::Serialize;
use uuid::Uuid;

use crate::registry::RunningRegistry;
use crate::ServiceError;

/// Polling view of a client's newest session.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MigrationStatus {
    pub session_id: Uuid,
    pub session_name: Option<String>,
    pub status: WorkflowStatus,
    pub phase: Phase,
    pub processed_objects: u32,
    pub total_objects: u32,
    pub successful: u32,
    pub failed: u32,
    pub current_object: Option<String>,
    pub total_tokens: u64,
    pub estimated_cost: f64,
    pub ai_calls: u32,
    pub cache_hits: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub errors: Vec<ErrorEntry>,
    /// Errors beyond `errors`, including any the session log dropped.
    pub errors_truncated: u64,
}

impl MigrationStatus {
    fn from_session(session: &MigrationSession, current_object: Option<String>) -> Self {
        let (head, more) = session.errors.head(STATUS_ERROR_LIMIT);
        Self {
            session_id: session.id,
            session_name: session.session_name.clone(),
            status: session.status,
            phase: session.phase,
            processed_objects: session.processed_objects,
            total_objects: session.total_objects,
            successful: session.successful,
            failed: session.failed,
            current_object,
            total_tokens: session.total_tokens,
            estimated_cost: session.estimated_cost,
            ai_calls: session.ai_calls,
            cache_hits: session.cache_hits,
            started_at: session.created_at,
            completed_at: session.completed_at,
            errors: head.to_vec(),
            errors_truncated: more,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct StatusCounts {
    pub total: u32,
    pub generated: u32,
    pub corrected: u32,
    pub validated: u32,
    pub failed: u32,
}

impl StatusCounts {
    fn add(&mut self, status: FileStatus) {
        self.total += 1;
        match status {
            FileStatus::Generated => self.generated += 1,
            FileStatus::Corrected => self.corrected += 1,
            FileStatus::Validated => self.validated += 1,
            FileStatus::Failed => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ObjectsSummary {
    pub session_id: Uuid,
    pub totals: StatusCounts,
    /// Keyed by object type name, e.g. `"MATERIALIZED VIEW"`.
    pub by_type: BTreeMap<String, StatusCounts>,
}

impl ObjectsSummary {
    #[must_use]
    pub fn from_files(session_id: Uuid, files: &[MigrationFile]) -> Self {
        let mut totals = StatusCounts::default();
        let mut by_type: BTreeMap<String, StatusCounts> = BTreeMap::new();
        for file in files {
            totals.add(file.status);
            by_type.entry(file.object_type.as_str().to_owned()).or_default().add(file.status);
        }
        Self { session_id, totals, by_type }
    }
}

/// Creates, reads and finalizes migration sessions and their file rows.
pub struct SessionService {
    storage: Arc<StorageBackend>,
    registry: Arc<RunningRegistry>,
    max_errors: usize,
}

impl SessionService {
    #[must_use]
    pub const fn new(
        storage: Arc<StorageBackend>,
        registry: Arc<RunningRegistry>,
        max_errors: usize,
    ) -> Self {
        Self { storage, registry, max_errors }
    }

    pub async fn get_client(&self, client_id: ClientId) -> Result<Client, ServiceError> {
        self.storage.get_client(client_id).await?.ok_or(ServiceError::ClientNotFound(client_id))
    }

    /// New `pending` session carrying a snapshot of the client's current config.
    pub async fn create_session(
        &self,
        client_id: ClientId,
        export_type: Option<&str>,
        options: MigrationOptions,
    ) -> Result<MigrationSession, ServiceError> {
        let client = self.get_client(client_id).await?;
        let export_type = export_type.filter(|t| !t.is_empty()).unwrap_or(DEFAULT_EXPORT_TYPE);
        let session = MigrationSession::new(
            client_id,
            export_type.to_owned(),
            options,
            client.config,
            self.max_errors,
        );
        self.storage.insert_session(&session).await?;
        tracing::info!(client_id, session_id = %session.id, "migration session created");
        Ok(session)
    }

    pub async fn get_session(&self, session_id: Uuid) -> Result<MigrationSession, ServiceError> {
        self.storage
            .get_session(session_id)
            .await?
            .ok_or(ServiceError::SessionNotFound(session_id))
    }

    /// Newest first.
    pub async fn list_sessions(
        &self,
        client_id: ClientId,
    ) -> Result<Vec<MigrationSession>, ServiceError> {
        self.get_client(client_id).await?;
        Ok(self.storage.list_sessions(client_id).await?)
    }

    /// Persists progress. Returns `false` if the stored session is already terminal.
    pub async fn save_progress(&self, session: &MigrationSession) -> Result<bool, ServiceError> {
        Ok(self.storage.update_session(session).await?)
    }

    /// Sets a terminal outcome. A session that is already terminal is
    /// returned unchanged whatever `outcome` is.
    pub async fn finalize_session(
        &self,
        session_id: Uuid,
        outcome: WorkflowStatus,
    ) -> Result<MigrationSession, ServiceError> {
        let mut session = self.get_session(session_id).await?;
        if !session.finalize(outcome)? {
            return Ok(session);
        }
        if !self.storage.update_session(&session).await? {
            // Lost a race with another finalizer; the stored outcome stands.
            return self.get_session(session_id).await;
        }
        tracing::info!(%session_id, status = %session.status, "migration session finalized");
        Ok(session)
    }

    /// `None` when the client has never started a migration.
    pub async fn migration_status(
        &self,
        client_id: ClientId,
    ) -> Result<Option<MigrationStatus>, ServiceError> {
        self.get_client(client_id).await?;
        let Some(session) = self.storage.latest_session(client_id).await? else {
            return Ok(None);
        };
        let current_object =
            self.registry.get(session.id).await.and_then(|e| e.current_object.clone());
        Ok(Some(MigrationStatus::from_session(&session, current_object)))
    }

    pub async fn files(
        &self,
        session_id: Uuid,
        filter: FileFilter,
    ) -> Result<Vec<MigrationFile>, ServiceError> {
        self.get_session(session_id).await?;
        Ok(self.storage.list_files(session_id, filter).await?)
    }

    pub async fn objects_summary(&self, session_id: Uuid) -> Result<ObjectsSummary, ServiceError> {
        let files = self.files(session_id, FileFilter::default()).await?;
        Ok(ObjectsSummary::from_files(session_id, &files))
    }
}
