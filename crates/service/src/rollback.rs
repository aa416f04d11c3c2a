//! Rollback scripts derived from a session's validated objects.

use std::sync::Arc;

use chrono::Utc;
use ora2pg_assist_core::{rollback_plan, FileFilter, FileStatus, RollbackRecord};
use ora2pg_assist_storage::traits::FileStore;
use ora2pg_assist_storage::StorageBackend;
use serde::Serialize;
use uuid::Uuid;

use crate::session_service::SessionService;
use crate::target::TargetConnector;
use crate::ServiceError;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RollbackScript {
    pub file_name: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RollbackOutcome {
    pub success: bool,
    pub message: Option<String>,
    pub error: Option<String>,
    /// Statements that ran before the failing one. On failure the
    /// transaction is rolled back, so none of them remain applied.
    pub applied_count: usize,
}

pub struct RollbackService {
    storage: Arc<StorageBackend>,
    sessions: Arc<SessionService>,
    target: Arc<dyn TargetConnector>,
}

impl RollbackService {
    #[must_use]
    pub fn new(
        storage: Arc<StorageBackend>,
        sessions: Arc<SessionService>,
        target: Arc<dyn TargetConnector>,
    ) -> Self {
        Self { storage, sessions, target }
    }

    /// DROP statements in execution order.
    pub async fn preview(&self, session_id: Uuid) -> Result<Vec<RollbackRecord>, ServiceError> {
        self.sessions.get_session(session_id).await?;
        let filter = FileFilter { object_type: None, status: Some(FileStatus::Validated) };
        let files = self.storage.list_files(session_id, filter).await?;
        Ok(rollback_plan(&files))
    }

    pub async fn download(&self, session_id: Uuid) -> Result<RollbackScript, ServiceError> {
        let plan = self.preview(session_id).await?;
        let mut content = format!(
            "-- Rollback script for migration session {session_id}\n\
             -- Generated at {}\n\
             -- {} statement(s), dependents first\n\n",
            Utc::now().to_rfc3339(),
            plan.len()
        );
        for record in &plan {
            content.push_str(&record.drop_statement);
            content.push('\n');
        }
        Ok(RollbackScript { file_name: format!("rollback_session_{session_id}.sql"), content })
    }

    /// Drops the session's validated objects from the target in one transaction.
    ///
    /// Nothing is looked up or executed unless `confirm` is true.
    pub async fn execute(
        &self,
        session_id: Uuid,
        confirm: bool,
    ) -> Result<RollbackOutcome, ServiceError> {
        if !confirm {
            return Err(ServiceError::ConfirmationRequired("rollback execute"));
        }
        let session = self.sessions.get_session(session_id).await?;
        let config = &session.config_snapshot;
        let Some(dsn) = config.target_dsn.as_deref().filter(|d| !d.is_empty()) else {
            return Err(ServiceError::NotConfigured("client has no target database DSN".to_owned()));
        };

        let plan = self.preview(session_id).await?;
        if plan.is_empty() {
            return Ok(RollbackOutcome {
                success: true,
                message: Some("nothing to roll back".to_owned()),
                error: None,
                applied_count: 0,
            });
        }

        let mut target = match self.target.connect(dsn, &config.target_schema).await {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(%session_id, error = %e, "rollback could not connect to target");
                return Ok(RollbackOutcome {
                    success: false,
                    message: None,
                    error: Some(e.to_string()),
                    applied_count: 0,
                });
            },
        };

        let statements: Vec<String> = plan.into_iter().map(|r| r.drop_statement).collect();
        tracing::warn!(%session_id, statements = statements.len(), "executing rollback");
        match target.execute_in_transaction(&statements).await {
            Ok(applied) => Ok(RollbackOutcome {
                success: true,
                message: Some(format!("rolled back {applied} object(s)")),
                error: None,
                applied_count: applied,
            }),
            Err(failure) => {
                tracing::error!(
                    %session_id,
                    applied = failure.applied,
                    error = %failure.error,
                    "rollback aborted"
                );
                Ok(RollbackOutcome {
                    success: false,
                    message: None,
                    error: Some(format!(
                        "statement {} failed: {}",
                        failure.applied + 1,
                        failure.error
                    )),
                    applied_count: failure.applied,
                })
            },
        }
    }
}
