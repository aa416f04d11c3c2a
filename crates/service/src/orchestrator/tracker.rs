//! Single writer for one session's state.
//!
//! Every mutation goes through the tracker, which persists the session and
//! publishes a fresh registry snapshot afterwards. Pollers read either the
//! stored row or the registry entry, both replaced whole.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ora2pg_assist_core::{
    FailureKind, MigrationFile, MigrationSession, RunningMigrationEntry, TokenUsage, WorkflowStatus,
};
use ora2pg_assist_storage::traits::FileStore;
use ora2pg_assist_storage::StorageBackend;

use crate::registry::RunningRegistry;
use crate::session_service::SessionService;
use crate::ServiceError;

const TERMINAL_SAVE_ATTEMPTS: u32 = 5;
const TERMINAL_SAVE_BACKOFF: Duration = Duration::from_millis(500);

pub(crate) struct SessionTracker {
    session: MigrationSession,
    entry: RunningMigrationEntry,
    storage: Arc<StorageBackend>,
    sessions: Arc<SessionService>,
    registry: Arc<RunningRegistry>,
}

impl SessionTracker {
    pub(crate) fn new(
        session: MigrationSession,
        entry: RunningMigrationEntry,
        storage: Arc<StorageBackend>,
        sessions: Arc<SessionService>,
        registry: Arc<RunningRegistry>,
    ) -> Self {
        Self { session, entry, storage, sessions, registry }
    }

    pub(crate) const fn session(&self) -> &MigrationSession {
        &self.session
    }

    pub(crate) fn into_session(self) -> MigrationSession {
        self.session
    }

    async fn persist(&mut self) -> Result<(), ServiceError> {
        if !self.sessions.save_progress(&self.session).await? {
            tracing::warn!(session_id = %self.session.id, "stored session already terminal, update skipped");
        }
        self.publish().await;
        Ok(())
    }

    async fn publish(&mut self) {
        self.entry = self.entry.with_progress(
            self.session.phase,
            self.session.processed_objects,
            self.session.total_objects,
            self.entry.current_object.clone(),
        );
        self.registry.update(self.entry.clone()).await;
    }

    pub(crate) async fn set_current(&mut self, object: Option<&str>) {
        self.entry.current_object = object.map(ToOwned::to_owned);
        self.publish().await;
    }

    pub(crate) async fn advance(&mut self, next: WorkflowStatus) -> Result<(), ServiceError> {
        self.session.advance(next)?;
        tracing::info!(
            session_id = %self.session.id,
            client_id = self.session.client_id,
            phase = %next,
            "phase started"
        );
        self.persist().await
    }

    pub(crate) async fn finish_discovery(&mut self, total: u32) -> Result<(), ServiceError> {
        self.session.finish_discovery(total)?;
        tracing::info!(session_id = %self.session.id, total, "discovery finished");
        self.persist().await
    }

    /// Records a finished object. `file` is saved before the counters move.
    pub(crate) async fn object_done(&mut self, file: &MigrationFile) -> Result<(), ServiceError> {
        self.storage.update_file(file).await?;
        if file.is_failed() {
            let message = file.error.as_deref().unwrap_or("unknown error");
            tracing::warn!(
                session_id = %self.session.id,
                object = %file.object_name,
                kind = file.failure_kind.map_or("unknown", FailureKind::as_str),
                error = %message,
                "object failed"
            );
            self.session.record_failure(&file.object_name, message)?;
        } else {
            self.session.record_success()?;
        }
        self.persist().await
    }

    /// Saves a file that moved forward but is not finished yet.
    pub(crate) async fn object_progressed(&mut self, file: &MigrationFile) -> Result<(), ServiceError> {
        self.storage.update_file(file).await?;
        Ok(())
    }

    pub(crate) fn record_ai_usage(&mut self, usage: &TokenUsage) -> Result<(), ServiceError> {
        let cost = self.session.config_snapshot.ai_cost_per_1k_tokens;
        self.session.record_ai_call(usage, cost)?;
        Ok(())
    }

    pub(crate) fn record_cache_hit(&mut self) -> Result<(), ServiceError> {
        self.session.record_cache_hit()?;
        Ok(())
    }

    /// Ends the session with the outcome implied by its counters. Stored by
    /// [`Self::store_terminal`].
    pub(crate) fn complete(&mut self) -> Result<(), ServiceError> {
        let outcome = self.session.terminal_outcome();
        self.finish(outcome)
    }

    /// Aborts the session: records `message` at session level and fails it.
    /// Stored by [`Self::store_terminal`].
    pub(crate) fn fail(&mut self, message: &str) -> Result<(), ServiceError> {
        if self.session.is_terminal() {
            return Ok(());
        }
        tracing::error!(session_id = %self.session.id, error = %message, "migration session failed");
        self.session.record_session_error(message)?;
        self.finish(WorkflowStatus::Failed)
    }

    fn finish(&mut self, outcome: WorkflowStatus) -> Result<(), ServiceError> {
        if self.session.finalize(outcome)? {
            tracing::info!(
                session_id = %self.session.id,
                status = %self.session.status,
                processed = self.session.processed_objects,
                total = self.session.total_objects,
                successful = self.session.successful,
                failed = self.session.failed,
                "migration session finished"
            );
        }
        Ok(())
    }

    /// Persists the terminal state, retrying storage errors with backoff.
    ///
    /// When every attempt fails the registry entry still gets the terminal
    /// phase, so pollers of the registry see the session end.
    pub(crate) async fn store_terminal(&mut self) -> Result<(), ServiceError> {
        let session = self.session.clone();
        let sessions = Arc::clone(&self.sessions);
        let stored = retry_with_backoff(TERMINAL_SAVE_ATTEMPTS, TERMINAL_SAVE_BACKOFF, || {
            sessions.save_progress(&session)
        })
        .await;
        if let Ok(false) = stored {
            tracing::warn!(session_id = %self.session.id, "stored session already terminal, update skipped");
        }
        self.publish().await;
        stored.map(|_| ())
    }
}

/// Runs `op` up to `attempts` times, sleeping `backoff * attempt` between tries.
/// Returns the first success or the last error.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    attempts: u32,
    backoff: Duration,
    mut op: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                tracing::warn!(attempt, error = %e, "storage write failed, retrying");
                tokio::time::sleep(backoff * attempt).await;
                attempt += 1;
            },
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn unavailable() -> ServiceError {
        ServiceError::Storage(ora2pg_assist_storage::StorageError::Database(sqlx::Error::PoolTimedOut))
    }

    #[tokio::test(start_paused = true)]
    async fn retry_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(5, Duration::from_millis(100), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 { Err(unavailable()) } else { Ok(7) }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_gives_up_after_last_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<(), ServiceError> = retry_with_backoff(3, Duration::from_millis(100), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(unavailable())
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
