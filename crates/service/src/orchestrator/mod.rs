//! Drives a session through discovery, export, conversion and validation.
//!
//! Per-object failures are recorded on the object and the run continues.
//! Errors returned from [`MigrationOrchestrator::execute`] are session-fatal:
//! the session is failed with the error at session level and the objects
//! not yet attempted stay unprocessed.

mod tracker;

use std::path::PathBuf;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use ora2pg_assist_core::ddl::strip_psql_meta;
use ora2pg_assist_core::{
    ClientId, FailureKind, MigrationFile, MigrationOptions, MigrationSession,
    RunningMigrationEntry, RuntimeConfig, TokenUsage, WorkflowStatus,
};
use ora2pg_assist_storage::traits::FileStore;
use ora2pg_assist_storage::StorageBackend;
use uuid::Uuid;

use crate::cache_service::DdlCache;
use crate::corrector::{CorrectorFactory, SqlCorrector};
use crate::exporter::{DiscoveredObject, SchemaExporter};
use crate::registry::RunningRegistry;
use crate::session_service::SessionService;
use crate::target::TargetConnector;
use crate::validation::{ValidationOptions, ValidationRunner};
use crate::ServiceError;

use tracker::SessionTracker;

/// External systems the workflow talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub exporter: Arc<dyn SchemaExporter>,
    pub correctors: Arc<dyn CorrectorFactory>,
    pub target: Arc<dyn TargetConnector>,
}

/// Result of converting one object.
struct Conversion {
    file: MigrationFile,
    ai_usage: Option<TokenUsage>,
}

pub struct MigrationOrchestrator {
    storage: Arc<StorageBackend>,
    sessions: Arc<SessionService>,
    cache: Arc<DdlCache>,
    registry: Arc<RunningRegistry>,
    collaborators: Collaborators,
    runtime: RuntimeConfig,
}

impl MigrationOrchestrator {
    #[must_use]
    pub fn new(
        storage: Arc<StorageBackend>,
        sessions: Arc<SessionService>,
        cache: Arc<DdlCache>,
        registry: Arc<RunningRegistry>,
        collaborators: Collaborators,
        runtime: RuntimeConfig,
    ) -> Self {
        Self { storage, sessions, cache, registry, collaborators, runtime }
    }

    /// Creates a session and runs it in the background. Returns as soon as
    /// the session is stored and registered.
    pub async fn start_migration(
        self: &Arc<Self>,
        client_id: ClientId,
        options: MigrationOptions,
    ) -> Result<Uuid, ServiceError> {
        let tracker = self.prepare(client_id, options).await?;
        let session_id = tracker.session().id;
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.drive(tracker).await;
        });
        Ok(session_id)
    }

    /// Creates a session and runs it to a terminal state before returning.
    pub async fn run_migration(
        &self,
        client_id: ClientId,
        options: MigrationOptions,
    ) -> Result<MigrationSession, ServiceError> {
        let tracker = self.prepare(client_id, options).await?;
        Ok(self.drive(tracker).await)
    }

    /// Creates the database named in the client's target DSN.
    pub async fn create_target_database(&self, client_id: ClientId) -> Result<bool, ServiceError> {
        let client = self.sessions.get_client(client_id).await?;
        let Some(dsn) = client.config.target_dsn.as_deref().filter(|d| !d.is_empty()) else {
            return Err(ServiceError::NotConfigured("client has no target database DSN".to_owned()));
        };
        Ok(self.collaborators.target.create_database(dsn).await?)
    }

    async fn prepare(
        &self,
        client_id: ClientId,
        options: MigrationOptions,
    ) -> Result<SessionTracker, ServiceError> {
        let session = self.sessions.create_session(client_id, None, options).await?;
        let entry = RunningMigrationEntry::new(client_id, session.id, session.session_name.clone());
        self.registry.register(entry.clone()).await;
        Ok(SessionTracker::new(
            session,
            entry,
            Arc::clone(&self.storage),
            Arc::clone(&self.sessions),
            Arc::clone(&self.registry),
        ))
    }

    async fn drive(&self, mut tracker: SessionTracker) -> MigrationSession {
        let session_id = tracker.session().id;
        if let Err(e) = self.execute(&mut tracker).await {
            if let Err(fail_err) = tracker.fail(&e.to_string()) {
                tracing::error!(%session_id, error = %fail_err, "could not record session failure");
            }
        }
        match tracker.store_terminal().await {
            Ok(()) => {
                self.registry.unregister(session_id).await;
            }
            Err(e) => tracing::error!(
                %session_id,
                error = %e,
                "terminal state not stored, keeping registry entry"
            ),
        }
        tracker.into_session()
    }

    fn workdir(&self, client_id: ClientId, session_id: Uuid) -> PathBuf {
        self.runtime.export_dir.join(format!("client_{client_id}")).join(session_id.to_string())
    }

    async fn execute(&self, tracker: &mut SessionTracker) -> Result<(), ServiceError> {
        let session = tracker.session();
        let session_id = session.id;
        let client_id = session.client_id;
        let config = session.config_snapshot.clone();
        let options = session.options.clone();

        // Discovery
        tracker.advance(WorkflowStatus::Discovering).await?;
        let workdir = self.workdir(client_id, session_id);
        tokio::fs::create_dir_all(&workdir).await?;
        let types = config.effective_types(options.object_types.as_deref());
        let discovered = self.collaborators.exporter.discover(&config, &types, &workdir).await?;
        let discovered_count = discovered.len();
        let mut objects: Vec<DiscoveredObject> =
            discovered.into_iter().filter(|o| o.supported).collect();
        if objects.len() < discovered_count {
            tracing::info!(
                %session_id,
                skipped = discovered_count - objects.len(),
                "unsupported objects skipped"
            );
        }
        if objects.is_empty() {
            return Err(ServiceError::NoObjectsFound);
        }
        objects.sort_by_key(|o| o.object_type.creation_rank());
        let total = u32::try_from(objects.len())
            .map_err(|_| ServiceError::InvalidInput("too many objects in one session".to_owned()))?;
        tracker.finish_discovery(total).await?;

        // Export
        let mut files: Vec<MigrationFile> = objects
            .iter()
            .zip(0_u32..)
            .map(|(o, ordinal)| {
                MigrationFile::new(session_id, ordinal, o.name.clone(), o.object_type, o.parent_table.clone())
            })
            .collect();
        self.storage.insert_files(&files).await?;
        for (file, object) in files.iter_mut().zip(&objects) {
            tracker.set_current(Some(&file.object_name)).await;
            match self.collaborators.exporter.export(&config, object, &workdir).await {
                Ok(ddl) => {
                    let ddl = strip_psql_meta(&ddl);
                    if ddl.is_empty() {
                        file.mark_failed(FailureKind::Export, "export produced no DDL");
                        tracker.object_done(file).await?;
                    } else {
                        file.mark_exported(ddl);
                        tracker.object_progressed(file).await?;
                    }
                },
                Err(e) if e.is_connection() => return Err(e.into()),
                Err(e) => {
                    file.mark_failed(FailureKind::Export, e.to_string());
                    tracker.object_done(file).await?;
                },
            }
        }

        // Conversion
        tracker.advance(WorkflowStatus::Converting).await?;
        let corrector = self.collaborators.correctors.for_config(&config)?;
        let pending: Vec<MigrationFile> = files.into_iter().filter(|f| !f.is_failed()).collect();
        let corrected = match corrector.as_deref() {
            Some(c) => self.convert_all(tracker, pending, c, client_id).await?,
            None => {
                tracing::warn!(%session_id, "no AI configured, exported SQL is validated unchanged");
                let mut unchanged = pending;
                for file in &mut unchanged {
                    file.mark_unchanged();
                    tracker.object_progressed(file).await?;
                }
                unchanged
            },
        };

        // Validation
        tracker.advance(WorkflowStatus::Validating).await?;
        match config.target_dsn.as_deref().filter(|d| !d.is_empty()) {
            None => {
                tracing::warn!(%session_id, "no target DSN configured, validation skipped");
                for file in &corrected {
                    tracker.object_done(file).await?;
                }
            },
            Some(dsn) => {
                let validation = ValidationOptions {
                    clean_slate: options.clean_slate,
                    auto_create_ddl: options.auto_create_ddl,
                    self_heal_attempts: config.self_heal_attempts,
                    ai_timeout: self.runtime.ai_timeout,
                };
                let mut runner = ValidationRunner::open(
                    self.collaborators.target.as_ref(),
                    dsn,
                    &config.target_schema,
                    validation,
                    corrector.clone(),
                )
                .await?;
                for mut file in corrected {
                    tracker.set_current(Some(&file.object_name)).await;
                    let sql = file.corrected_ddl.clone().unwrap_or_default();
                    let outcome = runner.apply(&sql).await?;
                    for usage in &outcome.ai_usage {
                        tracker.record_ai_usage(usage)?;
                        file.ai_attempts += 1;
                        file.usage.add(usage);
                    }
                    if outcome.success {
                        file.mark_validated(outcome.rewritten_sql);
                    } else {
                        file.mark_failed(FailureKind::Sql, outcome.message);
                    }
                    tracker.object_done(&file).await?;
                }
            },
        }

        tracker.set_current(None).await;
        tracker.complete()
    }

    /// Corrects objects with bounded concurrency. Outcomes are applied to the
    /// session one at a time as they finish.
    async fn convert_all(
        &self,
        tracker: &mut SessionTracker,
        pending: Vec<MigrationFile>,
        corrector: &dyn SqlCorrector,
        client_id: ClientId,
    ) -> Result<Vec<MigrationFile>, ServiceError> {
        let concurrency = self.runtime.ai_concurrency.max(1);
        let mut conversions = stream::iter(pending)
            .map(move |file| self.convert_one(file, corrector, client_id))
            .buffer_unordered(concurrency);

        let mut corrected = Vec::new();
        while let Some(Conversion { file, ai_usage }) = conversions.next().await {
            match &ai_usage {
                Some(usage) => tracker.record_ai_usage(usage)?,
                None if file.cache_hit => tracker.record_cache_hit()?,
                None => {},
            }
            tracker.set_current(Some(&file.object_name)).await;
            if file.is_failed() {
                tracker.object_done(&file).await?;
            } else {
                tracker.object_progressed(&file).await?;
                corrected.push(file);
            }
        }
        corrected.sort_by_key(|f| f.ordinal);
        Ok(corrected)
    }

    async fn convert_one(
        &self,
        mut file: MigrationFile,
        corrector: &dyn SqlCorrector,
        client_id: ClientId,
    ) -> Conversion {
        let source = file.source_ddl.clone().unwrap_or_default();
        let key = DdlCache::key(&source, file.object_type, corrector.provider(), corrector.model(), client_id);

        match self.cache.get(client_id, &key).await {
            Ok(Some(entry)) => {
                file.mark_corrected(entry.corrected_ddl, None);
                return Conversion { file, ai_usage: None };
            },
            Ok(None) => {},
            Err(e) => tracing::warn!(object = %file.object_name, error = %e, "cache lookup failed, treating as miss"),
        }

        let timeout = self.runtime.ai_timeout;
        match tokio::time::timeout(timeout, corrector.correct(&source, file.object_type)).await {
            Ok(Ok(completion)) => {
                if let Err(e) = self
                    .cache
                    .put(client_id, key, file.object_type, completion.content.clone())
                    .await
                {
                    tracing::warn!(object = %file.object_name, error = %e, "cache store failed");
                }
                let usage = completion.usage;
                file.mark_corrected(completion.content, Some(usage));
                Conversion { file, ai_usage: Some(usage) }
            },
            Ok(Err(e)) => {
                file.ai_attempts += 1;
                file.mark_failed(FailureKind::Correction, e.to_string());
                Conversion { file, ai_usage: None }
            },
            Err(_) => {
                file.ai_attempts += 1;
                file.mark_failed(
                    FailureKind::Correction,
                    format!("AI correction timed out after {}s", timeout.as_secs()),
                );
                Conversion { file, ai_usage: None }
            },
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<RunningRegistry> {
        &self.registry
    }
}
