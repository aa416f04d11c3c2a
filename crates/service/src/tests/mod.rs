#![allow(clippy::unwrap_used, reason = "test code")]

mod rollback_tests;
mod validation_tests;

use std::sync::Arc;
use std::time::Duration;

use ora2pg_assist_core::{Client, ClientConfig, RuntimeConfig};
use ora2pg_assist_storage::traits::ClientStore;
use ora2pg_assist_storage::StorageBackend;

use crate::{
    Collaborators, DdlCache, MigrationOrchestrator, RollbackService, RunningRegistry,
    SessionService,
};
use fakes::{FakeCorrector, FakeCorrectorFactory, FakeExporter, FakeTarget};

pub(crate) const TARGET_DSN: &str = "postgres://fake@localhost/target";

pub(crate) struct Harness {
    pub storage: Arc<StorageBackend>,
    pub sessions: Arc<SessionService>,
    pub cache: Arc<DdlCache>,
    pub registry: Arc<RunningRegistry>,
    pub rollback: RollbackService,
    pub orchestrator: Arc<MigrationOrchestrator>,
    pub corrector: Option<Arc<FakeCorrector>>,
    pub target: Arc<FakeTarget>,
    _export_dir: tempfile::TempDir,
}

impl Harness {
    pub(crate) fn new(exporter: FakeExporter, corrector: Option<FakeCorrector>, target: FakeTarget) -> Self {
        Self::with_timeout(exporter, corrector, target, Duration::from_secs(5))
    }

    pub(crate) fn with_timeout(
        exporter: FakeExporter,
        corrector: Option<FakeCorrector>,
        target: FakeTarget,
        ai_timeout: Duration,
    ) -> Self {
        let export_dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(StorageBackend::new_memory());
        let registry = Arc::new(RunningRegistry::new());
        let sessions = Arc::new(SessionService::new(Arc::clone(&storage), Arc::clone(&registry), 200));
        let cache = Arc::new(DdlCache::new(Arc::clone(&storage)));
        let corrector = corrector.map(Arc::new);
        let target = Arc::new(target);
        let collaborators = Collaborators {
            exporter: Arc::new(exporter),
            correctors: Arc::new(FakeCorrectorFactory(corrector.clone())),
            target: Arc::clone(&target) as Arc<dyn crate::TargetConnector>,
        };
        let runtime = RuntimeConfig {
            ai_timeout,
            ai_concurrency: 3,
            export_dir: export_dir.path().to_path_buf(),
            ..RuntimeConfig::default()
        };
        let orchestrator = Arc::new(MigrationOrchestrator::new(
            Arc::clone(&storage),
            Arc::clone(&sessions),
            Arc::clone(&cache),
            Arc::clone(&registry),
            collaborators.clone(),
            runtime,
        ));
        let rollback =
            RollbackService::new(Arc::clone(&storage), Arc::clone(&sessions), collaborators.target);
        Self {
            storage,
            sessions,
            cache,
            registry,
            rollback,
            orchestrator,
            corrector,
            target,
            _export_dir: export_dir,
        }
    }

    pub(crate) async fn client(&self) -> Client {
        self.client_with(ClientConfig {
            target_dsn: Some(TARGET_DSN.to_owned()),
            ai_endpoint: Some("http://ai.invalid/v1".to_owned()),
            ai_model: Some("fake-1".to_owned()),
            ..ClientConfig::default()
        })
        .await
    }

    pub(crate) async fn client_with(&self, config: ClientConfig) -> Client {
        self.storage.create_client("acme", &config).await.unwrap()
    }

    pub(crate) fn ai_calls(&self) -> u32 {
        self.corrector.as_ref().map_or(0, |c| c.calls())
    }
}
