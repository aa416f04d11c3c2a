//! AI correction seam used by the orchestrator and the validation runner.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ora2pg_assist_core::{ClientConfig, ObjectType};
use ora2pg_assist_llm::{AiSettings, Completion, LlmClient, LlmError};

#[async_trait]
pub trait SqlCorrector: Send + Sync {
    /// Provider name as it enters the cache key.
    fn provider(&self) -> &str;
    fn model(&self) -> &str;

    async fn correct(&self, source_sql: &str, object_type: ObjectType) -> Result<Completion, LlmError>;

    async fn synthesize_dependency(&self, failed_sql: &str, error: &str) -> Result<Completion, LlmError>;

    async fn fix(&self, sql: &str, error: &str) -> Result<Completion, LlmError>;
}

#[async_trait]
impl SqlCorrector for LlmClient {
    fn provider(&self) -> &str {
        self.settings().provider.as_str()
    }

    fn model(&self) -> &str {
        LlmClient::model(self)
    }

    async fn correct(&self, source_sql: &str, object_type: ObjectType) -> Result<Completion, LlmError> {
        self.correct_sql(source_sql, object_type).await
    }

    async fn synthesize_dependency(&self, failed_sql: &str, error: &str) -> Result<Completion, LlmError> {
        self.synthesize_dependency_ddl(failed_sql, error).await
    }

    async fn fix(&self, sql: &str, error: &str) -> Result<Completion, LlmError> {
        self.fix_sql(sql, error).await
    }
}

/// Builds a corrector from a session's configuration snapshot.
pub trait CorrectorFactory: Send + Sync {
    /// `Ok(None)` when the client has no AI endpoint configured.
    fn for_config(&self, config: &ClientConfig) -> Result<Option<Arc<dyn SqlCorrector>>, LlmError>;
}

/// Factory producing [`LlmClient`]s with a fixed per-request timeout.
#[derive(Debug, Clone, Copy)]
pub struct LlmCorrectorFactory {
    timeout: Duration,
}

impl LlmCorrectorFactory {
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl CorrectorFactory for LlmCorrectorFactory {
    fn for_config(&self, config: &ClientConfig) -> Result<Option<Arc<dyn SqlCorrector>>, LlmError> {
        if !config.has_ai() {
            return Ok(None);
        }
        let settings = AiSettings::from_config(config)?;
        let client = LlmClient::with_timeout(settings, self.timeout)?;
        Ok(Some(Arc::new(client)))
    }
}
