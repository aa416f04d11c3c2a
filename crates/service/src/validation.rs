//! Applies corrected SQL to the target database and classifies the outcome.

use std::sync::Arc;
use std::time::Duration;

use ora2pg_assist_core::ddl::{missing_relation, strip_psql_meta};
use ora2pg_assist_core::TokenUsage;
use serde::Serialize;

use crate::corrector::SqlCorrector;
use crate::target::{TargetConnector, TargetError, TargetSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Reset the target schema once, before the first statement.
    pub clean_slate: bool,
    /// Create a missing referenced relation and retry once.
    pub auto_create_ddl: bool,
    /// AI rewrite attempts after a rejection. 0 disables.
    pub self_heal_attempts: u32,
    /// Upper bound on each remediation AI call. A timed-out call counts as failed.
    pub ai_timeout: Duration,
}

/// Result of applying one object's SQL.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub success: bool,
    pub message: String,
    /// SQL that actually applied when it differs from the input.
    pub rewritten_sql: Option<String>,
    /// AI usage spent on remediation, one entry per call.
    #[serde(skip)]
    pub ai_usage: Vec<TokenUsage>,
}

/// Holds one target connection for the validating phase of a session.
pub struct ValidationRunner {
    session: Box<dyn TargetSession>,
    options: ValidationOptions,
    corrector: Option<Arc<dyn SqlCorrector>>,
}

impl std::fmt::Debug for ValidationRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationRunner")
            .field("options", &self.options)
            .field("has_corrector", &self.corrector.is_some())
            .finish_non_exhaustive()
    }
}

impl ValidationRunner {
    /// Connects and, when `clean_slate` is set, empties the schema.
    ///
    /// # Errors
    /// Any failure here is a connection-class failure for the session.
    pub async fn open(
        connector: &dyn TargetConnector,
        dsn: &str,
        schema: &str,
        options: ValidationOptions,
        corrector: Option<Arc<dyn SqlCorrector>>,
    ) -> Result<Self, TargetError> {
        let mut session = connector.connect(dsn, schema).await?;
        if options.clean_slate {
            session.reset_schema().await.map_err(|e| match e {
                TargetError::Sql { message, .. } => TargetError::Connection {
                    message: format!("clean slate reset failed: {message}"),
                    missing_database: false,
                },
                connection => connection,
            })?;
        }
        Ok(Self { session, options, corrector })
    }

    /// Applies `sql`. Rejections come back as an unsuccessful outcome; only a
    /// lost connection is an `Err`.
    pub async fn apply(&mut self, sql: &str) -> Result<ValidationOutcome, TargetError> {
        let sql = strip_psql_meta(sql);
        let original_error = match self.session.execute(&sql).await {
            Ok(()) => {
                return Ok(ValidationOutcome {
                    success: true,
                    message: "applied".to_owned(),
                    ..ValidationOutcome::default()
                });
            },
            Err(e @ TargetError::Connection { .. }) => return Err(e),
            Err(TargetError::Sql { message, .. }) => message,
        };

        let mut ai_usage = Vec::new();

        if self.options.auto_create_ddl {
            if let Some(outcome) = self.create_dependency_and_retry(&sql, &original_error, &mut ai_usage).await? {
                return Ok(outcome);
            }
        }

        if let Some(outcome) = self.self_heal(&sql, &original_error, &mut ai_usage).await? {
            return Ok(outcome);
        }

        Ok(ValidationOutcome { success: false, message: original_error, rewritten_sql: None, ai_usage })
    }

    async fn create_dependency_and_retry(
        &mut self,
        sql: &str,
        error: &str,
        ai_usage: &mut Vec<TokenUsage>,
    ) -> Result<Option<ValidationOutcome>, TargetError> {
        let Some(relation) = missing_relation(error) else {
            return Ok(None);
        };
        let Some(corrector) = self.corrector.clone() else {
            tracing::debug!(%relation, "missing relation but no AI configured to synthesize it");
            return Ok(None);
        };

        let timeout = self.options.ai_timeout;
        let dependency = match tokio::time::timeout(timeout, corrector.synthesize_dependency(sql, error)).await {
            Ok(Ok(completion)) => {
                ai_usage.push(completion.usage);
                completion.content
            },
            Ok(Err(e)) => {
                tracing::warn!(%relation, error = %e, "dependency synthesis failed");
                return Ok(None);
            },
            Err(_) => {
                tracing::warn!(%relation, timeout_secs = timeout.as_secs(), "dependency synthesis timed out");
                return Ok(None);
            },
        };
        match self.session.execute(&dependency).await {
            Ok(()) => tracing::info!(%relation, "created missing dependency"),
            Err(e @ TargetError::Connection { .. }) => return Err(e),
            Err(e) => {
                tracing::warn!(%relation, error = %e, "synthesized dependency was rejected");
                return Ok(None);
            },
        }

        match self.session.execute(sql).await {
            Ok(()) => Ok(Some(ValidationOutcome {
                success: true,
                message: format!("applied after creating missing dependency {relation}"),
                rewritten_sql: None,
                ai_usage: std::mem::take(ai_usage),
            })),
            Err(e @ TargetError::Connection { .. }) => Err(e),
            Err(_) => Ok(None),
        }
    }

    async fn self_heal(
        &mut self,
        sql: &str,
        original_error: &str,
        ai_usage: &mut Vec<TokenUsage>,
    ) -> Result<Option<ValidationOutcome>, TargetError> {
        let Some(corrector) = self.corrector.clone() else {
            return Ok(None);
        };
        let mut current_sql = sql.to_owned();
        let mut last_error = original_error.to_owned();

        for attempt in 1..=self.options.self_heal_attempts {
            let timeout = self.options.ai_timeout;
            let fixed = match tokio::time::timeout(timeout, corrector.fix(&current_sql, &last_error)).await {
                Ok(Ok(completion)) => {
                    ai_usage.push(completion.usage);
                    strip_psql_meta(&completion.content)
                },
                Ok(Err(e)) => {
                    tracing::warn!(attempt, error = %e, "self-heal request failed");
                    return Ok(None);
                },
                Err(_) => {
                    tracing::warn!(attempt, timeout_secs = timeout.as_secs(), "self-heal request timed out");
                    return Ok(None);
                },
            };
            match self.session.execute(&fixed).await {
                Ok(()) => {
                    return Ok(Some(ValidationOutcome {
                        success: true,
                        message: format!("applied after self-heal attempt {attempt}"),
                        rewritten_sql: Some(fixed),
                        ai_usage: std::mem::take(ai_usage),
                    }));
                },
                Err(e @ TargetError::Connection { .. }) => return Err(e),
                Err(TargetError::Sql { message, .. }) => {
                    current_sql = fixed;
                    last_error = message;
                },
            }
        }
        Ok(None)
    }
}
