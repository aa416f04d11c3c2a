//! Environment variable parsing with warn-level logging for invalid values.

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_AI_CONCURRENCY, DEFAULT_AI_TIMEOUT_SECS, DEFAULT_ORA2PG_BIN, MAX_SESSION_ERRORS,
};

/// Parse an environment variable with a default fallback.
///
/// - If the variable is not set: returns `default` silently (expected case).
/// - If the variable is set but cannot be parsed: logs a warning and returns `default`.
pub fn env_parse_with_default<T: std::str::FromStr + std::fmt::Display>(
    var: &str,
    default: T,
) -> T {
    match std::env::var(var) {
        Ok(v) => match v.parse() {
            Ok(n) => n,
            Err(_) => {
                tracing::warn!(
                    var,
                    value = %v,
                    default = %default,
                    "invalid env var value, using default"
                );
                default
            },
        },
        Err(_) => default,
    }
}

/// Process-wide tuning read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Timeout for one AI correction call.
    pub ai_timeout: Duration,
    /// AI corrections in flight per session.
    pub ai_concurrency: usize,
    /// Cap on the per-session error list.
    pub max_session_errors: usize,
    /// Path or name of the ora2pg executable.
    pub ora2pg_bin: String,
    /// Base directory for per-session export artifacts.
    pub export_dir: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            ai_timeout: Duration::from_secs(DEFAULT_AI_TIMEOUT_SECS),
            ai_concurrency: DEFAULT_AI_CONCURRENCY,
            max_session_errors: MAX_SESSION_ERRORS,
            ora2pg_bin: DEFAULT_ORA2PG_BIN.to_owned(),
            export_dir: default_export_dir(),
        }
    }
}

impl RuntimeConfig {
    /// Reads `ORA2PG_ASSIST_*` variables, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ai_timeout: Duration::from_secs(env_parse_with_default(
                "ORA2PG_ASSIST_AI_TIMEOUT_SECS",
                DEFAULT_AI_TIMEOUT_SECS,
            )),
            ai_concurrency: env_parse_with_default(
                "ORA2PG_ASSIST_AI_CONCURRENCY",
                DEFAULT_AI_CONCURRENCY,
            )
            .max(1),
            max_session_errors: env_parse_with_default(
                "ORA2PG_ASSIST_MAX_SESSION_ERRORS",
                MAX_SESSION_ERRORS,
            ),
            ora2pg_bin: std::env::var("ORA2PG_ASSIST_ORA2PG_BIN")
                .unwrap_or(defaults.ora2pg_bin),
            export_dir: std::env::var("ORA2PG_ASSIST_EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.export_dir),
        }
    }
}

fn default_export_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ora2pg-assist")
        .join("exports")
}
