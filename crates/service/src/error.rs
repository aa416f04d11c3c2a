//! Typed error enum for the service layer.
//!
//! Unifies storage, AI and domain failures with the migration workflow's own
//! failure modes so handlers can map each to a status code.

use ora2pg_assist_core::{ClientId, CoreError};
use ora2pg_assist_llm::LlmError;
use ora2pg_assist_storage::StorageError;
use thiserror::Error;
use uuid::Uuid;

use crate::exporter::ExportError;
use crate::target::TargetError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error("ai: {0}")]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("client {0} not found")]
    ClientNotFound(ClientId),

    #[error("session {0} not found")]
    SessionNotFound(Uuid),

    /// Discovery returned nothing supported to migrate.
    #[error("no objects found to migrate")]
    NoObjectsFound,

    /// A destructive operation was requested without its confirmation flag.
    #[error("{0} requires explicit confirmation (confirm=true)")]
    ConfirmationRequired(&'static str),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Required client setting (target DSN, AI endpoint) is missing.
    #[error("not configured: {0}")]
    NotConfigured(String),

    #[error("export: {0}")]
    Export(#[from] ExportError),

    #[error("target: {0}")]
    Target(#[from] TargetError),

    #[error("export directory: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// Whether this error is likely transient (worth retrying).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_transient(),
            Self::Llm(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Whether this error represents a not-found condition.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ClientNotFound(_)
                | Self::SessionNotFound(_)
                | Self::Storage(StorageError::NotFound { .. })
        )
    }

    /// Whether the caller sent something unusable.
    #[must_use]
    pub const fn is_bad_request(&self) -> bool {
        matches!(
            self,
            Self::ConfirmationRequired(_) | Self::InvalidInput(_) | Self::NotConfigured(_)
        )
    }
}
