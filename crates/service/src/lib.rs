//! Service layer for ora2pg-assist
//!
//! The migration workflow and the components it is built from, sitting
//! between the HTTP/CLI front ends and storage, the AI client and the
//! external databases.

#![allow(missing_docs, reason = "Internal crate with self-explanatory API")]
#![allow(clippy::missing_errors_doc, reason = "Errors are self-explanatory from Result types")]
#![allow(missing_debug_implementations, reason = "Internal types")]
#![allow(clippy::missing_docs_in_private_items, reason = "Internal crate")]
#![allow(clippy::implicit_return, reason = "Implicit return is idiomatic Rust")]
#![allow(clippy::question_mark_used, reason = "? operator is idiomatic Rust")]
#![allow(clippy::cognitive_complexity, reason = "Complex async flows are inherent")]
#![allow(clippy::min_ident_chars, reason = "Short error vars are idiomatic")]

mod cache_service;
pub mod corrector;
mod error;
pub mod exporter;
mod orchestrator;
mod registry;
mod rollback;
mod session_service;
pub mod target;
mod validation;

#[cfg(test)]
mod tests;

pub use cache_service::DdlCache;
pub use corrector::{CorrectorFactory, LlmCorrectorFactory, SqlCorrector};
pub use error::ServiceError;
pub use exporter::{DiscoveredObject, ExportError, Ora2PgExporter, SchemaExporter};
pub use orchestrator::{Collaborators, MigrationOrchestrator};
pub use registry::RunningRegistry;
pub use rollback::{RollbackOutcome, RollbackScript, RollbackService};
pub use session_service::{MigrationStatus, ObjectsSummary, SessionService, StatusCounts};
pub use target::{BatchFailure, PgTargetConnector, TargetConnector, TargetError, TargetSession};
pub use validation::{ValidationOptions, ValidationOutcome, ValidationRunner};
