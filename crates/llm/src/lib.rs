//! AI client for converting Oracle DDL to PostgreSQL and repairing
//! statements the target rejects.
#![allow(clippy::missing_errors_doc, reason = "Errors are self-explanatory from Result types")]
#![allow(clippy::module_name_repetitions, reason = "Domain naming convention")]
#![allow(clippy::multiple_crate_versions, reason = "Transitive dependency conflicts")]

mod ai_types;
pub mod client;
mod correction;
pub mod error;

#[cfg(test)]
mod retry_tests;

pub use client::{AiSettings, Completion, LlmClient, truncate};
pub use error::LlmError;
