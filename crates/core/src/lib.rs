//! Core types for ora2pg-assist
//!
//! Domain types shared across all other crates: clients, migration sessions,
//! per-object files, correction cache entries and rollback records.

#![allow(missing_docs, reason = "Domain types are self-explanatory")]
#![allow(clippy::missing_errors_doc, reason = "Errors are self-explanatory from Result types")]
#![allow(clippy::implicit_return, reason = "Implicit return is idiomatic Rust")]
#![allow(clippy::question_mark_used, reason = "? operator is idiomatic Rust")]
#![allow(clippy::min_ident_chars, reason = "Short closure vars are idiomatic")]

mod cache;
mod client;
pub mod constants;
pub mod ddl;
mod env_config;
mod error;
mod error_log;
mod file;
mod object_type;
mod rollback;
mod running;
mod session;

pub use cache::*;
pub use client::*;
pub use env_config::*;
pub use error::*;
pub use error_log::*;
pub use file::*;
pub use object_type::*;
pub use rollback::*;
pub use running::*;
pub use session::*;
