#![allow(clippy::shadow_reuse, reason = "Shadowing for Arc clones is idiomatic")]
#![allow(clippy::single_call_fn, reason = "HTTP handlers are called once from router")]

pub mod cache;
pub mod clients;
pub mod migrations;
pub mod rollback;
pub mod sessions;
