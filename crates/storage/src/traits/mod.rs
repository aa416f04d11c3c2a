//! Storage backend trait abstraction
//!
//! Async domain traits implemented by the PostgreSQL and in-memory
//! backends and dispatched through `StorageBackend`.

pub mod cache;
pub mod client;
pub mod file;
pub mod session;

pub use cache::DdlCacheStore;
pub use client::ClientStore;
pub use file::FileStore;
pub use session::SessionStore;
