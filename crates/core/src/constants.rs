//! Shared constants for ora2pg-assist.

/// PostgreSQL connection pool: maximum connections.
pub const PG_POOL_MAX_CONNECTIONS: u32 = 20;

/// PostgreSQL connection pool: acquire timeout in seconds.
pub const PG_POOL_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// PostgreSQL connection pool: idle timeout in seconds.
pub const PG_POOL_IDLE_TIMEOUT_SECS: u64 = 300;

/// Upper bound on errors kept per session. Later errors are only counted.
pub const MAX_SESSION_ERRORS: usize = 200;

/// Errors returned inline by status endpoints; the rest are summarized as a count.
pub const STATUS_ERROR_LIMIT: usize = 50;

/// Timeout applied to a single AI correction call.
pub const DEFAULT_AI_TIMEOUT_SECS: u64 = 120;

/// AI corrections running at once within one session.
pub const DEFAULT_AI_CONCURRENCY: usize = 4;

pub const DEFAULT_AI_TEMPERATURE: f32 = 0.2;

pub const DEFAULT_AI_MAX_OUTPUT_TOKENS: u32 = 8192;

/// Schema on the target database that receives migrated objects.
pub const DEFAULT_TARGET_SCHEMA: &str = "public";

/// Default export type recorded on sessions started from the dashboard.
pub const DEFAULT_EXPORT_TYPE: &str = "DDL";

pub const DEFAULT_ORA2PG_BIN: &str = "ora2pg";
