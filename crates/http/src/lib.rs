//! HTTP API server for ora2pg-assist.

#![allow(missing_docs, reason = "Internal crate with self-explanatory API")]
#![allow(unreachable_pub, reason = "pub items are re-exported")]
#![allow(clippy::absolute_paths, reason = "Explicit paths for clarity")]
#![allow(missing_debug_implementations, reason = "Internal types")]
#![allow(clippy::missing_docs_in_private_items, reason = "Internal crate")]
#![allow(clippy::implicit_return, reason = "Implicit return is idiomatic Rust")]
#![allow(clippy::question_mark_used, reason = "? operator is idiomatic Rust")]
#![allow(clippy::min_ident_chars, reason = "Short closure params are idiomatic")]
#![allow(clippy::exhaustive_structs, reason = "HTTP types are stable")]
#![allow(clippy::single_call_fn, reason = "Helper functions improve readability")]

pub mod api_error;
mod api_types;
mod handlers;
mod query_types;
mod response_types;


use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use ora2pg_assist_core::RuntimeConfig;
use ora2pg_assist_service::{
    Collaborators, DdlCache, MigrationOrchestrator, RollbackService, RunningRegistry,
    SessionService,
};
use ora2pg_assist_storage::StorageBackend;
use tower_http::trace::TraceLayer;

pub use api_types::{ReadinessResponse, VersionResponse};

/// Shared application state for all HTTP handlers.
pub struct AppState {
    pub storage: Arc<StorageBackend>,
    /// Session Manager
    pub sessions: Arc<SessionService>,
    /// DDL Correction Cache
    pub cache: Arc<DdlCache>,
    /// Running-Migrations Registry, shared with the orchestrator
    pub registry: Arc<RunningRegistry>,
    pub orchestrator: Arc<MigrationOrchestrator>,
    pub rollback: Arc<RollbackService>,
}

impl AppState {
    /// Wires the services around one storage backend and one set of collaborators.
    #[must_use]
    pub fn new(
        storage: Arc<StorageBackend>,
        collaborators: Collaborators,
        runtime: RuntimeConfig,
    ) -> Self {
        let registry = Arc::new(RunningRegistry::new());
        let sessions = Arc::new(SessionService::new(
            Arc::clone(&storage),
            Arc::clone(&registry),
            runtime.max_session_errors,
        ));
        let cache = Arc::new(DdlCache::new(Arc::clone(&storage)));
        let rollback = Arc::new(RollbackService::new(
            Arc::clone(&storage),
            Arc::clone(&sessions),
            Arc::clone(&collaborators.target),
        ));
        let orchestrator = Arc::new(MigrationOrchestrator::new(
            Arc::clone(&storage),
            Arc::clone(&sessions),
            Arc::clone(&cache),
            Arc::clone(&registry),
            collaborators,
            runtime,
        ));
        Self { storage, sessions, cache, registry, orchestrator, rollback }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/readiness", get(readiness))
        .route("/api/version", get(version))
        .route("/api/clients", post(handlers::clients::create_client))
        .route("/api/client/{id}", get(handlers::clients::get_client))
        .route("/api/client/{id}/start_migration", post(handlers::migrations::start_migration))
        .route(
            "/api/client/{id}/run_migration_sync",
            post(handlers::migrations::run_migration_sync),
        )
        .route("/api/client/{id}/migration_status", get(handlers::migrations::migration_status))
        .route("/api/client/{id}/sessions", get(handlers::sessions::list_sessions))
        .route(
            "/api/client/{id}/target/create_database",
            post(handlers::migrations::create_target_database),
        )
        .route("/api/client/{id}/ddl_cache/stats", get(handlers::cache::cache_stats))
        .route("/api/client/{id}/ddl_cache", delete(handlers::cache::clear_cache))
        .route("/api/session/{id}", get(handlers::sessions::get_session))
        .route("/api/session/{id}/files", get(handlers::sessions::list_files))
        .route("/api/session/{id}/objects", get(handlers::sessions::list_objects))
        .route("/api/session/{id}/objects/summary", get(handlers::sessions::objects_summary))
        .route("/api/session/{id}/rollback/preview", get(handlers::rollback::preview))
        .route("/api/session/{id}/rollback/download", get(handlers::rollback::download))
        .route("/api/session/{id}/rollback/execute", post(handlers::rollback::execute))
        .route("/api/running_migrations", get(handlers::migrations::running_migrations))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// 503 while the application database is unreachable.
async fn readiness(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ReadinessResponse>) {
    match state.storage.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadinessResponse { status: "ready", backend: state.storage.kind(), message: None }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "unavailable",
                    backend: state.storage.kind(),
                    message: Some(e.to_string()),
                }),
            )
        },
    }
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse { version: env!("CARGO_PKG_VERSION") })
}
