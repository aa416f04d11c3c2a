use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use ora2pg_assist_core::{ClientId, MigrationOptions, MigrationSession};

use crate::api_error::ApiError;
use crate::response_types::{
    CreateDatabaseResponse, MigrationStatusResponse, RunningMigrationsResponse,
    StartMigrationResponse,
};
use crate::AppState;

/// Starts a session in the background and returns its id immediately.
pub async fn start_migration(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ClientId>,
    Json(options): Json<MigrationOptions>,
) -> Result<(StatusCode, Json<StartMigrationResponse>), ApiError> {
    let session_id = state.orchestrator.start_migration(id, options).await?;
    Ok((StatusCode::ACCEPTED, Json(StartMigrationResponse { session_id })))
}

/// Runs a session to completion within the request.
pub async fn run_migration_sync(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ClientId>,
    Json(options): Json<MigrationOptions>,
) -> Result<Json<MigrationSession>, ApiError> {
    let session = state.orchestrator.run_migration(id, options).await?;
    Ok(Json(session.redacted()))
}

pub async fn migration_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ClientId>,
) -> Result<Json<MigrationStatusResponse>, ApiError> {
    let status = state.sessions.migration_status(id).await?;
    Ok(Json(status.into()))
}

pub async fn running_migrations(
    State(state): State<Arc<AppState>>,
) -> Json<RunningMigrationsResponse> {
    let migrations = state.registry.list_active().await;
    Json(RunningMigrationsResponse { running_count: migrations.len(), migrations })
}

pub async fn create_target_database(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ClientId>,
) -> Result<Json<CreateDatabaseResponse>, ApiError> {
    let created = state.orchestrator.create_target_database(id).await?;
    Ok(Json(CreateDatabaseResponse { created }))
}
