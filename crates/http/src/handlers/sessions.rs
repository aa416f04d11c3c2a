use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use ora2pg_assist_core::{ClientId, FileFilter, MigrationFile, MigrationSession};
use ora2pg_assist_service::ObjectsSummary;
use uuid::Uuid;

use crate::api_error::ApiError;
use crate::query_types::ObjectsQuery;
use crate::AppState;

pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ClientId>,
) -> Result<Json<Vec<MigrationSession>>, ApiError> {
    let sessions = state.sessions.list_sessions(id).await?;
    Ok(Json(sessions.iter().map(MigrationSession::redacted).collect()))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MigrationSession>, ApiError> {
    let session = state.sessions.get_session(id).await?;
    Ok(Json(session.redacted()))
}

pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MigrationFile>>, ApiError> {
    Ok(Json(state.sessions.files(id, FileFilter::default()).await?))
}

pub async fn list_objects(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<ObjectsQuery>,
) -> Result<Json<Vec<MigrationFile>>, ApiError> {
    let filter = query.to_filter()?;
    Ok(Json(state.sessions.files(id, filter).await?))
}

pub async fn objects_summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ObjectsSummary>, ApiError> {
    Ok(Json(state.sessions.objects_summary(id).await?))
}
