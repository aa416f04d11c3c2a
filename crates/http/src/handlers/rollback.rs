use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use ora2pg_assist_core::RollbackRecord;
use ora2pg_assist_service::RollbackOutcome;
use uuid::Uuid;

use crate::api_error::ApiError;
use crate::api_types::ConfirmRequest;
use crate::AppState;

pub async fn preview(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<RollbackRecord>>, ApiError> {
    Ok(Json(state.rollback.preview(id).await?))
}

pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let script = state.rollback.download(id).await?;
    let disposition = format!("attachment; filename=\"{}\"", script.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, "application/sql; charset=utf-8".to_owned()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        script.content,
    ))
}

/// A missing or false `confirm` is rejected before anything is looked up.
pub async fn execute(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<RollbackOutcome>, ApiError> {
    Ok(Json(state.rollback.execute(id, req.confirm).await?))
}
