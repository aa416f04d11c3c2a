use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use ora2pg_assist_core::{Client, ClientId};
use ora2pg_assist_storage::traits::ClientStore;

use crate::api_error::ApiError;
use crate::api_types::CreateClientRequest;
use crate::AppState;

pub async fn create_client(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<Client>), ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("client name must not be empty".to_owned()));
    }
    let client = state
        .storage
        .create_client(name, &req.config)
        .await
        .map_err(|e| ApiError::Internal(e.into()))?;
    tracing::info!(client_id = client.id, "client created");
    Ok((StatusCode::CREATED, Json(client.redacted())))
}

pub async fn get_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ClientId>,
) -> Result<Json<Client>, ApiError> {
    let client = state.sessions.get_client(id).await?;
    Ok(Json(client.redacted()))
}
