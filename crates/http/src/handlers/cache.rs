use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use ora2pg_assist_core::{CacheStats, ClientId};

use crate::api_error::ApiError;
use crate::response_types::CacheClearResponse;
use crate::AppState;

pub async fn cache_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ClientId>,
) -> Result<Json<CacheStats>, ApiError> {
    state.sessions.get_client(id).await?;
    Ok(Json(state.cache.stats(id).await?))
}

pub async fn clear_cache(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ClientId>,
) -> Result<Json<CacheClearResponse>, ApiError> {
    state.sessions.get_client(id).await?;
    let removed = state.cache.clear(id).await?;
    Ok(Json(CacheClearResponse { client_id: id, removed }))
}
