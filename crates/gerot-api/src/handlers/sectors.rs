use axum::extract::State;
use gerot_db::{NewSector, SectorRecord, SectorSummary, SectorUpdate};
use serde_json::{json, Value};

use crate::{
    auth::CurrentUser,
    error::{ApiError, ApiResult},
    extract::{Json, Path},
    state::ApiState,
};

pub async fn list_sectors(
    State(state): State<ApiState>,
    _current: CurrentUser,
) -> ApiResult<Vec<SectorSummary>> {
    Ok(Json(state.db.list_sectors().await?))
}

pub async fn create_sector(
    State(state): State<ApiState>,
    current: CurrentUser,
    Json(payload): Json<NewSector>,
) -> ApiResult<SectorRecord> {
    current.require_admin()?;
    let sector = state.db.create_sector(&payload).await?;
    tracing::info!(sector_id = sector.id, "Sector created: {}", sector.name);
    Ok(Json(sector))
}

pub async fn get_sector(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<SectorRecord> {
    if !current.actor().can_view_sector(id) {
        return Err(ApiError::forbidden());
    }
    state
        .db
        .get_sector(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("sector {} not found", id)))
}

pub async fn update_sector(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<SectorUpdate>,
) -> ApiResult<SectorRecord> {
    current.require_admin()?;
    Ok(Json(state.db.update_sector(id, &payload).await?))
}

pub async fn delete_sector(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Value> {
    current.require_admin()?;
    state.db.delete_sector(id).await?;
    tracing::info!(sector_id = id, "Sector deleted");
    Ok(Json(json!({ "message": "Setor excluído", "id": id })))
}
