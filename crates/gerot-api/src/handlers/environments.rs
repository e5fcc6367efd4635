use axum::extract::State;
use gerot_core::ResourceType;
use gerot_db::{
    EnvironmentRecord, EnvironmentSummary, EnvironmentUpdate, NewEnvironment, NewResource,
    ResourceRecord,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    auth::CurrentUser,
    error::{ApiError, ApiResult},
    extract::{Json, Path, Query},
    state::ApiState,
};

#[derive(Debug, Default, Deserialize)]
pub struct ResourceQuery {
    #[serde(rename = "type")]
    pub resource_type: Option<ResourceType>,
}

pub async fn list_environments(
    State(state): State<ApiState>,
    _current: CurrentUser,
) -> ApiResult<Vec<EnvironmentSummary>> {
    Ok(Json(state.db.list_environments().await?))
}

pub async fn create_environment(
    State(state): State<ApiState>,
    current: CurrentUser,
    Json(payload): Json<NewEnvironment>,
) -> ApiResult<EnvironmentRecord> {
    current.require_admin()?;
    Ok(Json(state.db.create_environment(&payload).await?))
}

pub async fn get_environment(
    State(state): State<ApiState>,
    _current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Value> {
    let env = state
        .db
        .get_environment(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("environment {} not found", id)))?;
    let resources = state.db.list_resources(id, None).await?;
    Ok(Json(json!({ "environment": env, "resources": resources })))
}

pub async fn update_environment(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<EnvironmentUpdate>,
) -> ApiResult<EnvironmentRecord> {
    current.require_admin()?;
    Ok(Json(state.db.update_environment(id, &payload).await?))
}

pub async fn delete_environment(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Value> {
    current.require_admin()?;
    state.db.deactivate_environment(id).await?;
    Ok(Json(json!({ "message": "Ambiente desativado", "id": id })))
}

pub async fn list_resources(
    State(state): State<ApiState>,
    _current: CurrentUser,
    Path(id): Path<i64>,
    Query(query): Query<ResourceQuery>,
) -> ApiResult<Vec<ResourceRecord>> {
    if state.db.get_environment(id).await?.is_none() {
        return Err(ApiError::NotFound(format!("environment {} not found", id)));
    }
    Ok(Json(state.db.list_resources(id, query.resource_type).await?))
}

pub async fn add_resource(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(mut payload): Json<NewResource>,
) -> ApiResult<ResourceRecord> {
    current.require_admin()?;
    payload.uploaded_by = Some(current.id());
    let resource = state.db.add_resource(id, &payload).await?;
    tracing::info!(
        environment_id = id,
        resource_id = resource.id,
        kind = payload.resource_type.as_str(),
        "Environment resource added"
    );
    Ok(Json(resource))
}

pub async fn delete_resource(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Value> {
    current.require_admin()?;
    state.db.delete_resource(id).await?;
    Ok(Json(json!({ "message": "Recurso excluído", "id": id })))
}
