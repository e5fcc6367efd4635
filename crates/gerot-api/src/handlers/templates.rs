use axum::extract::State;
use gerot_db::{DashboardTemplateInput, DashboardTemplateRecord};
use serde_json::{json, Value};

use crate::{
    auth::CurrentUser,
    error::{ApiError, ApiResult},
    extract::{Json, Path},
    state::ApiState,
};

async fn load_template(state: &ApiState, id: i64) -> Result<DashboardTemplateRecord, ApiError> {
    state
        .db
        .get_template(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("template {} not found", id)))
}

fn can_edit(current: &CurrentUser, template: &DashboardTemplateRecord) -> bool {
    template.is_owned_by(current.id()) || current.actor().role.is_admin()
}

/// Admins see every template; everyone else their own plus the public ones.
pub async fn list_templates(
    State(state): State<ApiState>,
    current: CurrentUser,
) -> ApiResult<Vec<DashboardTemplateRecord>> {
    let visible_to = if current.actor().role.is_admin() {
        None
    } else {
        Some(current.id())
    };
    Ok(Json(state.db.list_templates(visible_to).await?))
}

pub async fn create_template(
    State(state): State<ApiState>,
    current: CurrentUser,
    Json(payload): Json<DashboardTemplateInput>,
) -> ApiResult<DashboardTemplateRecord> {
    Ok(Json(state.db.create_template(current.id(), &payload).await?))
}

/// The template id travels in the body.
pub async fn update_template(
    State(state): State<ApiState>,
    current: CurrentUser,
    Json(payload): Json<DashboardTemplateInput>,
) -> ApiResult<DashboardTemplateRecord> {
    let id = payload
        .id
        .ok_or_else(|| ApiError::BadRequest("template id is required".to_string()))?;
    let template = load_template(&state, id).await?;
    if !can_edit(&current, &template) {
        return Err(ApiError::forbidden());
    }
    Ok(Json(state.db.update_template(id, &payload).await?))
}

pub async fn get_template(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<DashboardTemplateRecord> {
    let template = load_template(&state, id).await?;
    if !template.is_public && !can_edit(&current, &template) {
        return Err(ApiError::forbidden());
    }
    Ok(Json(template))
}

pub async fn delete_template(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Value> {
    let template = load_template(&state, id).await?;
    if !can_edit(&current, &template) {
        return Err(ApiError::forbidden());
    }
    state.db.delete_template(id).await?;
    Ok(Json(json!({ "message": "Template excluído", "id": id })))
}
