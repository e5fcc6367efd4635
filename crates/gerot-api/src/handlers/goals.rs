use axum::extract::State;
use gerot_core::{Actor, Role, RoutineStatus};
use gerot_db::{GoalRecord, GoalUpdate, NewGoal};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    auth::CurrentUser,
    error::{ApiError, ApiResult},
    extract::{Json, Path, Query},
    state::ApiState,
};

#[derive(Debug, Default, Deserialize)]
pub struct GoalQuery {
    pub sector_id: Option<i64>,
    pub status: Option<RoutineStatus>,
}

/// Admins manage every sector's goals, lideres their own sector's.
fn can_manage_goals(actor: Actor, sector_id: i64) -> bool {
    match actor.role {
        Role::AdminMaster => true,
        Role::Lider => actor.sector_id == Some(sector_id),
        Role::Colaborador => false,
    }
}

async fn load_goal(state: &ApiState, actor: Actor, id: i64) -> Result<GoalRecord, ApiError> {
    let goal = state
        .db
        .get_goal(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("goal {} not found", id)))?;
    if !can_manage_goals(actor, goal.sector_id) {
        return Err(ApiError::forbidden());
    }
    Ok(goal)
}

pub async fn list_goals(
    State(state): State<ApiState>,
    current: CurrentUser,
    Query(query): Query<GoalQuery>,
) -> ApiResult<Vec<GoalRecord>> {
    let actor = current.actor();
    let sector_id = match actor.sector_scope() {
        None => query.sector_id,
        Some(own) => {
            if query.sector_id.map_or(false, |s| s != own) {
                return Err(ApiError::forbidden());
            }
            Some(own)
        }
    };
    if sector_id.is_none() && !actor.role.is_admin() {
        return Ok(Json(Vec::new()));
    }

    Ok(Json(state.db.list_goals(sector_id, query.status).await?))
}

pub async fn create_goal(
    State(state): State<ApiState>,
    current: CurrentUser,
    Json(mut payload): Json<NewGoal>,
) -> ApiResult<GoalRecord> {
    if !can_manage_goals(current.actor(), payload.sector_id) {
        return Err(ApiError::forbidden());
    }
    if state.db.get_sector(payload.sector_id).await?.is_none() {
        return Err(ApiError::BadRequest(format!(
            "sector {} does not exist",
            payload.sector_id
        )));
    }
    payload.created_by = Some(current.id());
    Ok(Json(state.db.create_goal(&payload).await?))
}

pub async fn update_goal(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<GoalUpdate>,
) -> ApiResult<GoalRecord> {
    load_goal(&state, current.actor(), id).await?;
    Ok(Json(state.db.update_goal(id, &payload).await?))
}

pub async fn delete_goal(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Value> {
    load_goal(&state, current.actor(), id).await?;
    state.db.delete_goal(id).await?;
    Ok(Json(json!({ "message": "Meta excluída", "id": id })))
}
