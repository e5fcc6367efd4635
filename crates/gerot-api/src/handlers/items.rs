use axum::extract::State;
use chrono::NaiveDate;
use gerot_core::{DaySummary, Priority, Role};
use gerot_db::{ChecklistItemRecord, ChecklistItemUpdate, NewActivity, TaskView};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{
    routines::{load_routine, RoutineAccess},
    today,
};
use crate::{
    auth::{CurrentUser, RequestMeta},
    error::{ApiError, ApiResult},
    extract::{Json, Path, Query},
    state::ApiState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatusFilter {
    Pending,
    Completed,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    pub date: Option<NaiveDate>,
    pub status: Option<TaskStatusFilter>,
    pub priority: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TasksResponse {
    pub date: NaiveDate,
    pub tasks: Vec<TaskView>,
    pub summary: DaySummary,
}

async fn load_item(state: &ApiState, id: i64) -> Result<ChecklistItemRecord, ApiError> {
    state
        .db
        .get_item(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("checklist item {} not found", id)))
}

pub async fn update_item(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<ChecklistItemUpdate>,
) -> ApiResult<ChecklistItemRecord> {
    let item = load_item(&state, id).await?;
    load_routine(&state, current.actor(), item.routine_id, RoutineAccess::Edit).await?;
    Ok(Json(state.db.update_item(id, &payload).await?))
}

pub async fn delete_item(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Value> {
    let item = load_item(&state, id).await?;
    load_routine(&state, current.actor(), item.routine_id, RoutineAccess::Edit).await?;
    state.db.delete_item(id).await?;
    state.db.refresh_routine_status(item.routine_id).await?;
    Ok(Json(json!({ "message": "Item excluído", "id": id })))
}

/// Only the routine owner may tick items. Sector leaders are notified.
pub async fn complete_item(
    State(state): State<ApiState>,
    current: CurrentUser,
    meta: RequestMeta,
    Path(id): Path<i64>,
) -> ApiResult<ChecklistItemRecord> {
    let item = load_item(&state, id).await?;
    let routine = state
        .db
        .get_routine(item.routine_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("routine {} not found", item.routine_id)))?;
    if routine.user_id != current.id() {
        return Err(ApiError::forbidden());
    }

    let already_done = item.completed;
    let item = state.db.set_completed(id, current.id()).await?;
    state.db.refresh_routine_status(routine.id).await?;

    if !already_done {
        state
            .db
            .log_activity(
                &NewActivity::new(current.id(), "complete_task")
                    .details(item.task.clone())
                    .origin(meta.ip_address, meta.user_agent),
            )
            .await?;

        if let Some(sector_id) = current.user.sector_id {
            let message = format!("{} concluiu: {}", current.user.display_name(), item.task);
            for leader in state.db.users_in_sector_with_role(sector_id, Role::Lider).await? {
                if leader.id == current.id() {
                    continue;
                }
                state
                    .db
                    .create_notification(leader.id, "task_completed", &message, Some(("checklist", item.id)))
                    .await?;
            }
        }
    }

    Ok(Json(item))
}

pub async fn uncomplete_item(
    State(state): State<ApiState>,
    current: CurrentUser,
    meta: RequestMeta,
    Path(id): Path<i64>,
) -> ApiResult<ChecklistItemRecord> {
    let item = load_item(&state, id).await?;
    let routine = state
        .db
        .get_routine(item.routine_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("routine {} not found", item.routine_id)))?;
    if routine.user_id != current.id() {
        return Err(ApiError::forbidden());
    }

    let item = state.db.set_uncompleted(id).await?;
    state.db.refresh_routine_status(routine.id).await?;
    state
        .db
        .log_activity(
            &NewActivity::new(current.id(), "uncomplete_task")
                .details(item.task.clone())
                .origin(meta.ip_address, meta.user_agent),
        )
        .await?;

    Ok(Json(item))
}

/// The caller's checklist items for a day (today by default).
pub async fn list_tasks(
    State(state): State<ApiState>,
    current: CurrentUser,
    Query(query): Query<TaskQuery>,
) -> ApiResult<TasksResponse> {
    let date = query.date.unwrap_or_else(today);
    let priority = query
        .priority
        .map(Priority::try_from)
        .transpose()?
        .map(|p| p.value());

    let all = state.db.tasks_for_user_on(current.id(), date).await?;
    let completed = all.iter().filter(|t| t.completed).count() as i64;
    let summary = DaySummary::new(all.len() as i64, completed);

    let tasks = all
        .into_iter()
        .filter(|t| match query.status {
            Some(TaskStatusFilter::Pending) => !t.completed,
            Some(TaskStatusFilter::Completed) => t.completed,
            None => true,
        })
        .filter(|t| priority.map_or(true, |p| t.priority == p))
        .collect();

    Ok(Json(TasksResponse {
        date,
        tasks,
        summary,
    }))
}
