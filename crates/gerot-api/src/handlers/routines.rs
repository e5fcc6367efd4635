use axum::extract::State;
use chrono::{NaiveDate, NaiveTime};
use gerot_core::{Actor, DaySummary, Priority, Role};
use gerot_db::{
    ChecklistItemRecord, NewActivity, NewChecklistItem, NewRoutine, RoutineFilter, RoutineRecord,
    RoutineUpdate,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::today;
use crate::{
    auth::{CurrentUser, RequestMeta},
    error::{ApiError, ApiResult},
    extract::{Json, Path, Query},
    state::ApiState,
};

#[derive(Debug, Default, Deserialize)]
pub struct RoutineQuery {
    pub date: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub user_id: Option<i64>,
    pub sector_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoutineRequest {
    /// Owner; defaults to the caller
    pub user_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub items: Vec<NewChecklistItem>,
}

#[derive(Debug, Serialize)]
pub struct RoutineDetail {
    #[serde(flatten)]
    pub routine: RoutineRecord,
    pub items: Vec<ChecklistItemRecord>,
    pub summary: DaySummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RoutineAccess {
    View,
    Edit,
}

/// Loads a routine and checks the caller may see or change it.
///
/// Owners can always edit; otherwise editing needs management rights over the owner.
pub(crate) async fn load_routine(
    state: &ApiState,
    actor: Actor,
    id: i64,
    access: RoutineAccess,
) -> Result<RoutineRecord, ApiError> {
    let routine = state
        .db
        .get_routine(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("routine {} not found", id)))?;

    if routine.user_id == actor.user_id {
        return Ok(routine);
    }

    let owner = state
        .db
        .get_user(routine.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {} not found", routine.user_id)))?;

    let allowed = match access {
        RoutineAccess::View => actor.can_view_user_data(owner.id, owner.sector_id),
        RoutineAccess::Edit => actor.can_manage_user(owner.role(), owner.sector_id),
    };
    if allowed {
        Ok(routine)
    } else {
        Err(ApiError::forbidden())
    }
}

pub(crate) async fn routine_detail(
    state: &ApiState,
    routine: RoutineRecord,
) -> Result<RoutineDetail, ApiError> {
    let items = state.db.items_for_routine(routine.id).await?;
    let completed = items.iter().filter(|i| i.completed).count() as i64;
    let summary = DaySummary::new(items.len() as i64, completed);

    Ok(RoutineDetail {
        routine,
        items,
        summary,
    })
}

/// Without any date filter the listing covers today.
pub async fn list_routines(
    State(state): State<ApiState>,
    current: CurrentUser,
    Query(query): Query<RoutineQuery>,
) -> ApiResult<Vec<RoutineRecord>> {
    let actor = current.actor();
    let mut filter = RoutineFilter {
        user_id: query.user_id,
        sector_id: query.sector_id,
        date: query.date,
        from: query.from,
        to: query.to,
    };
    if filter.date.is_none() && filter.from.is_none() && filter.to.is_none() {
        filter.date = Some(today());
    }

    match actor.role {
        Role::AdminMaster => {}
        Role::Lider => {
            let own = actor.sector_id.ok_or_else(ApiError::forbidden)?;
            if filter.sector_id.map_or(false, |s| s != own) {
                return Err(ApiError::forbidden());
            }
            if let Some(user_id) = filter.user_id {
                let owner = state.db.get_user(user_id).await?;
                if !owner.map_or(false, |u| actor.can_view_user_data(u.id, u.sector_id)) {
                    return Err(ApiError::forbidden());
                }
            } else {
                filter.sector_id = Some(own);
            }
        }
        Role::Colaborador => {
            if filter.user_id.map_or(false, |u| u != actor.user_id) {
                return Err(ApiError::forbidden());
            }
            filter.user_id = Some(actor.user_id);
            filter.sector_id = None;
        }
    }

    Ok(Json(state.db.list_routines(&filter).await?))
}

pub async fn create_routine(
    State(state): State<ApiState>,
    current: CurrentUser,
    meta: RequestMeta,
    Json(payload): Json<CreateRoutineRequest>,
) -> ApiResult<RoutineDetail> {
    let actor = current.actor();
    let owner = match payload.user_id {
        Some(user_id) if user_id != current.id() => {
            let owner = state
                .db
                .get_user(user_id)
                .await?
                .filter(|u| u.is_active)
                .ok_or_else(|| ApiError::NotFound(format!("user {} not found", user_id)))?;
            if !actor.can_manage_user(owner.role(), owner.sector_id) {
                return Err(ApiError::forbidden());
            }
            owner
        }
        _ => current.user.clone(),
    };

    let routine = state
        .db
        .create_routine(&NewRoutine {
            user_id: owner.id,
            sector_id: owner.sector_id,
            title: payload.title,
            description: payload.description,
            date: payload.date.unwrap_or_else(today),
            start_time: payload.start_time,
            end_time: payload.end_time,
            priority: payload.priority,
            created_by: Some(current.id()),
            items: payload.items,
        })
        .await?;

    state
        .db
        .log_activity(
            &NewActivity::new(current.id(), "create_routine")
                .details(format!("{} ({})", routine.title, routine.date))
                .origin(meta.ip_address, meta.user_agent),
        )
        .await?;

    if owner.id != current.id() {
        state
            .db
            .create_notification(
                owner.id,
                "routine_assigned",
                &format!(
                    "{} criou a rotina '{}' para você",
                    current.user.display_name(),
                    routine.title
                ),
                Some(("routine", routine.id)),
            )
            .await?;
    }

    Ok(Json(routine_detail(&state, routine).await?))
}

pub async fn get_routine(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<RoutineDetail> {
    let routine = load_routine(&state, current.actor(), id, RoutineAccess::View).await?;
    Ok(Json(routine_detail(&state, routine).await?))
}

pub async fn update_routine(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<RoutineUpdate>,
) -> ApiResult<RoutineDetail> {
    load_routine(&state, current.actor(), id, RoutineAccess::Edit).await?;
    let routine = state.db.update_routine(id, &payload).await?;
    Ok(Json(routine_detail(&state, routine).await?))
}

pub async fn delete_routine(
    State(state): State<ApiState>,
    current: CurrentUser,
    meta: RequestMeta,
    Path(id): Path<i64>,
) -> ApiResult<Value> {
    let routine = load_routine(&state, current.actor(), id, RoutineAccess::Edit).await?;
    state.db.delete_routine(id).await?;
    state
        .db
        .log_activity(
            &NewActivity::new(current.id(), "delete_routine")
                .details(routine.title)
                .origin(meta.ip_address, meta.user_agent),
        )
        .await?;

    Ok(Json(json!({ "message": "Rotina excluída", "id": id })))
}

pub async fn add_item(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<NewChecklistItem>,
) -> ApiResult<ChecklistItemRecord> {
    load_routine(&state, current.actor(), id, RoutineAccess::Edit).await?;
    let item = state.db.add_item(id, &payload).await?;
    state.db.refresh_routine_status(id).await?;
    Ok(Json(item))
}
