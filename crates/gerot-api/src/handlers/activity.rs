use axum::extract::State;
use gerot_core::Role;
use gerot_db::ActivityLog;
use serde::Deserialize;

use crate::{
    auth::CurrentUser,
    error::ApiResult,
    extract::{Json, Query},
    state::ApiState,
};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

/// Admins see everything, lideres their sector, colaboradores their own entries.
pub async fn list_activity(
    State(state): State<ApiState>,
    current: CurrentUser,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<Vec<ActivityLog>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let actor = current.actor();

    let logs = match (actor.role, actor.sector_id) {
        (Role::AdminMaster, _) => state.db.recent_activity(limit).await?,
        (Role::Lider, Some(sector_id)) => state.db.activity_for_sector(sector_id, limit).await?,
        _ => state.db.activity_for_user(actor.user_id, limit).await?,
    };

    Ok(Json(logs))
}
