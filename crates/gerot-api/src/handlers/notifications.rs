use axum::extract::State;
use gerot_db::NotificationRecord;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    auth::CurrentUser,
    error::ApiResult,
    extract::{Json, Path, Query},
    state::ApiState,
};

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize)]
pub struct NotificationList {
    pub notifications: Vec<NotificationRecord>,
    pub unread_count: i64,
}

pub async fn list_notifications(
    State(state): State<ApiState>,
    current: CurrentUser,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<NotificationList> {
    Ok(Json(NotificationList {
        notifications: state
            .db
            .list_notifications(current.id(), query.unread_only)
            .await?,
        unread_count: state.db.unread_notification_count(current.id()).await?,
    }))
}

pub async fn mark_read(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Value> {
    state.db.mark_notification_read(id, current.id()).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn mark_all_read(
    State(state): State<ApiState>,
    current: CurrentUser,
) -> ApiResult<Value> {
    let updated = state.db.mark_all_notifications_read(current.id()).await?;
    Ok(Json(json!({ "success": true, "updated": updated })))
}
