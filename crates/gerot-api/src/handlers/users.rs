use axum::extract::State;
use gerot_core::Role;
use gerot_db::{NewActivity, NewUser, UserRecord, UserUpdate};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    auth::{CurrentUser, RequestMeta},
    error::{ApiError, ApiResult},
    extract::{Json, Path, Query},
    state::ApiState,
};

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub sector_id: Option<i64>,
}

async fn load_user(state: &ApiState, id: i64) -> Result<UserRecord, ApiError> {
    state
        .db
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {} not found", id)))
}

fn check_email(state: &ApiState, email: Option<&str>) -> Result<(), ApiError> {
    match email {
        Some(email) if !email.trim().is_empty() && !state.settings.email_allowed(email) => Err(
            ApiError::BadRequest("Email fora do domínio da empresa".to_string()),
        ),
        _ => Ok(()),
    }
}

/// Admins list everyone, lideres their own sector; colaboradores cannot list users.
pub async fn list_users(
    State(state): State<ApiState>,
    current: CurrentUser,
    Query(query): Query<UserListQuery>,
) -> ApiResult<Vec<UserRecord>> {
    let actor = current.actor();
    let sector = match actor.role {
        Role::AdminMaster => query.sector_id,
        Role::Lider => {
            let own = actor.sector_id.ok_or_else(ApiError::forbidden)?;
            if query.sector_id.map_or(false, |s| s != own) {
                return Err(ApiError::forbidden());
            }
            Some(own)
        }
        Role::Colaborador => return Err(ApiError::forbidden()),
    };

    Ok(Json(state.db.list_users(sector).await?))
}

pub async fn create_user(
    State(state): State<ApiState>,
    current: CurrentUser,
    meta: RequestMeta,
    Json(mut payload): Json<NewUser>,
) -> ApiResult<UserRecord> {
    let actor = current.actor();
    if payload.sector_id.is_none() && actor.role == Role::Lider {
        payload.sector_id = actor.sector_id;
    }
    if !actor.can_manage_user(payload.role, payload.sector_id) {
        return Err(ApiError::forbidden());
    }
    if payload.password.as_deref().map_or(true, |p| p.is_empty()) {
        return Err(ApiError::BadRequest("password is required".to_string()));
    }
    check_email(&state, payload.email.as_deref())?;
    if let Some(sector_id) = payload.sector_id {
        if state.db.get_sector(sector_id).await?.is_none() {
            return Err(ApiError::BadRequest(format!("sector {} does not exist", sector_id)));
        }
    }

    let user = state.db.create_user(&payload).await?;
    state
        .db
        .log_activity(
            &NewActivity::new(current.id(), "create_user")
                .details(format!("{} ({})", user.username, user.role))
                .origin(meta.ip_address, meta.user_agent),
        )
        .await?;

    tracing::info!(user_id = user.id, created_by = current.id(), "User created");
    Ok(Json(user))
}

pub async fn get_user(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<UserRecord> {
    let user = load_user(&state, id).await?;
    if !current.actor().can_view_user_data(user.id, user.sector_id) {
        return Err(ApiError::forbidden());
    }
    Ok(Json(user))
}

/// Users may edit their own name and email; anything else needs management rights
/// over both the current and the resulting role and sector.
pub async fn update_user(
    State(state): State<ApiState>,
    current: CurrentUser,
    meta: RequestMeta,
    Path(id): Path<i64>,
    Json(payload): Json<UserUpdate>,
) -> ApiResult<UserRecord> {
    let actor = current.actor();
    let target = load_user(&state, id).await?;

    let profile_only =
        payload.role.is_none() && payload.sector_id.is_none() && payload.is_active.is_none();
    let allowed = if actor.user_id == target.id && profile_only {
        true
    } else {
        let new_role = payload.role.unwrap_or_else(|| target.role());
        let new_sector = payload.sector_id.or(target.sector_id);
        actor.can_manage_user(target.role(), target.sector_id)
            && actor.can_manage_user(new_role, new_sector)
    };
    if !allowed {
        return Err(ApiError::forbidden());
    }
    check_email(&state, payload.email.as_deref())?;

    let user = state.db.update_user(id, &payload).await?;
    state
        .db
        .log_activity(
            &NewActivity::new(current.id(), "update_user")
                .details(user.username.clone())
                .origin(meta.ip_address, meta.user_agent),
        )
        .await?;

    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<ApiState>,
    current: CurrentUser,
    meta: RequestMeta,
    Path(id): Path<i64>,
) -> ApiResult<Value> {
    if id == current.id() {
        return Err(ApiError::BadRequest(
            "Você não pode excluir seu próprio usuário".to_string(),
        ));
    }
    let target = load_user(&state, id).await?;
    if !current.actor().can_manage_user(target.role(), target.sector_id) {
        return Err(ApiError::forbidden());
    }

    state.db.deactivate_user(id).await?;
    state
        .db
        .log_activity(
            &NewActivity::new(current.id(), "delete_user")
                .details(target.username.clone())
                .origin(meta.ip_address, meta.user_agent),
        )
        .await?;

    Ok(Json(json!({ "message": "Usuário desativado", "id": id })))
}
