use axum::extract::State;
use chrono::{DateTime, Duration, Utc};
use gerot_db::{password::verify_password, NewActivity, SectorRecord, UserRecord};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    auth::{issue_token, CurrentUser, RequestMeta},
    error::{ApiError, ApiResult},
    extract::Json,
    state::ApiState,
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email
    #[serde(alias = "email")]
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub first_login: bool,
    pub user: UserRecord,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserRecord,
    pub sector: Option<SectorRecord>,
    pub unread_notifications: i64,
}

pub async fn login(
    State(state): State<ApiState>,
    meta: RequestMeta,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let invalid = || ApiError::Unauthorized("Usuário ou senha inválidos".to_string());

    let user = state
        .db
        .find_login(&payload.username)
        .await?
        .ok_or_else(invalid)?;

    let password_ok = user
        .password_hash
        .as_deref()
        .map(|hash| verify_password(&payload.password, hash))
        .unwrap_or(false);
    if !password_ok {
        tracing::info!("Failed login for '{}'", payload.username.trim());
        return Err(invalid());
    }
    if !user.is_active {
        return Err(ApiError::Unauthorized("Usuário inativo".to_string()));
    }

    state.db.prune_sessions().await?;
    let session = state
        .db
        .create_session(user.id, Duration::hours(state.settings.session_ttl_hours))
        .await?;
    let token = issue_token(&state.settings.secret_key, &user, &session)?;

    state.db.touch_last_login(user.id).await?;
    state
        .db
        .log_activity(
            &NewActivity::new(user.id, "login").origin(meta.ip_address, meta.user_agent),
        )
        .await?;

    tracing::info!(user_id = user.id, role = %user.role(), "User logged in");

    Ok(Json(LoginResponse {
        token,
        expires_at: session.expires_at,
        first_login: user.first_login,
        user,
    }))
}

pub async fn logout(
    State(state): State<ApiState>,
    current: CurrentUser,
    meta: RequestMeta,
) -> ApiResult<Value> {
    state.db.revoke_session(&current.session_id).await?;
    state
        .db
        .log_activity(
            &NewActivity::new(current.id(), "logout").origin(meta.ip_address, meta.user_agent),
        )
        .await?;

    Ok(Json(json!({ "message": "Logout realizado com sucesso" })))
}

pub async fn me(State(state): State<ApiState>, current: CurrentUser) -> ApiResult<MeResponse> {
    let sector = match current.user.sector_id {
        Some(id) => state.db.get_sector(id).await?,
        None => None,
    };
    let unread_notifications = state.db.unread_notification_count(current.id()).await?;

    Ok(Json(MeResponse {
        user: current.user,
        sector,
        unread_notifications,
    }))
}

/// The current password is required except on the first login.
pub async fn change_password(
    State(state): State<ApiState>,
    current: CurrentUser,
    meta: RequestMeta,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<Value> {
    if !current.user.first_login {
        let confirmed = match (payload.current_password.as_deref(), current.user.password_hash.as_deref()) {
            (Some(given), Some(hash)) => verify_password(given, hash),
            _ => false,
        };
        if !confirmed {
            return Err(ApiError::BadRequest("Senha atual incorreta".to_string()));
        }
    }

    state.db.set_password(current.id(), &payload.new_password).await?;
    state
        .db
        .log_activity(
            &NewActivity::new(current.id(), "change_password")
                .origin(meta.ip_address, meta.user_agent),
        )
        .await?;

    Ok(Json(json!({ "message": "Senha alterada com sucesso" })))
}
