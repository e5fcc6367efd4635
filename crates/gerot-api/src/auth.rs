//! Bearer-token sessions for users and the shared key for the polling agent.

use std::convert::Infallible;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use chrono::Utc;
use gerot_core::Actor;
use gerot_db::{SessionRecord, UserRecord};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, state::ApiState};

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Session id; revoking the session invalidates the token
    pub sid: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

pub fn issue_token(
    secret: &str,
    user: &UserRecord,
    session: &SessionRecord,
) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user.id.to_string(),
        sid: session.id.clone(),
        role: user.role().as_str().to_string(),
        iat: Utc::now().timestamp(),
        exp: session.expires_at.timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("Failed to sign token: {}", e)))
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized("Token inválido ou expirado".to_string()))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// The logged-in user behind a request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: UserRecord,
    pub session_id: String,
}

impl CurrentUser {
    pub fn actor(&self) -> Actor {
        self.user.actor()
    }

    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.user.role().is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }
}

#[async_trait]
impl FromRequestParts<ApiState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("Autenticação necessária".to_string()))?;
        let claims = decode_token(&state.settings.secret_key, token)?;
        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| ApiError::Unauthorized("Token inválido".to_string()))?;

        let session = state
            .db
            .get_active_session(&claims.sid)
            .await?
            .filter(|s| s.user_id == user_id)
            .ok_or_else(|| ApiError::Unauthorized("Sessão expirada".to_string()))?;

        let user = state
            .db
            .get_user(user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| ApiError::Unauthorized("Usuário inativo".to_string()))?;

        Ok(CurrentUser {
            user,
            session_id: session.id,
        })
    }
}

/// Guards the endpoints the polling agent calls. Open when no key is configured.
#[derive(Debug, Clone, Copy)]
pub struct AgentAuth;

#[async_trait]
impl FromRequestParts<ApiState> for AgentAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.settings.agent_key() else {
            return Ok(AgentAuth);
        };

        let provided = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());

        match provided {
            Some(key) if key == expected => Ok(AgentAuth),
            _ => {
                tracing::warn!("Rejected agent request with missing or invalid API key");
                Err(ApiError::Unauthorized("Invalid API key".to_string()))
            }
        }
    }
}

/// Client address and user agent, recorded in the activity log.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestMeta {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let header_value = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };

        let ip_address = header_value("x-forwarded-for")
            .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
            .or_else(|| header_value("x-real-ip"));

        Ok(RequestMeta {
            ip_address,
            user_agent: header_value(header::USER_AGENT.as_str()),
        })
    }
}
