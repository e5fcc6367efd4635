use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn forbidden() -> Self {
        ApiError::Forbidden("Acesso negado".to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            ApiError::Internal(detail) => {
                tracing::error!("Request failed: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

impl From<gerot_db::Error> for ApiError {
    fn from(err: gerot_db::Error) -> Self {
        match err {
            gerot_db::Error::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            gerot_db::Error::Conflict(msg) => ApiError::Conflict(msg),
            gerot_db::Error::Validation(msg) => ApiError::BadRequest(msg),
            gerot_db::Error::Domain(e) => ApiError::BadRequest(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<gerot_core::Error> for ApiError {
    fn from(err: gerot_core::Error) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

pub type ApiResult<T> = Result<crate::extract::Json<T>, ApiError>;
