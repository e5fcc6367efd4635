use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;

use crate::state::ApiState;

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "gerot-api"
    }))
}

/// Health including a database round trip.
pub async fn api_health(State(state): State<ApiState>) -> impl IntoResponse {
    let database = match state.db.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::error!("Database health check failed: {}", e);
            "unavailable"
        }
    };

    Json(json!({
        "status": if database == "ok" { "healthy" } else { "degraded" },
        "service": "gerot-api",
        "database": database,
        "timestamp": Utc::now(),
    }))
}

pub async fn agent_health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "gerot-agent-api",
        "timestamp": Utc::now(),
    }))
}
