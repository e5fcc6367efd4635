//! Remote query jobs: management endpoints for users and the polling endpoints
//! used by `gerot-agent`.

use axum::extract::State;
use gerot_core::{
    prepare_query, Actor, ExecutionReport, PendingDashboardsResponse, PendingRpasResponse,
};
use gerot_db::{
    AgentLogRecord, DashboardRequestRecord, NewDashboardRequest, NewRpa, RpaRecord, RpaTypeRecord,
};
use serde_json::{json, Value};

use crate::{
    auth::{AgentAuth, CurrentUser},
    error::{ApiError, ApiResult},
    extract::{Json, Path},
    state::ApiState,
};

/// Jobs handed to the agent per poll.
const CLAIM_BATCH: i64 = 10;

fn can_access_job(actor: Actor, created_by: Option<i64>) -> bool {
    actor.role.is_admin() || created_by == Some(actor.user_id)
}

/// Rejects queries the agent would refuse to run.
fn validate_query_params(params: Option<&Value>) -> Result<(), ApiError> {
    match params {
        Some(value) if value.get("query").is_some() => {
            prepare_query(Some(value))?;
            Ok(())
        }
        _ => Ok(()),
    }
}

async fn load_rpa(state: &ApiState, actor: Actor, id: i64) -> Result<RpaRecord, ApiError> {
    let rpa = state
        .db
        .get_rpa(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("RPA {} not found", id)))?;
    if !can_access_job(actor, rpa.created_by) {
        return Err(ApiError::forbidden());
    }
    Ok(rpa)
}

async fn load_dashboard(
    state: &ApiState,
    actor: Actor,
    id: i64,
) -> Result<DashboardRequestRecord, ApiError> {
    let request = state
        .db
        .get_dashboard_request(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("dashboard request {} not found", id)))?;
    if !can_access_job(actor, request.created_by) {
        return Err(ApiError::forbidden());
    }
    Ok(request)
}

// ============================================================================
// User side
// ============================================================================

pub async fn list_rpa_types(
    State(state): State<ApiState>,
    _current: CurrentUser,
) -> ApiResult<Vec<RpaTypeRecord>> {
    Ok(Json(state.db.list_rpa_types().await?))
}

pub async fn list_rpas(
    State(state): State<ApiState>,
    current: CurrentUser,
) -> ApiResult<Vec<RpaRecord>> {
    let owner = (!current.actor().role.is_admin()).then(|| current.id());
    Ok(Json(state.db.list_rpas(owner).await?))
}

pub async fn create_rpa(
    State(state): State<ApiState>,
    current: CurrentUser,
    Json(mut payload): Json<NewRpa>,
) -> ApiResult<RpaRecord> {
    validate_query_params(payload.parameters.as_ref())?;
    if let Some(type_id) = payload.rpa_type_id {
        let known = state
            .db
            .list_rpa_types()
            .await?
            .iter()
            .any(|t| t.id == type_id);
        if !known {
            return Err(ApiError::BadRequest(format!("unknown RPA type {}", type_id)));
        }
    }
    payload.created_by = Some(current.id());

    let rpa = state.db.create_rpa(&payload).await?;
    tracing::info!(rpa_id = rpa.id, priority = %rpa.priority, "RPA queued: {}", rpa.name);
    Ok(Json(rpa))
}

pub async fn get_rpa(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<RpaRecord> {
    Ok(Json(load_rpa(&state, current.actor(), id).await?))
}

pub async fn delete_rpa(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Value> {
    load_rpa(&state, current.actor(), id).await?;
    state.db.delete_rpa(id).await?;
    Ok(Json(json!({ "message": "RPA excluído", "id": id })))
}

/// Puts the job back in the agent's queue.
pub async fn execute_rpa(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<RpaRecord> {
    let rpa = load_rpa(&state, current.actor(), id).await?;
    if rpa.status == "running" {
        return Err(ApiError::Conflict(format!("RPA {} is already running", id)));
    }
    Ok(Json(state.db.requeue_rpa(id, Some(current.id())).await?))
}

pub async fn rpa_logs(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Vec<AgentLogRecord>> {
    load_rpa(&state, current.actor(), id).await?;
    Ok(Json(state.db.agent_logs_for("rpa", id).await?))
}

pub async fn list_dashboards(
    State(state): State<ApiState>,
    current: CurrentUser,
) -> ApiResult<Vec<DashboardRequestRecord>> {
    let owner = (!current.actor().role.is_admin()).then(|| current.id());
    Ok(Json(state.db.list_dashboard_requests(owner).await?))
}

pub async fn create_dashboard(
    State(state): State<ApiState>,
    current: CurrentUser,
    Json(mut payload): Json<NewDashboardRequest>,
) -> ApiResult<DashboardRequestRecord> {
    validate_query_params(payload.filters.as_ref())?;
    payload.created_by = Some(current.id());
    Ok(Json(state.db.create_dashboard_request(&payload).await?))
}

pub async fn get_dashboard(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<DashboardRequestRecord> {
    Ok(Json(load_dashboard(&state, current.actor(), id).await?))
}

pub async fn delete_dashboard(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Value> {
    load_dashboard(&state, current.actor(), id).await?;
    state.db.delete_dashboard_request(id).await?;
    Ok(Json(json!({ "message": "Dashboard excluído", "id": id })))
}

pub async fn refresh_dashboard(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<DashboardRequestRecord> {
    let request = load_dashboard(&state, current.actor(), id).await?;
    if request.status == "processing" {
        return Err(ApiError::Conflict(format!(
            "dashboard request {} is being processed",
            id
        )));
    }
    Ok(Json(
        state
            .db
            .requeue_dashboard_request(id, Some(current.id()))
            .await?,
    ))
}

// ============================================================================
// Agent side
// ============================================================================

pub async fn pending_rpas(
    State(state): State<ApiState>,
    _agent: AgentAuth,
) -> ApiResult<PendingRpasResponse> {
    let rpas = state.db.claim_pending_rpas(CLAIM_BATCH).await?;
    if !rpas.is_empty() {
        tracing::info!("Handing {} RPA(s) to the agent", rpas.len());
    }
    Ok(Json(PendingRpasResponse { rpas }))
}

pub async fn submit_rpa_result(
    State(state): State<ApiState>,
    _agent: AgentAuth,
    Path(id): Path<i64>,
    Json(report): Json<ExecutionReport>,
) -> ApiResult<Value> {
    let rpa = state.db.complete_rpa(id, &report).await?;
    tracing::info!(
        rpa_id = id,
        status = %rpa.status,
        rows = report.row_count,
        "RPA result received"
    );
    Ok(Json(json!({ "success": true, "status": rpa.status })))
}

pub async fn pending_dashboards(
    State(state): State<ApiState>,
    _agent: AgentAuth,
) -> ApiResult<PendingDashboardsResponse> {
    let dashboards = state.db.claim_pending_dashboards(CLAIM_BATCH).await?;
    if !dashboards.is_empty() {
        tracing::info!("Handing {} dashboard request(s) to the agent", dashboards.len());
    }
    Ok(Json(PendingDashboardsResponse { dashboards }))
}

pub async fn submit_dashboard_result(
    State(state): State<ApiState>,
    _agent: AgentAuth,
    Path(id): Path<i64>,
    Json(report): Json<ExecutionReport>,
) -> ApiResult<Value> {
    let request = state.db.complete_dashboard(id, &report).await?;
    tracing::info!(
        dashboard_id = id,
        status = %request.status,
        rows = report.row_count,
        "Dashboard result received"
    );
    Ok(Json(json!({ "success": true, "status": request.status })))
}
