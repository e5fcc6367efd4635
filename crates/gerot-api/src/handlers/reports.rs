use axum::extract::State;
use chrono::{Duration, NaiveDate};
use gerot_core::{Actor, Role};
use gerot_db::{DayCompletion, SectorDayStats, UserCompletion};
use serde::{Deserialize, Serialize};

use super::today;
use crate::{
    auth::CurrentUser,
    error::{ApiError, ApiResult},
    extract::{Json, Query},
    state::ApiState,
};

/// Longest range a completion report may span.
const MAX_REPORT_DAYS: i64 = 366;

#[derive(Debug, Default, Deserialize)]
pub struct CompletionQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub sector_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SectorReportQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct CompletionReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub sector_id: Option<i64>,
    pub users: Vec<UserCompletion>,
    pub days: Vec<DayCompletion>,
}

/// Sector the report is restricted to: admins choose freely, lideres get their own.
fn report_scope(actor: Actor, requested: Option<i64>) -> Result<Option<i64>, ApiError> {
    match actor.role {
        Role::AdminMaster => Ok(requested),
        Role::Lider => {
            let own = actor.sector_id.ok_or_else(ApiError::forbidden)?;
            match requested {
                Some(s) if s != own => Err(ApiError::forbidden()),
                _ => Ok(Some(own)),
            }
        }
        Role::Colaborador => Err(ApiError::forbidden()),
    }
}

/// Completion per user and per day; defaults to the last seven days.
pub async fn completion_report(
    State(state): State<ApiState>,
    current: CurrentUser,
    Query(query): Query<CompletionQuery>,
) -> ApiResult<CompletionReport> {
    let sector_id = report_scope(current.actor(), query.sector_id)?;
    let to = query.to.unwrap_or_else(today);
    let from = match query.from {
        Some(from) => from,
        None => to
            .checked_sub_signed(Duration::days(6))
            .ok_or_else(|| ApiError::BadRequest("'to' is out of range".to_string()))?,
    };
    if from > to {
        return Err(ApiError::BadRequest("'from' must not be after 'to'".to_string()));
    }
    if (to - from).num_days() >= MAX_REPORT_DAYS {
        return Err(ApiError::BadRequest(format!(
            "reports cover at most {} days",
            MAX_REPORT_DAYS
        )));
    }

    Ok(Json(CompletionReport {
        from,
        to,
        sector_id,
        users: state.db.user_completion(from, to, sector_id).await?,
        days: state.db.daily_completion(from, to, sector_id).await?,
    }))
}

pub async fn sectors_report(
    State(state): State<ApiState>,
    current: CurrentUser,
    Query(query): Query<SectorReportQuery>,
) -> ApiResult<Vec<SectorDayStats>> {
    let sector_id = report_scope(current.actor(), None)?;
    let date = query.date.unwrap_or_else(today);
    Ok(Json(state.db.sector_stats_on(date, sector_id).await?))
}
