use axum::extract::State;
use chrono::NaiveDate;
use gerot_core::{DaySummary, Role, RoutineStatus};
use gerot_db::{
    ActivityLog, GlobalStats, GoalRecord, SectorBreakdown, SectorDayStats, TaskView,
    UserCompletion,
};
use serde::Serialize;

use super::today;
use crate::{
    auth::CurrentUser,
    error::ApiResult,
    extract::Json,
    state::ApiState,
};

const RECENT_ACTIVITY: i64 = 10;

/// Role-specific landing data.
#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Dashboard {
    AdminMaster {
        date: NaiveDate,
        stats: GlobalStats,
        sectors: Vec<SectorBreakdown>,
        recent_activity: Vec<ActivityLog>,
    },
    Lider {
        date: NaiveDate,
        sector: Option<SectorDayStats>,
        team: Vec<UserCompletion>,
        goals: Vec<GoalRecord>,
        recent_activity: Vec<ActivityLog>,
    },
    Colaborador {
        date: NaiveDate,
        tasks: Vec<TaskView>,
        summary: DaySummary,
        unread_notifications: i64,
    },
}

pub async fn dashboard(State(state): State<ApiState>, current: CurrentUser) -> ApiResult<Dashboard> {
    let date = today();
    let db = &state.db;

    let dashboard = match current.user.role() {
        Role::AdminMaster => Dashboard::AdminMaster {
            date,
            stats: db.global_stats(date).await?,
            sectors: db.sector_breakdown().await?,
            recent_activity: db.recent_activity(RECENT_ACTIVITY).await?,
        },
        Role::Lider => match current.user.sector_id {
            Some(sector_id) => Dashboard::Lider {
                date,
                sector: db.sector_stats_on(date, Some(sector_id)).await?.into_iter().next(),
                team: db.user_completion(date, date, Some(sector_id)).await?,
                goals: db.list_goals(Some(sector_id), Some(RoutineStatus::Active)).await?,
                recent_activity: db.activity_for_sector(sector_id, RECENT_ACTIVITY).await?,
            },
            None => Dashboard::Lider {
                date,
                sector: None,
                team: Vec::new(),
                goals: Vec::new(),
                recent_activity: db.activity_for_user(current.id(), RECENT_ACTIVITY).await?,
            },
        },
        Role::Colaborador => Dashboard::Colaborador {
            date,
            tasks: db.tasks_for_user_on(current.id(), date).await?,
            summary: db.day_summary(current.id(), date).await?,
            unread_notifications: db.unread_notification_count(current.id()).await?,
        },
    };

    Ok(Json(dashboard))
}
