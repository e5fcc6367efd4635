use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use gerot_core::{
    Actor, BreakType, ExecutionReport, Priority, ResourceType, Role, RoutineStatus, RpaPriority,
    TimeSlot,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow};

// ============================================================================
// Users & sessions
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub full_name: Option<String>,
    pub role: String,
    pub sector_id: Option<i64>,
    pub is_active: bool,
    pub first_login: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Unknown role strings are treated as the least privileged role.
    pub fn role(&self) -> Role {
        Role::from_legacy(&self.role).unwrap_or(Role::Colaborador)
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.role(), self.sector_id)
    }

    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub role: Role,
    pub sector_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub sector_id: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Sectors
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SectorRecord {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub leader_email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sector row with the number of active users assigned to it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SectorSummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub leader_email: Option<String>,
    pub is_active: bool,
    pub users_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSector {
    pub name: String,
    pub description: Option<String>,
    pub leader_email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SectorUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub leader_email: Option<String>,
    pub is_active: Option<bool>,
}

// ============================================================================
// Routines & checklists
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoutineRecord {
    pub id: i64,
    pub user_id: i64,
    pub sector_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub priority: i64,
    pub status: String,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChecklistItemRecord {
    pub id: i64,
    pub routine_id: i64,
    pub task: String,
    pub completed: bool,
    pub break_type: Option<String>,
    pub priority: i64,
    pub estimated_minutes: Option<i64>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChecklistItemRecord {
    pub fn priority(&self) -> Priority {
        Priority::from_stored(self.priority)
    }

    pub fn break_type(&self) -> Option<BreakType> {
        self.break_type.as_deref().and_then(|b| b.parse().ok())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewChecklistItem {
    pub task: String,
    #[serde(default)]
    pub break_type: Option<BreakType>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub estimated_minutes: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChecklistItemUpdate {
    pub task: Option<String>,
    pub break_type: Option<BreakType>,
    pub priority: Option<Priority>,
    pub estimated_minutes: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewRoutine {
    pub user_id: i64,
    pub sector_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub priority: Priority,
    pub created_by: Option<i64>,
    pub items: Vec<NewChecklistItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoutineUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub priority: Option<Priority>,
    pub status: Option<RoutineStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct RoutineFilter {
    pub user_id: Option<i64>,
    pub sector_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// A checklist item joined with the routine it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskView {
    pub id: i64,
    pub routine_id: i64,
    pub routine_title: String,
    pub date: NaiveDate,
    pub task: String,
    pub completed: bool,
    pub break_type: Option<String>,
    pub priority: i64,
    pub estimated_minutes: Option<i64>,
    pub completed_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Activity, goals, notifications
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityLog {
    pub id: i64,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub action: String,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewActivity {
    pub user_id: Option<i64>,
    pub action: String,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl NewActivity {
    pub fn new(user_id: i64, action: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id),
            action: action.into(),
            ..Default::default()
        }
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn origin(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GoalRecord {
    pub id: i64,
    pub sector_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub target_value: Option<f64>,
    pub current_value: f64,
    pub unit: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub status: String,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewGoal {
    pub sector_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub target_value: Option<f64>,
    pub unit: Option<String>,
    pub deadline: Option<NaiveDate>,
    #[serde(skip)]
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoalUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_value: Option<f64>,
    pub current_value: Option<f64>,
    pub unit: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub status: Option<RoutineStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationRecord {
    pub id: i64,
    pub user_id: i64,
    pub kind: String,
    pub message: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Dashboards & reports
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct GlobalStats {
    pub total_users: i64,
    pub total_sectors: i64,
    pub routines_today: i64,
    pub tasks_today: i64,
    pub completed_today: i64,
    #[sqlx(default)]
    pub percentage: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SectorBreakdown {
    pub id: i64,
    pub name: String,
    pub users_count: i64,
    pub leaders_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SectorDayStats {
    pub sector_id: i64,
    pub name: String,
    pub team_members: i64,
    pub routines: i64,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    #[sqlx(default)]
    pub percentage: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserCompletion {
    pub user_id: i64,
    pub username: String,
    pub full_name: Option<String>,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    #[sqlx(default)]
    pub percentage: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DayCompletion {
    pub date: NaiveDate,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    #[sqlx(default)]
    pub percentage: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct TableCounts {
    pub users: i64,
    pub active_users: i64,
    pub admin_masters: i64,
    pub lideres: i64,
    pub colaboradores: i64,
    pub sectors: i64,
    pub routines: i64,
    pub checklist_items: i64,
    pub completed_items: i64,
    pub activity_logs: i64,
    pub pending_rpas: i64,
}

// ============================================================================
// Agent jobs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RpaTypeRecord {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RpaRecord {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub rpa_type_id: Option<i64>,
    pub type_name: Option<String>,
    pub priority: String,
    pub frequency: Option<String>,
    pub parameters: Option<Json<Value>>,
    pub status: String,
    pub result: Option<Json<Value>>,
    pub error_message: Option<String>,
    pub created_by: Option<i64>,
    pub executed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRpa {
    pub name: String,
    pub description: Option<String>,
    pub rpa_type_id: Option<i64>,
    #[serde(default)]
    pub priority: RpaPriority,
    pub frequency: Option<String>,
    pub parameters: Option<Value>,
    #[serde(skip)]
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DashboardRequestRecord {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub chart_types: Option<Json<Vec<String>>>,
    pub filters: Option<Json<Value>>,
    pub status: String,
    pub result_data: Option<Json<Value>>,
    pub error_message: Option<String>,
    pub created_by: Option<i64>,
    pub processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDashboardRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub chart_types: Vec<String>,
    pub filters: Option<Value>,
    #[serde(skip)]
    pub created_by: Option<i64>,
}

fn default_category() -> String {
    "general".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AgentLogRecord {
    pub id: i64,
    pub action_type: String,
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub user_id: Option<i64>,
    pub details: Option<Json<Value>>,
    pub created_at: DateTime<Utc>,
}

/// Stored form of an agent result, capped at `MAX_RESULT_ROWS` rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResult {
    pub data: Vec<serde_json::Map<String, Value>>,
    pub row_count: usize,
    pub source: String,
}

impl StoredResult {
    pub fn from_report(report: &ExecutionReport) -> Self {
        Self {
            data: report.stored_rows(),
            row_count: report.row_count,
            source: "agent_local".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DashboardTemplateRecord {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub query_config: Option<Json<Value>>,
    pub charts_config: Option<Json<Value>>,
    pub layout_config: Option<Json<Value>>,
    pub is_published: bool,
    pub is_public: bool,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DashboardTemplateRecord {
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.created_by == Some(user_id)
    }
}

/// Body of template create and update requests; absent fields keep their value on update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardTemplateInput {
    /// Target of an update
    pub id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub query_config: Option<Value>,
    pub charts_config: Option<Value>,
    pub layout_config: Option<Value>,
    pub is_published: Option<bool>,
    pub is_public: Option<bool>,
}

// ============================================================================
// Facilities
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoomBookingRecord {
    pub id: i64,
    pub user_id: i64,
    pub user_name: Option<String>,
    pub room: String,
    pub title: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub participants: i64,
    pub subject: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomBookingRecord {
    pub fn slot(&self) -> TimeSlot {
        TimeSlot {
            start: self.start_time,
            end: self.end_time,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRoomBooking {
    pub room: String,
    pub title: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub participants: i64,
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomBookingUpdate {
    pub room: Option<String>,
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub participants: Option<i64>,
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub room: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EnvironmentRecord {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub capacity: Option<i64>,
    pub area_m2: Option<f64>,
    pub floor: i64,
    pub display_order: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Environment listing row with resource counts per type.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EnvironmentSummary {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub capacity: Option<i64>,
    pub area_m2: Option<f64>,
    pub floor: i64,
    pub display_order: i64,
    pub resource_count: i64,
    pub models_3d: i64,
    pub plants_2d: i64,
    pub photos: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewEnvironment {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub capacity: Option<i64>,
    pub area_m2: Option<f64>,
    #[serde(default = "default_floor")]
    pub floor: i64,
    #[serde(default)]
    pub display_order: i64,
}

fn default_floor() -> i64 {
    1
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvironmentUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub capacity: Option<i64>,
    pub area_m2: Option<f64>,
    pub floor: Option<i64>,
    pub display_order: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResourceRecord {
    pub id: i64,
    pub environment_id: i64,
    pub resource_type: String,
    pub file_name: String,
    pub file_url: String,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub description: Option<String>,
    pub is_primary: bool,
    pub display_order: i64,
    pub uploaded_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl ResourceRecord {
    pub fn resource_type(&self) -> Option<ResourceType> {
        self.resource_type.parse().ok()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewResource {
    pub resource_type: ResourceType,
    pub file_name: String,
    pub file_url: String,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub display_order: i64,
    #[serde(skip)]
    pub uploaded_by: Option<i64>,
}
