pub mod access;
pub mod agent;
pub mod error;
pub mod facility;
pub mod role;
pub mod routine;

// Re-exports
pub use access::Actor;
pub use agent::{
    prepare_query, DashboardStatus, ExecutionReport, PendingDashboard, PendingDashboardsResponse,
    PendingRpa, PendingRpasResponse, RpaPriority, RpaStatus, MAX_RESULT_ROWS,
};
pub use error::{Error, Result};
pub use facility::{ResourceType, TimeSlot};
pub use role::Role;
pub use routine::{completion_percentage, BreakType, DaySummary, Priority, RoutineStatus};
