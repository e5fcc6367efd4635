use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{handlers, state::ApiState};

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health::health_check))
        .route("/api/health", get(handlers::health::api_health))
        .route("/api/agent/health", get(handlers::health::agent_health))

        // Auth
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/auth/change-password", post(handlers::auth::change_password))

        // Users & sectors
        .route(
            "/api/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/api/users/:id",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        .route(
            "/api/sectors",
            get(handlers::sectors::list_sectors).post(handlers::sectors::create_sector),
        )
        .route(
            "/api/sectors/:id",
            get(handlers::sectors::get_sector)
                .put(handlers::sectors::update_sector)
                .delete(handlers::sectors::delete_sector),
        )

        // Routines & checklists
        .route(
            "/api/routines",
            get(handlers::routines::list_routines).post(handlers::routines::create_routine),
        )
        .route(
            "/api/routines/:id",
            get(handlers::routines::get_routine)
                .put(handlers::routines::update_routine)
                .delete(handlers::routines::delete_routine),
        )
        .route("/api/routines/:id/items", post(handlers::routines::add_item))
        .route(
            "/api/items/:id",
            put(handlers::items::update_item).delete(handlers::items::delete_item),
        )
        .route("/api/items/:id/complete", post(handlers::items::complete_item))
        .route("/api/items/:id/uncomplete", post(handlers::items::uncomplete_item))
        .route("/api/tasks", get(handlers::items::list_tasks))

        // Dashboards & reports
        .route("/api/dashboard", get(handlers::dashboard::dashboard))
        .route("/api/reports/completion", get(handlers::reports::completion_report))
        .route("/api/reports/sectors", get(handlers::reports::sectors_report))
        .route(
            "/api/goals",
            get(handlers::goals::list_goals).post(handlers::goals::create_goal),
        )
        .route(
            "/api/goals/:id",
            put(handlers::goals::update_goal).delete(handlers::goals::delete_goal),
        )
        .route("/api/notifications", get(handlers::notifications::list_notifications))
        .route("/api/notifications/:id/read", post(handlers::notifications::mark_read))
        .route("/api/notifications/read-all", post(handlers::notifications::mark_all_read))
        .route("/api/activity", get(handlers::activity::list_activity))

        // Rooms & environments
        .route(
            "/api/room-bookings",
            get(handlers::bookings::list_bookings).post(handlers::bookings::create_booking),
        )
        .route(
            "/api/room-bookings/:id",
            get(handlers::bookings::get_booking)
                .put(handlers::bookings::update_booking)
                .delete(handlers::bookings::cancel_booking),
        )
        .route(
            "/api/environments",
            get(handlers::environments::list_environments)
                .post(handlers::environments::create_environment),
        )
        .route(
            "/api/environments/:id",
            get(handlers::environments::get_environment)
                .put(handlers::environments::update_environment)
                .delete(handlers::environments::delete_environment),
        )
        .route(
            "/api/environments/:id/resources",
            get(handlers::environments::list_resources)
                .post(handlers::environments::add_resource),
        )
        .route("/api/resources/:id", delete(handlers::environments::delete_resource))

        // Agent jobs (users)
        .route("/api/agent/rpa-types", get(handlers::agent::list_rpa_types))
        .route(
            "/api/agent/rpa",
            get(handlers::agent::list_rpas).post(handlers::agent::create_rpa),
        )
        .route(
            "/api/agent/rpa/:id",
            get(handlers::agent::get_rpa).delete(handlers::agent::delete_rpa),
        )
        .route("/api/agent/rpa/:id/execute", post(handlers::agent::execute_rpa))
        .route("/api/agent/rpa/:id/logs", get(handlers::agent::rpa_logs))
        .route(
            "/api/agent/dashboard-gen",
            get(handlers::agent::list_dashboards).post(handlers::agent::create_dashboard),
        )
        .route(
            "/api/agent/dashboard-gen/:id",
            get(handlers::agent::get_dashboard).delete(handlers::agent::delete_dashboard),
        )
        .route(
            "/api/agent/dashboard-gen/:id/refresh",
            post(handlers::agent::refresh_dashboard),
        )
        .route(
            "/api/agent/dashboard-template",
            get(handlers::templates::list_templates)
                .post(handlers::templates::create_template)
                .put(handlers::templates::update_template),
        )
        .route(
            "/api/agent/dashboard-template/:id",
            get(handlers::templates::get_template).delete(handlers::templates::delete_template),
        )

        // Agent daemon
        .route("/api/agent/rpas/pending", get(handlers::agent::pending_rpas))
        .route("/api/agent/rpa/:id/result", post(handlers::agent::submit_rpa_result))
        .route("/api/agent/dashboards/pending", get(handlers::agent::pending_dashboards))
        .route(
            "/api/agent/dashboard/:id/result",
            post(handlers::agent::submit_dashboard_result),
        )

        // Add state
        .with_state(state)

        // Add tracing & CORS
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
