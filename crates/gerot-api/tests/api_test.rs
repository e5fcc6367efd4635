use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use gerot_api::{create_router, ApiState, Settings};
use gerot_db::{Database, NewActivity};
use serde_json::{json, Value};
use tower::ServiceExt;

const ADMIN_PASSWORD: &str = "admin123";

async fn setup(settings: Settings) -> Router {
    setup_with_db(settings).await.0
}

async fn setup_with_db(settings: Settings) -> (Router, Database) {
    let db = Database::in_memory().await.unwrap();
    db.seed_defaults(ADMIN_PASSWORD).await.unwrap();
    (create_router(ApiState::new(db.clone(), settings)), db)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["token"].as_str().unwrap().to_string()
}

async fn sector_id(app: &Router, token: &str, name: &str) -> i64 {
    let (_, sectors) = send(app, "GET", "/api/sectors", Some(token), None).await;
    sectors
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["name"] == name)
        .and_then(|s| s["id"].as_i64())
        .unwrap()
}

async fn create_user(app: &Router, token: &str, username: &str, role: &str, sector: i64) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/users",
        Some(token),
        Some(json!({
            "username": username,
            "password": "senha123",
            "role": role,
            "sector_id": sector,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create user failed: {}", body);
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = setup(Settings::default()).await;

    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn test_login_and_session() {
    let app = setup(Settings::default()).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "admin_master", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "ADMIN_MASTER", "password": ADMIN_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["first_login"], true);
    assert!(body["user"].get("password_hash").is_none());
    let token = body["token"].as_str().unwrap().to_string();

    let (status, me) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["role"], "admin_master");
    assert_eq!(me["sector"]["name"], "Administrativo");

    let (status, _) = send(&app, "POST", "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_role_scoping() {
    let app = setup(Settings::default()).await;
    let admin = login(&app, "admin_master", ADMIN_PASSWORD).await;
    let ti = sector_id(&app, &admin, "TI").await;
    let comercial = sector_id(&app, &admin, "Comercial").await;

    create_user(&app, &admin, "lidia", "lider", ti).await;
    let colab_id = create_user(&app, &admin, "caio", "colaborador", ti).await;

    let colab = login(&app, "caio", "senha123").await;
    let (status, _) = send(&app, "GET", "/api/users", Some(&colab), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let lider = login(&app, "lidia", "senha123").await;
    let (status, users) = send(&app, "GET", "/api/users", Some(&lider), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 2);

    // Lideres only create colaboradores in their own sector.
    let (status, _) = send(
        &app,
        "POST",
        "/api/users",
        Some(&lider),
        Some(json!({ "username": "x", "password": "senha123", "role": "lider", "sector_id": ti })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(
        &app,
        "POST",
        "/api/users",
        Some(&lider),
        Some(json!({ "username": "y", "password": "senha123", "role": "colaborador", "sector_id": comercial })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "DELETE", &format!("/api/users/{}", colab_id), Some(&colab), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "DELETE", &format!("/api/sectors/{}", ti), Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_routine_completion_notifies_leader() {
    let app = setup(Settings::default()).await;
    let admin = login(&app, "admin_master", ADMIN_PASSWORD).await;
    let ops = sector_id(&app, &admin, "Operacional").await;
    create_user(&app, &admin, "leo", "lider", ops).await;
    create_user(&app, &admin, "bia", "colaborador", ops).await;

    let bia = login(&app, "bia", "senha123").await;
    let (status, routine) = send(
        &app,
        "POST",
        "/api/routines",
        Some(&bia),
        Some(json!({
            "title": "Expedição",
            "date": "2026-10-15",
            "items": [
                { "task": "Conferir notas", "priority": 1 },
                { "task": "Liberar cargas", "priority": 3 },
                { "task": "Almoço", "break_type": "lunch" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", routine);
    let items = routine["items"].as_array().unwrap();
    assert_eq!(items[0]["task"], "Liberar cargas");
    assert_eq!(routine["summary"]["percentage"], 0);

    let item_id = items[0]["id"].as_i64().unwrap();
    let (status, item) = send(
        &app,
        "POST",
        &format!("/api/items/{}/complete", item_id),
        Some(&bia),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["completed"], true);
    assert!(item["completed_at"].is_string());

    // Only the owner may tick items.
    let leo = login(&app, "leo", "senha123").await;
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/items/{}/uncomplete", item_id),
        Some(&leo),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, notifications) = send(&app, "GET", "/api/notifications", Some(&leo), None).await;
    assert_eq!(notifications["unread_count"], 1);
    assert_eq!(notifications["notifications"][0]["kind"], "task_completed");

    let routine_id = routine["id"].as_i64().unwrap();
    let (status, detail) = send(
        &app,
        "GET",
        &format!("/api/routines/{}", routine_id),
        Some(&leo),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["summary"]["completed"], 1);
    assert_eq!(detail["summary"]["percentage"], 33);

    let (status, item) = send(
        &app,
        "POST",
        &format!("/api/items/{}/uncomplete", item_id),
        Some(&bia),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(item["completed_at"].is_null());

    let (status, tasks) = send(&app, "GET", "/api/tasks?date=2026-10-15", Some(&bia), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tasks["tasks"].as_array().unwrap().len(), 3);

    let (status, dashboard) = send(&app, "GET", "/api/dashboard", Some(&bia), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["role"], "colaborador");
}

#[tokio::test]
async fn test_agent_endpoints_require_key() {
    let settings = Settings {
        agent_api_key: Some("agent-secret".to_string()),
        ..Default::default()
    };
    let app = setup(settings).await;
    let admin = login(&app, "admin_master", ADMIN_PASSWORD).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/agent/rpa",
        Some(&admin),
        Some(json!({ "name": "Bad", "parameters": { "query": "DELETE FROM clientes" } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, rpa) = send(
        &app,
        "POST",
        "/api/agent/rpa",
        Some(&admin),
        Some(json!({
            "name": "Clientes ativos",
            "priority": "high",
            "parameters": { "query": "SELECT * FROM clientes", "limit": 5 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", rpa);
    let rpa_id = rpa["id"].as_i64().unwrap();

    let pending = |key: Option<&'static str>| {
        let app = app.clone();
        async move {
            let mut request = Request::builder().uri("/api/agent/rpas/pending");
            if let Some(key) = key {
                request = request.header("x-api-key", key);
            }
            let response = app
                .oneshot(request.body(Body::empty()).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            (status, serde_json::from_slice::<Value>(&bytes).unwrap_or(Value::Null))
        }
    };

    assert_eq!(pending(None).await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(pending(Some("wrong")).await.0, StatusCode::UNAUTHORIZED);

    let (status, body) = pending(Some("agent-secret")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rpas"][0]["id"], rpa_id);
    assert_eq!(body["rpas"][0]["priority"], "high");

    let (_, body) = pending(Some("agent-secret")).await;
    assert!(body["rpas"].as_array().unwrap().is_empty());

    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/agent/rpa/{}/result", rpa_id))
        .header("x-api-key", "agent-secret")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "success": true,
                "data": [{ "id": 1 }, { "id": 2 }],
                "row_count": 2,
                "logs": ["ok"]
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, stored) = send(&app, "GET", &format!("/api/agent/rpa/{}", rpa_id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["status"], "completed");
    assert_eq!(stored["result"]["row_count"], 2);
    assert_eq!(stored["result"]["source"], "agent_local");
}

#[tokio::test]
async fn test_agent_endpoints_open_without_key() {
    let app = setup(Settings::default()).await;
    let (status, body) = send(&app, "GET", "/api/agent/dashboards/pending", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["dashboards"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_rejections_use_json_errors() {
    let app = setup(Settings::default()).await;
    let admin = login(&app, "admin_master", ADMIN_PASSWORD).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/routines",
        Some(&admin),
        Some(json!({ "title": "x", "priority": 9 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{}", body);

    let (status, body) = send(&app, "GET", "/api/tasks?date=notadate", Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{}", body);

    let (status, body) = send(&app, "GET", "/api/routines/abc", Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{}", body);
}

#[tokio::test]
async fn test_dashboard_per_role() {
    let app = setup(Settings::default()).await;
    let admin = login(&app, "admin_master", ADMIN_PASSWORD).await;
    let ti = sector_id(&app, &admin, "TI").await;
    create_user(&app, &admin, "lidia", "lider", ti).await;

    let (status, dashboard) = send(&app, "GET", "/api/dashboard", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["role"], "admin_master");
    assert!(dashboard["stats"].is_object());
    assert!(dashboard["sectors"].is_array());

    let lider = login(&app, "lidia", "senha123").await;
    let (status, dashboard) = send(&app, "GET", "/api/dashboard", Some(&lider), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["role"], "lider");
    assert!(dashboard["goals"].is_array());
    assert!(dashboard["team"].is_array());
    assert!(dashboard.get("stats").is_none());
}

#[tokio::test]
async fn test_activity_scoping_and_limit() {
    let (app, db) = setup_with_db(Settings::default()).await;
    let admin = login(&app, "admin_master", ADMIN_PASSWORD).await;
    let ti = sector_id(&app, &admin, "TI").await;
    let comercial = sector_id(&app, &admin, "Comercial").await;
    let lider_id = create_user(&app, &admin, "lidia", "lider", ti).await;
    let caio_id = create_user(&app, &admin, "caio", "colaborador", ti).await;
    let vera_id = create_user(&app, &admin, "vera", "colaborador", comercial).await;

    let lider = login(&app, "lidia", "senha123").await;
    let caio = login(&app, "caio", "senha123").await;
    login(&app, "vera", "senha123").await;

    let user_ids = |logs: &Value| -> Vec<i64> {
        logs.as_array()
            .unwrap()
            .iter()
            .filter_map(|l| l["user_id"].as_i64())
            .collect()
    };

    let (status, logs) = send(&app, "GET", "/api/activity", Some(&caio), None).await;
    assert_eq!(status, StatusCode::OK);
    let ids = user_ids(&logs);
    assert!(!ids.is_empty());
    assert!(ids.iter().all(|id| *id == caio_id));

    let (_, logs) = send(&app, "GET", "/api/activity", Some(&lider), None).await;
    let ids = user_ids(&logs);
    assert!(ids.contains(&caio_id));
    assert!(ids.iter().all(|id| *id == caio_id || *id == lider_id));

    let (_, logs) = send(&app, "GET", "/api/activity", Some(&admin), None).await;
    assert!(user_ids(&logs).contains(&vera_id));

    let (_, me) = send(&app, "GET", "/api/auth/me", Some(&admin), None).await;
    let admin_id = me["user"]["id"].as_i64().unwrap();
    for _ in 0..250 {
        db.log_activity(&NewActivity::new(admin_id, "export_report"))
            .await
            .unwrap();
    }

    let (_, logs) = send(&app, "GET", "/api/activity", Some(&admin), None).await;
    assert_eq!(logs.as_array().unwrap().len(), 50);
    let (_, logs) = send(&app, "GET", "/api/activity?limit=1000", Some(&admin), None).await;
    assert_eq!(logs.as_array().unwrap().len(), 200);
    let (_, logs) = send(&app, "GET", "/api/activity?limit=0", Some(&admin), None).await;
    assert_eq!(logs.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_change_password_flow() {
    let app = setup(Settings::default()).await;
    let admin = login(&app, "admin_master", ADMIN_PASSWORD).await;
    let ti = sector_id(&app, &admin, "TI").await;
    create_user(&app, &admin, "caio", "colaborador", ti).await;

    let caio = login(&app, "caio", "senha123").await;
    let (_, me) = send(&app, "GET", "/api/auth/me", Some(&caio), None).await;
    assert_eq!(me["user"]["first_login"], true);

    // First login does not ask for the current password.
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/change-password",
        Some(&caio),
        Some(json!({ "new_password": "nova-senha" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, me) = send(&app, "GET", "/api/auth/me", Some(&caio), None).await;
    assert_eq!(me["user"]["first_login"], false);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/change-password",
        Some(&caio),
        Some(json!({ "new_password": "outra" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/change-password",
        Some(&caio),
        Some(json!({ "current_password": "senha123", "new_password": "outra" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/change-password",
        Some(&caio),
        Some(json!({ "current_password": "nova-senha", "new_password": "outra" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    login(&app, "caio", "outra").await;
}

#[tokio::test]
async fn test_goals_are_sector_scoped() {
    let app = setup(Settings::default()).await;
    let admin = login(&app, "admin_master", ADMIN_PASSWORD).await;
    let ti = sector_id(&app, &admin, "TI").await;
    let comercial = sector_id(&app, &admin, "Comercial").await;
    create_user(&app, &admin, "lidia", "lider", ti).await;
    create_user(&app, &admin, "caio", "colaborador", ti).await;
    let lider = login(&app, "lidia", "senha123").await;
    let caio = login(&app, "caio", "senha123").await;

    let (status, own) = send(
        &app,
        "POST",
        "/api/goals",
        Some(&lider),
        Some(json!({ "sector_id": ti, "title": "Zerar chamados", "target_value": 100.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", own);

    let (status, _) = send(
        &app,
        "POST",
        "/api/goals",
        Some(&lider),
        Some(json!({ "sector_id": comercial, "title": "Vender mais" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "POST",
        "/api/goals",
        Some(&caio),
        Some(json!({ "sector_id": ti, "title": "Meta própria" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, other) = send(
        &app,
        "POST",
        "/api/goals",
        Some(&admin),
        Some(json!({ "sector_id": comercial, "title": "Fechar 20 contratos" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let other_id = other["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/goals/{}", other_id),
        Some(&lider),
        Some(json!({ "current_value": 5.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "DELETE", &format!("/api/goals/{}", other_id), Some(&lider), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, goals) = send(&app, "GET", "/api/goals", Some(&lider), None).await;
    assert_eq!(status, StatusCode::OK);
    let goals = goals.as_array().unwrap();
    assert_eq!(goals.len(), 1);
    assert_eq!(goals[0]["sector_id"], ti);
}

#[tokio::test]
async fn test_report_range_validation() {
    let app = setup(Settings::default()).await;
    let admin = login(&app, "admin_master", ADMIN_PASSWORD).await;

    let (status, body) = send(
        &app,
        "GET",
        "/api/reports/completion?from=2026-10-10&to=2026-10-01",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &app,
        "GET",
        "/api/reports/completion?from=2025-01-01&to=2026-10-01",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Seven days back from the earliest representable date.
    let (status, _) = send(
        &app,
        "GET",
        "/api/reports/completion?to=-262143-01-02",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, report) = send(
        &app,
        "GET",
        "/api/reports/completion?from=2026-01-01&to=2026-12-31",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["from"], "2026-01-01");
}

#[tokio::test]
async fn test_notifications_read_all() {
    let (app, db) = setup_with_db(Settings::default()).await;
    let admin = login(&app, "admin_master", ADMIN_PASSWORD).await;
    let ti = sector_id(&app, &admin, "TI").await;
    let caio_id = create_user(&app, &admin, "caio", "colaborador", ti).await;
    for message in ["Rotina atribuída", "Meta atualizada", "Nova reunião"] {
        db.create_notification(caio_id, "info", message, None)
            .await
            .unwrap();
    }

    let caio = login(&app, "caio", "senha123").await;
    let (_, list) = send(&app, "GET", "/api/notifications", Some(&caio), None).await;
    assert_eq!(list["unread_count"], 3);

    let (status, body) = send(&app, "POST", "/api/notifications/read-all", Some(&caio), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 3);

    let (_, list) = send(&app, "GET", "/api/notifications?unread_only=true", Some(&caio), None).await;
    assert_eq!(list["unread_count"], 0);
    assert!(list["notifications"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_room_bookings() {
    let app = setup(Settings::default()).await;
    let admin = login(&app, "admin_master", ADMIN_PASSWORD).await;
    let ti = sector_id(&app, &admin, "TI").await;
    create_user(&app, &admin, "caio", "colaborador", ti).await;
    create_user(&app, &admin, "vera", "colaborador", ti).await;
    let caio = login(&app, "caio", "senha123").await;
    let vera = login(&app, "vera", "senha123").await;

    let booking = |start: &str, end: &str, participants: i64| {
        json!({
            "room": "sala1",
            "title": "Planejamento",
            "date": "2026-10-20",
            "start_time": start,
            "end_time": end,
            "participants": participants,
        })
    };

    let (status, created) = send(
        &app,
        "POST",
        "/api/room-bookings",
        Some(&caio),
        Some(booking("09:00:00", "10:00:00", 4)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", created);
    let id = created["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "POST",
        "/api/room-bookings",
        Some(&vera),
        Some(booking("09:30:00", "10:30:00", 2)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        "POST",
        "/api/room-bookings",
        Some(&vera),
        Some(booking("11:00:00", "10:30:00", 2)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/room-bookings",
        Some(&vera),
        Some(booking("10:00:00", "11:00:00", 0)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, list) = send(
        &app,
        "GET",
        "/api/room-bookings?room=sala1&date=2026-10-20",
        Some(&vera),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    // Only the owner or an admin may change a booking.
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/room-bookings/{}", id),
        Some(&vera),
        Some(json!({ "participants": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/room-bookings/{}", id),
        Some(&caio),
        Some(json!({ "participants": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["participants"], 10);

    let (status, _) = send(&app, "DELETE", &format!("/api/room-bookings/{}", id), Some(&vera), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "DELETE", &format!("/api/room-bookings/{}", id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", &format!("/api/room-bookings/{}", id), Some(&caio), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_environments_and_resources() {
    let app = setup(Settings::default()).await;
    let admin = login(&app, "admin_master", ADMIN_PASSWORD).await;
    let ti = sector_id(&app, &admin, "TI").await;
    create_user(&app, &admin, "caio", "colaborador", ti).await;
    let caio = login(&app, "caio", "senha123").await;

    let environment = json!({ "code": "galpao-a", "name": "Galpão A", "area_m2": 800.0 });
    let (status, _) = send(&app, "POST", "/api/environments", Some(&caio), Some(environment.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, env) = send(&app, "POST", "/api/environments", Some(&admin), Some(environment.clone())).await;
    assert_eq!(status, StatusCode::OK, "{}", env);
    assert_eq!(env["floor"], 1);
    let env_id = env["id"].as_i64().unwrap();

    let (status, _) = send(&app, "POST", "/api/environments", Some(&admin), Some(environment)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let resources_uri = format!("/api/environments/{}/resources", env_id);
    let (status, model) = send(
        &app,
        "POST",
        &resources_uri,
        Some(&admin),
        Some(json!({
            "resource_type": "model_3d",
            "file_name": "galpao.glb",
            "file_url": "https://files.example.com/galpao.glb",
            "is_primary": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", model);
    let (status, _) = send(
        &app,
        "POST",
        &resources_uri,
        Some(&admin),
        Some(json!({
            "resource_type": "photo",
            "file_name": "doca.jpg",
            "file_url": "https://files.example.com/doca.jpg"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, models) = send(
        &app,
        "GET",
        &format!("{}?type=model_3d", resources_uri),
        Some(&caio),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(models.as_array().unwrap().len(), 1);
    assert!(models[0]["uploaded_by"].as_i64().is_some());

    let (status, _) = send(&app, "GET", &format!("{}?type=video", resources_uri), Some(&caio), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, list) = send(&app, "GET", "/api/environments", Some(&caio), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["resource_count"], 2);
    assert_eq!(list[0]["models_3d"], 1);

    let (status, detail) = send(&app, "GET", &format!("/api/environments/{}", env_id), Some(&caio), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["environment"]["code"], "galpao-a");
    assert_eq!(detail["resources"].as_array().unwrap().len(), 2);

    let resource_id = model["id"].as_i64().unwrap();
    let (status, _) = send(&app, "DELETE", &format!("/api/resources/{}", resource_id), Some(&caio), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "DELETE", &format!("/api/resources/{}", resource_id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "DELETE", &format!("/api/environments/{}", env_id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", &resources_uri, Some(&caio), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dashboard_templates() {
    let app = setup(Settings::default()).await;
    let admin = login(&app, "admin_master", ADMIN_PASSWORD).await;
    let ti = sector_id(&app, &admin, "TI").await;
    create_user(&app, &admin, "caio", "colaborador", ti).await;
    create_user(&app, &admin, "vera", "colaborador", ti).await;
    let caio = login(&app, "caio", "senha123").await;
    let vera = login(&app, "vera", "senha123").await;

    let (status, template) = send(&app, "POST", "/api/agent/dashboard-template", Some(&caio), Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK, "{}", template);
    assert_eq!(template["title"], "Novo Dashboard");
    assert_eq!(template["category"], "Outros");
    let id = template["id"].as_i64().unwrap();
    let uri = format!("/api/agent/dashboard-template/{}", id);

    let (status, _) = send(&app, "GET", &uri, Some(&vera), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, listed) = send(&app, "GET", "/api/agent/dashboard-template", Some(&vera), None).await;
    assert!(listed.as_array().unwrap().is_empty());
    let (_, listed) = send(&app, "GET", "/api/agent/dashboard-template", Some(&admin), None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/agent/dashboard-template",
        Some(&caio),
        Some(json!({ "title": "Sem id" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(
        &app,
        "PUT",
        "/api/agent/dashboard-template",
        Some(&vera),
        Some(json!({ "id": id, "title": "Meu agora" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = send(
        &app,
        "PUT",
        "/api/agent/dashboard-template",
        Some(&caio),
        Some(json!({ "id": id, "title": "Vendas por região", "is_public": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Vendas por região");

    let (status, seen) = send(&app, "GET", &uri, Some(&vera), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(seen["is_public"], true);

    let (status, _) = send(&app, "DELETE", &uri, Some(&vera), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "DELETE", &uri, Some(&caio), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", &uri, Some(&caio), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_blank_email_clears_under_domain_rule() {
    let settings = Settings {
        allowed_email_domain: Some("portoex.com.br".to_string()),
        ..Default::default()
    };
    let app = setup(settings).await;
    let admin = login(&app, "admin_master", ADMIN_PASSWORD).await;
    let ti = sector_id(&app, &admin, "TI").await;
    let caio_id = create_user(&app, &admin, "caio", "colaborador", ti).await;
    let uri = format!("/api/users/{}", caio_id);

    let (status, _) = send(&app, "PUT", &uri, Some(&admin), Some(json!({ "email": "caio@gmail.com" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, user) = send(&app, "PUT", &uri, Some(&admin), Some(json!({ "email": "caio@portoex.com.br" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["email"], "caio@portoex.com.br");

    let (status, user) = send(&app, "PUT", &uri, Some(&admin), Some(json!({ "email": "" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(user["email"].is_null());
}
