//! HTTP server startup and routing
//!
//! All handlers share one `AppState`: the planner database behind an `Arc`,
//! the loaded configuration and the user every request acts as.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{api, config::Config, metrics, planner_db::PlannerDatabase, shared_state::AppState};

/// Open the configured database file, applying pending migrations
pub fn open_database(cfg: &Config) -> anyhow::Result<PlannerDatabase> {
    PlannerDatabase::new(&cfg.database_path, cfg.db_pool_size)
        .with_context(|| format!("Failed to open database at {}", cfg.database_path.display()))
}

/// Run the planner API until ctrl-c
pub async fn run_server(cfg: Config) -> anyhow::Result<()> {
    crate::telemetry::init_tracing();
    crate::metrics::init_metrics();
    cfg.print_config();

    let database = Arc::new(open_database(&cfg)?);
    let state = AppState::new(database, Arc::new(cfg.clone()));

    let user = state
        .database
        .users
        .ensure(&state.user)
        .context("Failed to bootstrap the default user")?;
    info!("Serving planner for {} <{}>", user.name, user.email);

    let addr = cfg.api_addr()?;
    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let app = build_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
        ])
        .allow_headers(Any);
    let timeout = Duration::from_secs(state.config.request_timeout_seconds);
    let body_limit = state.config.max_body_bytes;

    Router::new()
        .route("/dashboard", get(api::get_dashboard))
        .route("/tasks", get(api::get_tasks).post(api::create_task))
        .route("/tasks/:id", put(api::update_task).delete(api::delete_task))
        .route("/notes", get(api::get_notes).post(api::create_note))
        .route("/notes/:id", put(api::update_note).delete(api::delete_note))
        .route("/sessions", get(api::get_sessions).post(api::create_session))
        .route("/sessions/:id", put(api::update_session).delete(api::delete_session))
        .route("/progress", get(api::get_progress).put(api::upsert_progress))
        .route("/stats", get(api::get_stats).put(api::upsert_stats))
        .route_layer(middleware::from_fn(metrics::track_requests))
        .route("/healthz", get(|| async { "OK" }))
        .route("/metrics", get(metrics::get_metrics))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TimeoutLayer::new(timeout))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    fn app() -> Router {
        build_router(AppState::for_tests())
    }

    #[tokio::test]
    async fn test_create_task_then_list_by_exam() {
        let app = app();
        let (status, task) = send(
            &app,
            "POST",
            "/tasks",
            Some(json!({"title": "Read Ch.1", "subject": "Economy", "exam": "UPSC"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(task["priority"], "MEDIUM");
        assert_eq!(task["completed"], false);
        assert!(task["id"].as_str().is_some());

        send(&app, "POST", "/tasks", Some(json!({"title": "DI set", "subject": "Quant", "exam": "CAT"}))).await;

        let (status, tasks) = send(&app, "GET", "/tasks?exam=UPSC", None).await;
        assert_eq!(status, StatusCode::OK);
        let tasks = tasks.as_array().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0]["id"], task["id"]);
    }

    #[tokio::test]
    async fn test_completed_task_sorts_last() {
        let app = app();
        let (_, high) = send(
            &app,
            "POST",
            "/tasks",
            Some(json!({"title": "High", "subject": "Polity", "exam": "UPSC", "priority": "HIGH"})),
        )
        .await;
        send(
            &app,
            "POST",
            "/tasks",
            Some(json!({"title": "Low", "subject": "Polity", "exam": "UPSC", "priority": "LOW"})),
        )
        .await;

        let uri = format!("/tasks/{}", high["id"].as_str().unwrap());
        let (status, updated) = send(&app, "PUT", &uri, Some(json!({"completed": true}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["title"], "High");

        let (_, tasks) = send(&app, "GET", "/tasks", None).await;
        let titles: Vec<&str> = tasks.as_array().unwrap().iter().map(|t| t["title"].as_str().unwrap()).collect();
        assert_eq!(titles, vec!["Low", "High"]);
    }

    #[tokio::test]
    async fn test_unknown_enum_in_body_is_bad_request() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/tasks",
            Some(json!({"title": "x", "subject": "y", "exam": "GRE"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_missing_required_field_is_bad_request() {
        let app = app();
        let (status, _) = send(&app, "POST", "/notes", Some(json!({"title": "no body"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_missing_note_is_500() {
        let app = app();
        let (status, body) = send(&app, "DELETE", "/notes/does-not-exist", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Failed to delete note"}));
    }

    #[tokio::test]
    async fn test_delete_returns_success() {
        let app = app();
        let (_, note) = send(
            &app,
            "POST",
            "/notes",
            Some(json!({"title": "t", "content": "c", "subject": "s", "exam": "CAT", "tags": ["b", "a"]})),
        )
        .await;
        assert_eq!(note["tags"], json!(["b", "a"]));
        assert_eq!(note["type"], "LEARNING");

        let id = note["id"].as_str().unwrap();
        let (status, body) = send(&app, "DELETE", &format!("/notes/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true, "id": id}));
    }

    #[tokio::test]
    async fn test_dashboard_counts() {
        let app = app();
        for i in 0..3 {
            let (_, task) = send(
                &app,
                "POST",
                "/tasks",
                Some(json!({"title": format!("t{}", i), "subject": "Polity", "exam": "UPSC"})),
            )
            .await;
            if i < 2 {
                let uri = format!("/tasks/{}", task["id"].as_str().unwrap());
                send(&app, "PUT", &uri, Some(json!({"completed": true}))).await;
            }
        }
        send(
            &app,
            "POST",
            "/notes",
            Some(json!({"title": "n", "content": "c", "subject": "Polity", "exam": "UPSC"})),
        )
        .await;

        let (status, dashboard) = send(&app, "GET", "/dashboard", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(dashboard["totalTasks"], 2);
        assert_eq!(dashboard["totalNotes"], 1);
        assert_eq!(dashboard["tasks"].as_array().unwrap().len(), 3);
        assert!(dashboard["dailyStats"].is_null());
    }

    #[tokio::test]
    async fn test_sessions_filtered_by_day() {
        let app = app();
        for (title, date) in [
            ("before", "2025-01-14T23:59:59Z"),
            ("start", "2025-01-15T00:00:00Z"),
            ("end", "2025-01-15T23:59:00Z"),
            ("after", "2025-01-16T00:00:00Z"),
        ] {
            let (status, _) = send(
                &app,
                "POST",
                "/sessions",
                Some(json!({
                    "title": title,
                    "subject": "Polity",
                    "exam": "UPSC",
                    "startTime": "09:00",
                    "endTime": "10:00",
                    "date": date
                })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, sessions) = send(&app, "GET", "/sessions?date=2025-01-15", None).await;
        assert_eq!(status, StatusCode::OK);
        let titles: Vec<&str> = sessions.as_array().unwrap().iter().map(|s| s["title"].as_str().unwrap()).collect();
        assert_eq!(titles, vec!["start", "end"]);

        let (status, _) = send(&app, "GET", "/sessions?date=someday", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_dates_at_calendar_limits_do_not_crash() {
        let app = app();

        let last_day = chrono::NaiveDate::MAX.to_string().replace('+', "%2B");
        let (status, sessions) = send(&app, "GET", &format!("/sessions?date={}", last_day), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sessions, json!([]));

        let first_day = chrono::NaiveDate::MIN.to_string();
        let (status, body) = send(&app, "GET", &format!("/stats?end={}", first_day), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_session_reminder_defaults_on() {
        let app = app();
        let (status, session) = send(
            &app,
            "POST",
            "/sessions",
            Some(json!({
                "title": "Mock",
                "subject": "Quant",
                "exam": "CAT",
                "startTime": "10:00",
                "endTime": "13:00",
                "date": "2025-01-16"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(session["reminder"], true);
        assert_eq!(session["type"], "STUDY");
    }

    #[tokio::test]
    async fn test_progress_upsert_is_idempotent_on_key() {
        let app = app();
        let body = json!({"name": "Polity", "exam": "UPSC", "progress": 40});
        let (status, first) = send(&app, "PUT", "/progress", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        let (_, second) = send(&app, "PUT", "/progress", Some(json!({"name": "Polity", "exam": "UPSC", "progress": 80}))).await;
        assert_eq!(first["id"], second["id"]);

        let (status, rows) = send(&app, "GET", "/progress", None).await;
        assert_eq!(status, StatusCode::OK);
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["progress"], 80);
    }

    #[tokio::test]
    async fn test_healthz_and_metrics() {
        let app = app();
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"OK");

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
