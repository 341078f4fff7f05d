//! HTTP API for medlog.
//!
//! Exposes dose ingestion and the log, range, stats and alert queries over
//! JSON. The log store is shared between handlers behind a single mutex, so
//! every request sees a fully settled store and stats view.

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::event::DoseEvent;
use crate::ingest::{DoseReport, Ingestor};
use crate::query::DateRange;
use crate::seed;
use crate::store::{LogStore, StatsView};

/// Log store shared between request handlers.
pub type SharedStore = Arc<Mutex<LogStore>>;

/// State injected into every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    store: SharedStore,
    ingestor: Arc<Ingestor>,
    alert_limit: usize,
}

impl AppState {
    /// Create handler state around an existing store.
    #[must_use]
    pub fn new(store: LogStore, ingestor: Ingestor, alert_limit: usize) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            ingestor: Arc::new(ingestor),
            alert_limit,
        }
    }

    /// Create handler state from configuration, seeding demo data if enabled.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let mut store = LogStore::new(config.store.capacity);
        if config.store.seed_demo_data {
            seed::seed_store(&mut store);
        }
        Self::new(
            store,
            Ingestor::new(config.ingest.default_device_id.clone()),
            config.store.alert_limit,
        )
    }

    /// The shared log store.
    #[must_use]
    pub fn store(&self) -> &SharedStore {
        &self.store
    }
}

/// Confirmation returned after a dose report is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedResponse {
    /// Human-readable confirmation.
    pub message: String,
}

/// Error body returned for failed requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error description.
    pub error: String,
}

/// Query parameters for the range endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RangeParams {
    /// Inclusive lower bound on `createdAt`.
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    /// Inclusive upper bound on `createdAt`.
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
}

/// An [`Error`] on its way out of a handler.
///
/// Client errors are echoed back with 400; anything else is logged and
/// replaced by a generic message with 500.
#[derive(Debug)]
pub struct ApiError {
    error: Error,
    public_message: &'static str,
}

impl ApiError {
    /// Wrap `error`, using `public_message` if it is not the caller's fault.
    #[must_use]
    pub fn new(error: Error, public_message: &'static str) -> Self {
        Self {
            error,
            public_message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = if self.error.is_client_error() {
            (StatusCode::BAD_REQUEST, self.error.to_string())
        } else {
            error!(error = %self.error, "{}", self.public_message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                self.public_message.to_string(),
            )
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Build the API router.
///
/// When `static_dir` is given, paths that don't match an API route are
/// served from it (`/` maps to `index.html`).
pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/api/medicine-log", post(save_log))
        .route("/api/medicine-logs", get(list_logs))
        .route("/api/medicine-logs/range", get(logs_in_range))
        .route("/api/compliance-stats", get(compliance_stats))
        .route("/api/recent-alerts", get(recent_alerts))
        .with_state(state);

    let app = match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Run the HTTP service until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve(config: &Config) -> Result<()> {
    let addr = config.socket_addr()?;
    let state = AppState::from_config(config);
    let app = router(state, config.server.static_dir.as_deref());

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| Error::Bind { addr, source })?;

    info!("Server running on {}", addr);
    if let Some(dir) = &config.server.static_dir {
        info!("Dashboard served from {}", dir.display());
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn save_log(
    State(state): State<AppState>,
    payload: std::result::Result<Json<DoseReport>, JsonRejection>,
) -> std::result::Result<Json<SavedResponse>, ApiError> {
    const FAILED: &str = "Failed to save medicine log";

    let Json(report) = payload.map_err(|rejection| {
        ApiError::new(Error::validation("body", rejection.body_text()), FAILED)
    })?;
    let event = state
        .ingestor
        .ingest(report)
        .map_err(|e| ApiError::new(e, FAILED))?;

    info!(
        status = %event.status,
        medicine = %event.medicine,
        time = %event.time,
        device_id = %event.device_id,
        "Medicine log saved"
    );
    state.store.lock().await.insert(event);

    Ok(Json(SavedResponse {
        message: "Medicine log saved successfully".to_string(),
    }))
}

async fn list_logs(State(state): State<AppState>) -> Json<Vec<DoseEvent>> {
    Json(state.store.lock().await.all())
}

async fn logs_in_range(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> Json<Vec<DoseEvent>> {
    let range = DateRange::from_params(params.start_date.as_deref(), params.end_date.as_deref());
    Json(state.store.lock().await.in_range(&range))
}

async fn compliance_stats(State(state): State<AppState>) -> Json<StatsView> {
    Json(state.store.lock().await.stats())
}

async fn recent_alerts(State(state): State<AppState>) -> Json<Vec<DoseEvent>> {
    Json(state.store.lock().await.recent_missed(state.alert_limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::DoseStatus;
    use crate::logging::init_test_logging;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_state() -> AppState {
        AppState::new(LogStore::default(), Ingestor::default(), 10)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_log(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/medicine-log")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_post_then_list() {
        init_test_logging();
        let state = test_state();
        let app = router(state.clone(), None);

        let (status, body) = send(
            app.clone(),
            post_log(r#"{"status":"COMPLIANCE","medicine":"MedA","time":"09:00:00"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Medicine log saved successfully"}));

        let (status, body) = send(app, get_request("/api/medicine-logs")).await;
        assert_eq!(status, StatusCode::OK);
        let logs = body.as_array().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0]["status"], "COMPLIANCE");
        assert_eq!(logs[0]["medicine"], "MedA");
        assert_eq!(logs[0]["time"], "09:00:00");
        assert_eq!(logs[0]["device_id"], "ESP32_MED_REMINDER_001");
        assert!(logs[0]["createdAt"].is_string());

        assert_eq!(state.store().lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_post_rejects_unknown_status() {
        let state = test_state();
        let app = router(state.clone(), None);

        let (status, body) =
            send(app, post_log(r#"{"status":"SKIPPED","medicine":"MedA"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("SKIPPED"));
        assert!(state.store().lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_post_accepts_wrong_typed_optional_fields() {
        let state = test_state();
        let app = router(state.clone(), None);

        let (status, body) = send(
            app,
            post_log(
                r#"{"status":"MISSED","medicine":"MedA","timestamp":"1704067200","device_id":42,"time":null}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Medicine log saved successfully"}));

        let store = state.store().lock().await;
        let stored = store.all();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, DoseStatus::Missed);
        assert_eq!(stored[0].timestamp, 1_704_067_200);
        assert_eq!(stored[0].device_id, "ESP32_MED_REMINDER_001");
        assert_eq!(stored[0].time.len(), 8);
    }

    #[tokio::test]
    async fn test_post_rejects_malformed_json() {
        let app = router(test_state(), None);

        let (status, body) = send(app, post_log("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("invalid body"));
    }

    #[tokio::test]
    async fn test_compliance_stats() {
        let app = router(test_state(), None);
        for status in ["COMPLIANCE", "LATE", "MISSED"] {
            let body = format!(r#"{{"status":"{status}","medicine":"MedA"}}"#);
            let (code, _) = send(app.clone(), post_log(&body)).await;
            assert_eq!(code, StatusCode::OK);
        }

        let (status, body) = send(app, get_request("/api/compliance-stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "totalLogs": 3,
                "complianceRate": 33,
                "missedCount": 1,
                "lateCount": 1,
                "complianceCount": 1
            })
        );
    }

    #[tokio::test]
    async fn test_empty_stats() {
        let app = router(test_state(), None);
        let (_, body) = send(app, get_request("/api/compliance-stats")).await;
        assert_eq!(body["totalLogs"], 0);
        assert_eq!(body["complianceRate"], 0);
    }

    #[tokio::test]
    async fn test_range_query() {
        let mut store = LogStore::default();
        seed::seed_store(&mut store);
        let app = router(AppState::new(store, Ingestor::default(), 10), None);

        let (status, body) = send(
            app.clone(),
            get_request("/api/medicine-logs/range?startDate=2024-01-01T09:00:00Z&endDate=2024-01-01T14:30:00Z"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["medicine"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["MedB", "MedA"]);

        let (_, body) = send(app.clone(), get_request("/api/medicine-logs/range")).await;
        assert_eq!(body.as_array().unwrap().len(), 3);

        let (_, body) = send(
            app.clone(),
            get_request("/api/medicine-logs/range?startDate=2024-01-02&endDate=2024-01-01"),
        )
        .await;
        assert!(body.as_array().unwrap().is_empty());

        let (status, body) = send(
            app,
            get_request("/api/medicine-logs/range?startDate=garbage&endDate=2024-01-02"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recent_alerts() {
        let mut store = LogStore::default();
        let ingestor = Ingestor::default();
        let base = chrono::Utc::now();
        for (i, status) in ["MISSED", "COMPLIANCE", "LATE", "MISSED", "COMPLIANCE"]
            .into_iter()
            .enumerate()
        {
            let report = DoseReport::new(status, format!("Med{i}"));
            let at = base + chrono::Duration::seconds(i64::try_from(i).unwrap());
            store.insert(ingestor.ingest_at(report, at).unwrap());
        }
        let app = router(AppState::new(store, ingestor, 10), None);

        let (status, body) = send(app, get_request("/api/recent-alerts")).await;
        assert_eq!(status, StatusCode::OK);
        let alerts = body.as_array().unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0]["medicine"], "Med3");
        assert_eq!(alerts[1]["medicine"], "Med0");
        assert!(alerts.iter().all(|a| a["status"] == "MISSED"));
    }

    #[tokio::test]
    async fn test_recent_alerts_honors_limit() {
        let mut store = LogStore::default();
        let ingestor = Ingestor::default();
        for i in 0..5 {
            store.insert(
                ingestor
                    .ingest(DoseReport::new(DoseStatus::Missed.as_str(), format!("Med{i}")))
                    .unwrap(),
            );
        }
        let app = router(AppState::new(store, ingestor, 3), None);

        let (_, body) = send(app, get_request("/api/recent-alerts")).await;
        assert_eq!(body.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_from_config_seeds_demo_data() {
        let mut config = Config::default();
        config.store.seed_demo_data = true;
        config.store.capacity = 2;

        let state = AppState::from_config(&config);
        let store = state.store().lock().await;
        assert_eq!(store.capacity(), 2);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_route_without_static_dir() {
        let app = router(test_state(), None);
        let response = app.oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_static_dir_serves_dashboard() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>Dashboard</h1>").unwrap();
        let app = router(test_state(), Some(dir.path()));

        let response = app.clone().oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"<h1>Dashboard</h1>");

        // API routes still take precedence over the fallback.
        let (status, _) = send(app, get_request("/api/compliance-stats")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn test_api_error_status_codes() {
        let response =
            ApiError::new(Error::validation("status", "bad"), "Failed").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::new(Error::storage("down"), "Failed").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
