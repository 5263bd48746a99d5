//! REST API endpoints for the aquasync-service.
//!
//! # Concurrency
//!
//! Handlers never hold `state.store` across an await on the network. Actuator
//! commands are serialized per actuator by [`CommandGuard`]; an overlapping
//! command for the same actuator gets `409 Conflict`.
//!
//! ## Error Handling
//!
//! Actuator endpoints answer `{success, message?}` in every case, with `502`
//! for a gateway failure, `504` for a gateway timeout, `409` for an
//! overlapping command, and axum's rejection status for a malformed body. Every other endpoint reports errors as
//! `{"error": message}` via [`AppError`].
//!
//! [`CommandGuard`]: crate::command::CommandGuard

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;

use aquasync_store::ReadingQuery;
use aquasync_types::{
    Actuator, CommandRequest, CommandResponse, DeviceStatusResponse, DiagnosticKind,
    DiagnosticReport, EmulatorConfig, EmulatorStatus, HealthResponse, ReadingRecord,
};

use crate::command::{self, CommandError};
use crate::middleware::no_store;
use crate::state::AppState;

/// Default number of readings returned by `/api/readings/latest`.
pub const DEFAULT_LATEST_LIMIT: u32 = 20;
/// Upper bound on any readings page.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        // Actuators
        .route("/api/pump", post(set_pump))
        .route("/api/heater", post(set_heater))
        .route("/api/device/status", get(device_status))
        // Emulator mode
        .route("/api/emulator/start", post(emulator_start))
        .route("/api/emulator/stop", post(emulator_stop))
        .route("/api/emulator/status", get(emulator_status))
        // Diagnostics
        .route("/api/diagnostics", get(get_diagnostics))
        .route("/api/diagnostics/run", post(run_diagnostics))
        .route("/api/diagnostics/run/{kind}", post(run_check))
        // Readings
        .route("/api/readings", get(get_readings))
        .route("/api/readings/latest", get(latest_readings))
        .layer(axum::middleware::from_fn(no_store))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok(env!("CARGO_PKG_VERSION")))
}

async fn set_pump(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CommandRequest>, JsonRejection>,
) -> Result<Json<CommandResponse>, CommandError> {
    let Json(request) = payload?;
    set_actuator(&state, Actuator::Pump, request.status).await
}

async fn set_heater(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CommandRequest>, JsonRejection>,
) -> Result<Json<CommandResponse>, CommandError> {
    let Json(request) = payload?;
    set_actuator(&state, Actuator::Heater, request.status).await
}

async fn set_actuator(
    state: &AppState,
    actuator: Actuator,
    status: bool,
) -> Result<Json<CommandResponse>, CommandError> {
    state.send_command(actuator, status).await?;
    Ok(Json(CommandResponse::ok(Some(command::confirmation(
        actuator, status,
    )))))
}

/// Reconciled device state; runs one reconciliation pass.
async fn device_status(State(state): State<Arc<AppState>>) -> Json<DeviceStatusResponse> {
    Json(state.reconcile().await)
}

/// Enable the emulator. The body is optional; an empty body uses defaults.
async fn emulator_start(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<CommandResponse>, AppError> {
    let config = if body.iter().all(u8::is_ascii_whitespace) {
        EmulatorConfig::default()
    } else {
        serde_json::from_slice::<EmulatorConfig>(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid emulator config: {e}")))?
    };

    if config.update_interval == 0 {
        return Err(AppError::BadRequest(
            "updateInterval must be greater than 0".to_string(),
        ));
    }

    info!(
        "Emulator enabled (pattern: {:?}, interval: {}ms)",
        config.mode, config.update_interval
    );
    let message = if state.start_emulator(config).await {
        "Emulator restarted with new configuration"
    } else {
        "Emulator started"
    };
    Ok(Json(CommandResponse::ok(Some(message.to_string()))))
}

async fn emulator_stop(State(state): State<Arc<AppState>>) -> Json<CommandResponse> {
    let message = if state.stop_emulator().await {
        info!("Emulator disabled");
        "Emulator stopped"
    } else {
        "Emulator was not running"
    };
    Json(CommandResponse::ok(Some(message.to_string())))
}

async fn emulator_status(State(state): State<Arc<AppState>>) -> Json<EmulatorStatus> {
    Json(state.emulator.read().await.clone())
}

/// Latest diagnostic report; runs every check if none exists yet.
async fn get_diagnostics(State(state): State<Arc<AppState>>) -> Json<DiagnosticReport> {
    let report = match state.diagnostics.latest_report().await {
        Some(report) => report,
        None => state.run_diagnostics().await,
    };
    Json(report)
}

async fn run_diagnostics(State(state): State<Arc<AppState>>) -> Json<DiagnosticReport> {
    Json(state.run_diagnostics().await)
}

async fn run_check(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> Result<Json<DiagnosticReport>, AppError> {
    let kind: DiagnosticKind = kind
        .parse()
        .map_err(|e: aquasync_types::ParseError| AppError::BadRequest(e.to_string()))?;
    Ok(Json(state.run_check(kind).await))
}

/// Query parameters for `/api/readings/latest`.
#[derive(Debug, Deserialize, Default)]
pub struct LatestQuery {
    pub limit: Option<u32>,
}

fn check_limit(limit: u32) -> Result<u32, AppError> {
    if limit == 0 || limit > MAX_PAGE_SIZE {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}, got {limit}"
        )));
    }
    Ok(limit)
}

/// Newest readings, newest first.
async fn latest_readings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LatestQuery>,
) -> Result<Json<Vec<ReadingRecord>>, AppError> {
    let limit = check_limit(params.limit.unwrap_or(DEFAULT_LATEST_LIMIT))?;
    let store = state.store.lock().await;
    Ok(Json(store.latest_readings(limit)?))
}

/// Query parameters for `/api/readings`.
#[derive(Debug, Deserialize, Default)]
pub struct ReadingsQuery {
    /// Unix timestamp, inclusive.
    pub since: Option<i64>,
    /// Unix timestamp, inclusive.
    pub until: Option<i64>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ReadingsQuery {
    /// Validate the query parameters.
    pub fn validate(&self) -> Result<(), AppError> {
        if let (Some(since), Some(until)) = (self.since, self.until)
            && since > until
        {
            return Err(AppError::BadRequest(format!(
                "Invalid time range: 'since' ({}) must be less than or equal to 'until' ({})",
                since, until
            )));
        }
        if let Some(limit) = self.limit {
            check_limit(limit)?;
        }
        Ok(())
    }

    fn to_store_query(&self) -> Result<ReadingQuery, AppError> {
        let parse = |name: &str, secs: i64| {
            OffsetDateTime::from_unix_timestamp(secs)
                .map_err(|_| AppError::BadRequest(format!("Invalid '{name}' timestamp: {secs}")))
        };

        let mut query = ReadingQuery::new();
        if let Some(since) = self.since {
            query = query.since(parse("since", since)?);
        }
        if let Some(until) = self.until {
            query = query.until(parse("until", until)?);
        }
        // one extra row tells whether another page exists
        query = query.limit(self.limit.unwrap_or(MAX_PAGE_SIZE) + 1);
        if let Some(offset) = self.offset {
            query = query.offset(offset);
        }
        Ok(query)
    }
}

/// Paginated response wrapper with metadata.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub count: usize,
    pub offset: u32,
    pub limit: u32,
    pub has_more: bool,
}

/// Filtered, paginated reading history, newest first.
async fn get_readings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReadingsQuery>,
) -> Result<Json<PaginatedResponse<ReadingRecord>>, AppError> {
    params.validate()?;
    let query = params.to_store_query()?;
    let limit = params.limit.unwrap_or(MAX_PAGE_SIZE);

    let mut readings = {
        let store = state.store.lock().await;
        store.query_readings(&query)?
    };

    let has_more = readings.len() > limit as usize;
    readings.truncate(limit as usize);

    Ok(Json(PaginatedResponse {
        pagination: PaginationMeta {
            count: readings.len(),
            offset: params.offset.unwrap_or(0),
            limit,
            has_more,
        },
        data: readings,
    }))
}

/// Errors from non-command endpoints.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Store(aquasync_store::Error),
}

impl From<aquasync_store::Error> for AppError {
    fn from(e: aquasync_store::Error) -> Self {
        AppError::Store(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use std::time::Duration;
    use time::macros::datetime;
    use tower::ServiceExt;

    use aquasync_core::{MockFeed, MockGateway};
    use aquasync_store::Store;

    use crate::config::Config;
    use crate::middleware::NO_STORE;

    fn create_test_state() -> (Arc<AppState>, Arc<MockGateway>) {
        let gateway = Arc::new(MockGateway::new());
        let state = AppState::new(
            Store::open_in_memory().unwrap(),
            Config::default(),
            gateway.clone(),
            Arc::new(MockFeed::new()),
        );
        (state, gateway)
    }

    async fn seed(state: &AppState, readings: &[ReadingRecord]) {
        let store = state.store.lock().await;
        for reading in readings {
            store.insert_reading(reading).unwrap();
        }
    }

    async fn response_body(response: axum::response::Response) -> String {
        let body = response.into_body();
        let bytes = body.collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn response_json(response: axum::response::Response) -> serde_json::Value {
        serde_json::from_str(&response_body(response).await).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post_empty(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (state, _) = create_test_state();
        let app = router().with_state(state);

        let response = app.oneshot(get_request("/api/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], NO_STORE);

        let json = response_json(response).await;
        assert_eq!(json["status"], "ok");
        assert!(json["version"].is_string());
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_pump_on_success() {
        let (state, gateway) = create_test_state();
        let app = router().with_state(Arc::clone(&state));

        let response = app
            .oneshot(post_json("/api/pump", r#"{"status": true}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Pump turned on");

        assert_eq!(gateway.calls(), vec![(Actuator::Pump, true)]);
        assert!(state.cache.read().await.pump_status);
    }

    #[tokio::test]
    async fn test_heater_http_500_is_bad_gateway() {
        let (state, gateway) = create_test_state();
        gateway.set_should_fail(true, 500, "Internal Server Error");
        let app = router().with_state(Arc::clone(&state));

        let response = app
            .oneshot(post_json("/api/heater", r#"{"status": false}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(response.headers()[header::CACHE_CONTROL], NO_STORE);
        let json = response_json(response).await;
        assert_eq!(json["success"], false);
        assert!(
            json["message"]
                .as_str()
                .unwrap()
                .contains("Internal Server Error")
        );
        assert!(state.cache.is_unconfirmed().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gateway_timeout_is_504() {
        let (state, gateway) = create_test_state();
        gateway.set_latency(Duration::from_secs(60));
        let app = router().with_state(state);

        let response = app
            .oneshot(post_json("/api/pump", r#"{"status": true}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let json = response_json(response).await;
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_overlapping_command_is_409() {
        let (state, gateway) = create_test_state();
        let _held = state.commands.try_acquire(Actuator::Heater).unwrap();
        let app = router().with_state(Arc::clone(&state));

        let response = app
            .clone()
            .oneshot(post_json("/api/heater", r#"{"status": true}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = response_json(response).await;
        assert_eq!(json["success"], false);

        // the pump is not blocked by the heater
        let response = app
            .oneshot(post_json("/api/pump", r#"{"status": true}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(gateway.calls(), vec![(Actuator::Pump, true)]);
    }

    #[tokio::test]
    async fn test_non_boolean_status_rejected() {
        let (state, gateway) = create_test_state();
        let app = router().with_state(state);

        let response = app
            .oneshot(post_json("/api/pump", r#"{"status": "on"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = response_json(response).await;
        assert_eq!(json["success"], false);
        assert!(json["message"].as_str().is_some_and(|m| m.contains("status")));
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_command_body_answers_command_response() {
        let (state, gateway) = create_test_state();
        let app = router().with_state(state);

        let response = app
            .oneshot(post_json("/api/heater", "{not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["success"], false);
        assert!(json["message"].is_string());
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_device_status_prefers_fresh_database() {
        let (state, _) = create_test_state();
        seed(
            &state,
            &[ReadingRecord::new(datetime!(2024-05-01 12:00 UTC), true, false)],
        )
        .await;
        let app = router().with_state(state);

        let response = app
            .oneshot(get_request("/api/device/status"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["pumpStatus"], true);
        assert_eq!(json["heaterStatus"], false);
        assert_eq!(json["source"], "database");
        assert_eq!(json["memoryState"]["source"], "memory");
        assert_eq!(json["databaseState"]["pumpStatus"], true);
    }

    #[tokio::test]
    async fn test_device_status_keeps_newer_ack() {
        let (state, _) = create_test_state();
        seed(
            &state,
            &[ReadingRecord::new(datetime!(2024-05-01 12:00 UTC), false, false)],
        )
        .await;
        let app = router().with_state(Arc::clone(&state));

        let response = app
            .clone()
            .oneshot(post_json("/api/heater", r#"{"status": true}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(get_request("/api/device/status"))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["heaterStatus"], true);
        assert_eq!(json["source"], "memory");
        assert_eq!(json["databaseState"]["heaterStatus"], false);
    }

    #[tokio::test]
    async fn test_emulator_lifecycle() {
        let (state, _) = create_test_state();
        let app = router().with_state(state);

        let response = app
            .clone()
            .oneshot(get_request("/api/emulator/status"))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["enabled"], false);
        assert!(json.get("config").is_none());

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/emulator/start",
                r#"{"updateInterval": 2000, "mode": "scenario", "scenarioName": "heatwave"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await["success"], true);

        let response = app
            .clone()
            .oneshot(get_request("/api/emulator/status"))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["enabled"], true);
        assert_eq!(json["config"]["updateInterval"], 2000);
        assert_eq!(json["config"]["mode"], "scenario");
        assert_eq!(json["config"]["scenarioName"], "heatwave");

        let response = app
            .clone()
            .oneshot(post_empty("/api/emulator/stop"))
            .await
            .unwrap();
        assert_eq!(response_json(response).await["message"], "Emulator stopped");

        let response = app
            .oneshot(get_request("/api/emulator/status"))
            .await
            .unwrap();
        assert_eq!(response_json(response).await["enabled"], false);
    }

    #[tokio::test]
    async fn test_emulator_start_without_body_uses_defaults() {
        let (state, _) = create_test_state();
        let app = router().with_state(Arc::clone(&state));

        let response = app
            .oneshot(post_empty("/api/emulator/start"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let status = state.emulator.read().await.clone();
        assert_eq!(status.config, Some(EmulatorConfig::default()));
    }

    #[tokio::test]
    async fn test_emulator_start_invalid_body() {
        let (state, _) = create_test_state();
        let app = router().with_state(state);

        let response = app
            .clone()
            .oneshot(post_json("/api/emulator/start", r#"{"mode": "chaotic"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response_json(response).await["error"].is_string());

        let response = app
            .oneshot(post_json("/api/emulator/start", r#"{"updateInterval": 0}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_diagnostics_runs_once_when_empty() {
        let (state, _) = create_test_state();
        let app = router().with_state(Arc::clone(&state));

        let response = app
            .clone()
            .oneshot(get_request("/api/diagnostics"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["dbStatus"]["success"], false);
        assert_eq!(json["history"].as_array().unwrap().len(), 3);

        // a second GET returns the stored report without running again
        let response = app
            .oneshot(get_request("/api/diagnostics"))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["history"].as_array().unwrap().len(), 3);
        assert_eq!(state.diagnostics.history().await.len(), 3);
    }

    #[tokio::test]
    async fn test_run_diagnostics_detects_disagreement() {
        let (state, _) = create_test_state();
        seed(
            &state,
            &[ReadingRecord::new(datetime!(2024-05-01 12:00 UTC), true, false)],
        )
        .await;
        let app = router().with_state(Arc::clone(&state));

        let response = app
            .oneshot(post_empty("/api/diagnostics/run"))
            .await
            .unwrap();
        let json = response_json(response).await;

        assert_eq!(json["dbStatus"]["success"], true);
        assert_eq!(json["deviceConsistency"]["success"], false);
        assert_eq!(json["deviceConsistency"]["details"]["isPumpConsistent"], false);

        let records = json["history"].as_array().unwrap();
        let consistency = records
            .iter()
            .find(|r| r["type"] == "device_consistency")
            .unwrap();
        assert_eq!(consistency["resolved"], false);
    }

    #[tokio::test]
    async fn test_run_single_check() {
        let (state, _) = create_test_state();
        let app = router().with_state(state);

        let response = app
            .oneshot(post_empty("/api/diagnostics/run/data_integrity"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert!(json.get("dbStatus").is_none());
        assert_eq!(json["dataIntegrity"]["success"], false);
        assert_eq!(json["history"][0]["type"], "data_integrity");
    }

    #[tokio::test]
    async fn test_run_unknown_check() {
        let (state, _) = create_test_state();
        let app = router().with_state(state);

        let response = app
            .oneshot(post_empty("/api/diagnostics/run/cosmic_rays"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(
            response_json(response).await["error"]
                .as_str()
                .unwrap()
                .contains("cosmic_rays")
        );
    }

    #[tokio::test]
    async fn test_latest_readings() {
        let (state, _) = create_test_state();
        seed(
            &state,
            &[
                ReadingRecord::new(datetime!(2024-05-01 12:00 UTC), false, false),
                ReadingRecord::new(datetime!(2024-05-01 12:01 UTC), true, false),
                ReadingRecord::new(datetime!(2024-05-01 12:02 UTC), true, true),
            ],
        )
        .await;
        let app = router().with_state(state);

        let response = app
            .clone()
            .oneshot(get_request("/api/readings/latest?limit=2"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        let readings = json.as_array().unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0]["heaterStatus"], true);

        let response = app
            .oneshot(get_request("/api/readings/latest?limit=0"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_readings_pagination() {
        let (state, _) = create_test_state();
        let base = datetime!(2024-05-01 12:00 UTC);
        let readings: Vec<_> = (0..5)
            .map(|i| ReadingRecord::new(base + time::Duration::minutes(i), i % 2 == 0, false))
            .collect();
        seed(&state, &readings).await;
        let app = router().with_state(state);

        let response = app
            .clone()
            .oneshot(get_request("/api/readings?limit=2&offset=1"))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["data"].as_array().unwrap().len(), 2);
        assert_eq!(json["pagination"]["count"], 2);
        assert_eq!(json["pagination"]["offset"], 1);
        assert_eq!(json["pagination"]["hasMore"], true);

        let since = (base + time::Duration::minutes(3)).unix_timestamp();
        let response = app
            .clone()
            .oneshot(get_request(&format!("/api/readings?since={since}")))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["pagination"]["count"], 2);
        assert_eq!(json["pagination"]["hasMore"], false);

        let response = app
            .oneshot(get_request("/api/readings?since=200&until=100"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
