//! HTTP client for the aquasync-service REST API.
//!
//! This module provides a client for the aquasync-service: reading
//! reconciled device state, sending actuator commands, switching device mode,
//! and running diagnostics. Every GET carries a `t` cache-busting parameter
//! and `Cache-Control: no-cache` so polling never sees a stale response.
//!
//! # Example
//!
//! ```no_run
//! use aquasync_core::service_client::ServiceClient;
//! use aquasync_types::Actuator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ServiceClient::new("http://localhost:5000")?;
//!
//! let status = client.device_status().await?;
//! println!("Pump on: {}", status.pump_status);
//!
//! client.set_actuator(Actuator::Heater, true).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CACHE_CONTROL;
use serde::Serialize;

use aquasync_types::{
    Actuator, CommandRequest, CommandResponse, DeviceMode, DeviceStatusResponse, DiagnosticKind,
    DiagnosticReport, EmulatorConfig, EmulatorStatus, HealthResponse, ReadingRecord,
};

use crate::gateway::cache_buster;

/// HTTP client for the aquasync-service API.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    client: Client,
    base_url: String,
}

/// Error type for service client operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceClientError {
    /// The service is not reachable.
    #[error("Service not reachable at {url}: {source}")]
    NotReachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// API returned an error response.
    #[error("API error: {message}")]
    ApiError { status: u16, message: String },
}

/// Result type for service client operations.
pub type Result<T> = std::result::Result<T, ServiceClientError>;

/// The subset of the service API the client reconciler depends on.
///
/// [`ServiceClient`] implements it over HTTP; tests provide in-memory fakes.
#[async_trait]
pub trait DeviceApi: Send + Sync {
    /// Reconciled actuator state.
    async fn device_status(&self) -> Result<DeviceStatusResponse>;

    /// Command an actuator.
    async fn set_actuator(&self, actuator: Actuator, status: bool) -> Result<CommandResponse>;

    /// Current emulator flag.
    async fn emulator_status(&self) -> Result<EmulatorStatus>;

    /// Switch between hardware and emulator.
    async fn set_mode(&self, mode: DeviceMode) -> Result<CommandResponse>;

    /// Newest readings, newest first.
    async fn latest_readings(&self, limit: u32) -> Result<Vec<ReadingRecord>>;
}

fn validate_base_url(base_url: &str) -> Result<String> {
    let base_url = base_url.trim_end_matches('/').to_string();

    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ServiceClientError::InvalidUrl(format!(
            "URL must start with http:// or https://, got: {}",
            base_url
        )));
    }

    Ok(base_url)
}

impl ServiceClient {
    /// Create a new service client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the aquasync-service (e.g., "http://localhost:5000")
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = validate_base_url(base_url)?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(ServiceClientError::Request)?;

        Ok(Self { client, base_url })
    }

    /// Create a client with a custom reqwest Client.
    pub fn with_client(base_url: &str, client: Client) -> Result<Self> {
        let base_url = validate_base_url(base_url)?;
        Ok(Self { client, base_url })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the service is reachable.
    pub async fn is_reachable(&self) -> bool {
        self.health().await.is_ok()
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get("/api/health", &[]).await
    }

    /// Reconciled actuator state; the service runs one reconciliation pass.
    pub async fn device_status(&self) -> Result<DeviceStatusResponse> {
        self.get("/api/device/status", &[]).await
    }

    /// Command an actuator.
    pub async fn set_actuator(&self, actuator: Actuator, status: bool) -> Result<CommandResponse> {
        self.post_json(actuator.endpoint(), &CommandRequest { status })
            .await
    }

    pub async fn emulator_status(&self) -> Result<EmulatorStatus> {
        self.get("/api/emulator/status", &[]).await
    }

    pub async fn start_emulator(&self, config: &EmulatorConfig) -> Result<CommandResponse> {
        self.post_json("/api/emulator/start", config).await
    }

    pub async fn stop_emulator(&self) -> Result<CommandResponse> {
        self.post_empty("/api/emulator/stop").await
    }

    /// Latest diagnostic report (the service runs one if none exists yet).
    pub async fn diagnostics(&self) -> Result<DiagnosticReport> {
        self.get("/api/diagnostics", &[]).await
    }

    /// Run every diagnostic check now.
    pub async fn run_diagnostics(&self) -> Result<DiagnosticReport> {
        self.post_empty("/api/diagnostics/run").await
    }

    /// Run a single diagnostic check now.
    pub async fn run_check(&self, kind: DiagnosticKind) -> Result<DiagnosticReport> {
        self.post_empty(&format!("/api/diagnostics/run/{kind}"))
            .await
    }

    pub async fn latest_readings(&self, limit: u32) -> Result<Vec<ReadingRecord>> {
        self.get("/api/readings/latest", &[("limit", limit.to_string())])
            .await
    }

    // ======================================================================
    // Internal HTTP helpers
    // ======================================================================

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut query = params.to_vec();
        query.push(("t", cache_buster()));

        let response = self
            .client
            .get(&url)
            .header(CACHE_CONTROL, "no-cache")
            .query(&query)
            .send()
            .await
            .map_err(|e| ServiceClientError::NotReachable {
                url: url.clone(),
                source: e,
            })?;

        self.handle_response(response).await
    }

    async fn post_empty<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response =
            self.client
                .post(&url)
                .send()
                .await
                .map_err(|e| ServiceClientError::NotReachable {
                    url: url.clone(),
                    source: e,
                })?;

        self.handle_response(response).await
    }

    async fn post_json<T: serde::de::DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await.map_err(|e| {
            ServiceClientError::NotReachable {
                url: url.clone(),
                source: e,
            }
        })?;

        self.handle_response(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            response.json().await.map_err(ServiceClientError::Request)
        } else {
            // command failures use `message`, other errors use `error`
            let message = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| {
                    v.get("message")
                        .or_else(|| v.get("error"))
                        .and_then(|e| e.as_str())
                        .map(String::from)
                })
                .unwrap_or_else(|| status.to_string());

            Err(ServiceClientError::ApiError {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl DeviceApi for ServiceClient {
    async fn device_status(&self) -> Result<DeviceStatusResponse> {
        ServiceClient::device_status(self).await
    }

    async fn set_actuator(&self, actuator: Actuator, status: bool) -> Result<CommandResponse> {
        ServiceClient::set_actuator(self, actuator, status).await
    }

    async fn emulator_status(&self) -> Result<EmulatorStatus> {
        ServiceClient::emulator_status(self).await
    }

    async fn set_mode(&self, mode: DeviceMode) -> Result<CommandResponse> {
        match mode {
            DeviceMode::Emulator => self.start_emulator(&EmulatorConfig::default()).await,
            DeviceMode::Hardware => self.stop_emulator().await,
        }
    }

    async fn latest_readings(&self, limit: u32) -> Result<Vec<ReadingRecord>> {
        ServiceClient::latest_readings(self, limit).await
    }
}
