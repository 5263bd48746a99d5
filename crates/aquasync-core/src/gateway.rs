//! Remote command gateway.
//!
//! Translates an actuator intent into one write against the external
//! telemetry service. The gateway performs exactly one outbound call per
//! [`send`](CommandGateway::send): no retry, no deduplication, no timeout of
//! its own. Callers guard overlapping commands per actuator and bound every
//! call with `tokio::time::timeout`.
//!
//! # Example
//!
//! ```no_run
//! use aquasync_core::gateway::{CommandGateway, GatewayConfig, HttpGateway};
//! use aquasync_types::Actuator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::new("2840207")
//!     .read_api_key("READKEY")
//!     .write_api_key("WRITEKEY");
//! let gateway = HttpGateway::new(config)?;
//!
//! let ack = gateway.send(Actuator::Pump, true).await?;
//! println!("accepted: {}", ack.accepted);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA};
use time::OffsetDateTime;
use tracing::{debug, warn};

use aquasync_types::Actuator;

use crate::error::GatewayError;
use crate::fields::FieldMap;

/// Default base URL of the telemetry service.
pub const DEFAULT_BASE_URL: &str = "https://api.thingspeak.com";

/// Acknowledgement returned by the telemetry service for a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayAck {
    /// Whether the service stored the write.
    pub accepted: bool,
    /// Response body as received.
    pub raw_message: String,
}

/// Sends actuator intents to the remote device.
#[async_trait]
pub trait CommandGateway: Send + Sync {
    /// Ask the device to set `actuator` to `desired_status`.
    async fn send(&self, actuator: Actuator, desired_status: bool)
    -> Result<GatewayAck, GatewayError>;
}

/// Connection settings for [`HttpGateway`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub channel_id: String,
    pub read_api_key: String,
    pub write_api_key: String,
    pub fields: FieldMap,
    /// TCP connect bound; request duration is bounded by the caller.
    pub connect_timeout: Duration,
}

impl GatewayConfig {
    /// Settings for `channel_id` on the default service with no keys.
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            channel_id: channel_id.into(),
            read_api_key: String::new(),
            write_api_key: String::new(),
            fields: FieldMap::default(),
            connect_timeout: Duration::from_secs(5),
        }
    }

    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub fn read_api_key(mut self, key: impl Into<String>) -> Self {
        self.read_api_key = key.into();
        self
    }

    #[must_use]
    pub fn write_api_key(mut self, key: impl Into<String>) -> Self {
        self.write_api_key = key.into();
        self
    }

    #[must_use]
    pub fn fields(mut self, fields: FieldMap) -> Self {
        self.fields = fields;
        self
    }
}

/// HTTP client for a ThingSpeak-style telemetry service.
///
/// Implements both [`CommandGateway`] (writes) and
/// [`TelemetryFeed`](crate::feed::TelemetryFeed) (reads).
#[derive(Debug, Clone)]
pub struct HttpGateway {
    pub(crate) client: Client,
    pub(crate) config: GatewayConfig,
}

/// Headers asking every intermediary to skip caching.
pub(crate) fn no_cache_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

/// Millisecond cache-busting token.
pub(crate) fn cache_buster() -> String {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000).to_string()
}

impl HttpGateway {
    /// Create a gateway with its own HTTP client.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .default_headers(no_cache_headers())
            .build()?;
        Ok(Self::with_client(config, client))
    }

    /// Create a gateway with a custom reqwest Client.
    pub fn with_client(mut config: GatewayConfig, client: Client) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Self { client, config }
    }

    /// The active settings.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

#[async_trait]
impl CommandGateway for HttpGateway {
    async fn send(
        &self,
        actuator: Actuator,
        desired_status: bool,
    ) -> Result<GatewayAck, GatewayError> {
        if self.config.write_api_key.is_empty() {
            return Err(GatewayError::NotConfigured(
                "write API key is not set".to_string(),
            ));
        }

        let url = format!("{}/update", self.config.base_url);
        let field = format!("field{}", self.config.fields.actuator_field(actuator));
        let value = if desired_status { "1" } else { "0" };

        debug!(%actuator, desired_status, %field, "Sending gateway write");

        let response = self
            .client
            .post(&url)
            .headers(no_cache_headers())
            .query(&[
                ("api_key", self.config.write_api_key.as_str()),
                (field.as_str(), value),
                ("t", cache_buster().as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(%actuator, status = status.as_u16(), "Gateway write failed");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let trimmed = body.trim();
        let entry_id: i64 = trimmed.parse().map_err(|_| {
            GatewayError::Malformed(format!("expected an entry id, got {trimmed:?}"))
        })?;

        if entry_id == 0 {
            warn!(%actuator, "Telemetry service refused the write");
        }

        Ok(GatewayAck {
            accepted: entry_id > 0,
            raw_message: trimmed.to_string(),
        })
    }
}
