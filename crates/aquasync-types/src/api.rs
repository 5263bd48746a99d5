//! Request and response bodies of the aquasync HTTP API.
//!
//! These types are shared by the service (which produces them) and by the
//! client reconciler and CLI (which consume them). Field names are camelCase
//! on the wire.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{DeviceMode, DeviceState, DiagnosticRecord, StateSource};

/// Body of `POST /api/pump` and `POST /api/heater`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Desired actuator state.
    pub status: bool,
}

/// Outcome of an actuator or emulator command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CommandResponse {
    /// A successful response with an optional message.
    pub fn ok(message: Option<String>) -> Self {
        Self {
            success: true,
            message,
        }
    }

    /// A failed response carrying the error text.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Body of `GET /api/device/status`.
///
/// The top-level fields carry the value the last reconciliation pass
/// selected; `memory_state` and `database_state` expose both candidates so a
/// client can see where the answer came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatusResponse {
    pub pump_status: bool,
    pub heater_status: bool,
    pub source: StateSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_state: Option<DeviceState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_state: Option<DeviceState>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl DeviceStatusResponse {
    /// The selected state as a [`DeviceState`].
    #[must_use]
    pub fn current(&self) -> DeviceState {
        DeviceState {
            pump_status: self.pump_status,
            heater_status: self.heater_status,
            source: self.source,
            timestamp: self.timestamp,
        }
    }
}

/// Data pattern the emulator should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmulatorPattern {
    #[default]
    Stable,
    Fluctuating,
    Random,
    Scenario,
}

fn default_update_interval() -> u64 {
    5000
}

/// Body of `POST /api/emulator/start`, echoed back by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmulatorConfig {
    /// Milliseconds between synthetic updates.
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,
    #[serde(default)]
    pub mode: EmulatorPattern,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_name: Option<String>,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            update_interval: default_update_interval(),
            mode: EmulatorPattern::default(),
            scenario_name: None,
        }
    }
}

/// Body of `GET /api/emulator/status`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmulatorStatus {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<EmulatorConfig>,
}

impl EmulatorStatus {
    /// Device mode implied by this status.
    #[must_use]
    pub fn mode(&self) -> DeviceMode {
        DeviceMode::from_emulator_enabled(self.enabled)
    }
}

/// Result of one diagnostic check inside a [`DiagnosticReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome<D> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<D>,
}

impl<D> CheckOutcome<D> {
    /// A passing check with attached details.
    pub fn passed(details: D) -> Self {
        Self {
            success: true,
            error: None,
            details: Some(details),
        }
    }

    /// A failing check with an error text and optional details.
    pub fn failed(error: impl Into<String>, details: Option<D>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            details,
        }
    }
}

/// Details attached to the state consistency check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyDetails {
    pub memory: DeviceState,
    pub database: DeviceState,
    pub is_pump_consistent: bool,
    pub is_heater_consistent: bool,
}

/// Details attached to the timeline gap check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityDetails {
    /// Mean interval between consecutive readings, in milliseconds.
    pub average_interval_ms: f64,
    /// Largest interval between consecutive readings, in milliseconds.
    pub max_interval_ms: f64,
    pub readings_count: usize,
}

/// Aggregate result of a diagnostics run.
///
/// Checks that were not part of the run are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticReport {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_status: Option<CheckOutcome<()>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_consistency: Option<CheckOutcome<ConsistencyDetails>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_integrity: Option<CheckOutcome<IntegrityDetails>>,
    /// Bounded diagnostic history, oldest first.
    pub history: Vec<DiagnosticRecord>,
}

impl DiagnosticReport {
    /// Whether every check that ran passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.db_status.as_ref().is_none_or(|c| c.success)
            && self.device_consistency.as_ref().is_none_or(|c| c.success)
            && self.data_integrity.as_ref().is_none_or(|c| c.success)
    }
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl HealthResponse {
    pub fn ok(version: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            version: version.into(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}
