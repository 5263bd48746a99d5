//! Core types for actuator state, readings, and diagnostics.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::ParseError;

/// A controllable device output with a boolean on/off state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actuator {
    /// Water circulation pump.
    Pump,
    /// Water heater.
    Heater,
}

impl Actuator {
    /// Every actuator, in a stable order.
    pub const ALL: [Actuator; 2] = [Actuator::Pump, Actuator::Heater];

    /// Lowercase name used in URLs and logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Actuator::Pump => "pump",
            Actuator::Heater => "heater",
        }
    }

    /// Path of the service endpoint that actuates this output.
    ///
    /// # Examples
    ///
    /// ```
    /// use aquasync_types::Actuator;
    ///
    /// assert_eq!(Actuator::Pump.endpoint(), "/api/pump");
    /// assert_eq!(Actuator::Heater.endpoint(), "/api/heater");
    /// ```
    #[must_use]
    pub fn endpoint(&self) -> &'static str {
        match self {
            Actuator::Pump => "/api/pump",
            Actuator::Heater => "/api/heater",
        }
    }
}

impl fmt::Display for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Actuator {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pump" => Ok(Actuator::Pump),
            "heater" => Ok(Actuator::Heater),
            _ => Err(ParseError::UnknownActuator(s.to_string())),
        }
    }
}

/// Where a [`DeviceState`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateSource {
    /// Acknowledged by the remote command gateway and held in server memory.
    Memory,
    /// Read back from the persisted reading history.
    Database,
}

impl fmt::Display for StateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateSource::Memory => f.write_str("memory"),
            StateSource::Database => f.write_str("database"),
        }
    }
}

/// Snapshot of the actuator truth.
///
/// A `DeviceState` is never edited in place. Every gateway acknowledgement or
/// store read produces a new value that supersedes the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    /// Whether the pump is on.
    pub pump_status: bool,
    /// Whether the heater is on.
    pub heater_status: bool,
    /// Which path produced this snapshot.
    pub source: StateSource,
    /// When the snapshot was produced (gateway ack time or record timestamp).
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl DeviceState {
    /// State held before anything was confirmed: both outputs off, tagged as
    /// memory, stamped at the Unix epoch so any real observation is newer.
    #[must_use]
    pub fn unconfirmed() -> Self {
        Self {
            pump_status: false,
            heater_status: false,
            source: StateSource::Memory,
            timestamp: OffsetDateTime::UNIX_EPOCH,
        }
    }

    /// Build a database-sourced state from a persisted reading.
    #[must_use]
    pub fn from_reading(record: &ReadingRecord) -> Self {
        Self {
            pump_status: record.pump_status,
            heater_status: record.heater_status,
            source: StateSource::Database,
            timestamp: record.timestamp,
        }
    }

    /// Status of a single actuator.
    #[must_use]
    pub fn status(&self, actuator: Actuator) -> bool {
        match actuator {
            Actuator::Pump => self.pump_status,
            Actuator::Heater => self.heater_status,
        }
    }

    /// Produce the successor state after a gateway acknowledged `status` for
    /// `actuator`. The other actuator keeps its last known value.
    #[must_use]
    pub fn acknowledged(&self, actuator: Actuator, status: bool, at: OffsetDateTime) -> Self {
        let mut next = Self {
            source: StateSource::Memory,
            timestamp: at,
            ..*self
        };
        match actuator {
            Actuator::Pump => next.pump_status = status,
            Actuator::Heater => next.heater_status = status,
        }
        next
    }

    /// Whether both actuator values match, ignoring source and timestamp.
    #[must_use]
    pub fn same_actuators(&self, other: &DeviceState) -> bool {
        self.pump_status == other.pump_status && self.heater_status == other.heater_status
    }
}

/// One row of the append-only reading history.
///
/// Sensor fields are optional because a telemetry entry may only carry the
/// fields that were written in that update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingRecord {
    /// When the reading was captured by the telemetry service.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Pump state at capture time.
    pub pump_status: bool,
    /// Heater state at capture time.
    pub heater_status: bool,
    /// Water temperature in Celsius.
    #[serde(default)]
    pub water_temp: Option<f32>,
    /// Air temperature in Celsius.
    #[serde(default)]
    pub air_temp: Option<f32>,
    /// Water level as a percentage of tank height.
    #[serde(default)]
    pub water_level: Option<f32>,
    /// Flow rate in litres per minute.
    #[serde(default)]
    pub flow_rate: Option<f32>,
    /// Relative humidity percentage.
    #[serde(default)]
    pub humidity: Option<f32>,
    /// Water pH.
    #[serde(default)]
    pub ph_level: Option<f32>,
    /// Dissolved oxygen in mg/L.
    #[serde(default)]
    pub oxygen_level: Option<f32>,
}

impl ReadingRecord {
    /// Create a record carrying only actuator state.
    #[must_use]
    pub fn new(timestamp: OffsetDateTime, pump_status: bool, heater_status: bool) -> Self {
        Self {
            timestamp,
            pump_status,
            heater_status,
            water_temp: None,
            air_temp: None,
            water_level: None,
            flow_rate: None,
            humidity: None,
            ph_level: None,
            oxygen_level: None,
        }
    }

    /// Status of a single actuator at capture time.
    #[must_use]
    pub fn status(&self, actuator: Actuator) -> bool {
        match actuator {
            Actuator::Pump => self.pump_status,
            Actuator::Heater => self.heater_status,
        }
    }
}

/// An in-flight actuator intent issued by a control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingCommand {
    /// Target actuator.
    pub actuator: Actuator,
    /// Value the user asked for.
    pub desired_status: bool,
    /// When the command was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
    /// Displayed value before the optimistic apply; restored on rollback.
    pub optimistic_prior_status: bool,
}

impl PendingCommand {
    /// Create a command that flips `prior` for `actuator`.
    #[must_use]
    pub fn toggle(actuator: Actuator, prior: bool) -> Self {
        Self {
            actuator,
            desired_status: !prior,
            issued_at: OffsetDateTime::now_utc(),
            optimistic_prior_status: prior,
        }
    }
}

/// Which self-check produced a [`DiagnosticRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Persisted store connectivity.
    DbConnection,
    /// Agreement between the in-memory cache and the newest reading.
    DeviceConsistency,
    /// Gaps in the recent reading timeline.
    DataIntegrity,
}

impl DiagnosticKind {
    /// Every check, in the order a full run executes them.
    pub const ALL: [DiagnosticKind; 3] = [
        DiagnosticKind::DbConnection,
        DiagnosticKind::DeviceConsistency,
        DiagnosticKind::DataIntegrity,
    ];

    /// Snake-case name used on the wire and in URLs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::DbConnection => "db_connection",
            DiagnosticKind::DeviceConsistency => "device_consistency",
            DiagnosticKind::DataIntegrity => "data_integrity",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiagnosticKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "db_connection" => Ok(DiagnosticKind::DbConnection),
            "device_consistency" => Ok(DiagnosticKind::DeviceConsistency),
            "data_integrity" => Ok(DiagnosticKind::DataIntegrity),
            other => Err(ParseError::UnknownDiagnosticKind(other.to_string())),
        }
    }
}

/// An audit entry produced by one diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    /// When the check ran.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Which check produced the record.
    #[serde(rename = "type")]
    pub kind: DiagnosticKind,
    /// Human-readable outcome.
    pub description: String,
    /// `true` when the check passed.
    pub resolved: bool,
}

/// Data source feeding the reading history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceMode {
    /// The physical microcontroller.
    #[default]
    Hardware,
    /// The synthetic-data emulator.
    Emulator,
}

impl DeviceMode {
    /// The other mode.
    #[must_use]
    pub fn toggled(&self) -> Self {
        match self {
            DeviceMode::Hardware => DeviceMode::Emulator,
            DeviceMode::Emulator => DeviceMode::Hardware,
        }
    }

    /// Mode implied by the emulator's enabled flag.
    #[must_use]
    pub fn from_emulator_enabled(enabled: bool) -> Self {
        if enabled {
            DeviceMode::Emulator
        } else {
            DeviceMode::Hardware
        }
    }
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceMode::Hardware => f.write_str("hardware"),
            DeviceMode::Emulator => f.write_str("emulator"),
        }
    }
}

impl FromStr for DeviceMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hardware" | "nodemcu" => Ok(DeviceMode::Hardware),
            "emulator" => Ok(DeviceMode::Emulator),
            _ => Err(ParseError::UnknownDeviceMode(s.to_string())),
        }
    }
}
