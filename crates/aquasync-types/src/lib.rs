//! Shared types for the aquasync pump/heater controller.
//!
//! This crate provides the data model used by the service (aquasync-service),
//! the client reconciler (aquasync-core), and the persisted store
//! (aquasync-store).
//!
//! # Features
//!
//! - Actuator state snapshots with provenance
//! - Reading records from the telemetry feed
//! - Diagnostic records and reports
//! - HTTP request/response bodies
//!
//! # Example
//!
//! ```
//! use aquasync_types::{Actuator, DeviceState};
//!
//! let state = DeviceState::unconfirmed();
//! assert!(!state.status(Actuator::Pump));
//! ```

pub mod api;
pub mod error;
pub mod types;

pub use api::{
    CheckOutcome, CommandRequest, CommandResponse, ConsistencyDetails, DeviceStatusResponse,
    DiagnosticReport, EmulatorConfig, EmulatorPattern, EmulatorStatus, HealthResponse,
    IntegrityDetails,
};
pub use error::{ParseError, ParseResult};
pub use types::{
    Actuator, DeviceMode, DeviceState, DiagnosticKind, DiagnosticRecord, PendingCommand,
    ReadingRecord, StateSource,
};

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    // --- Actuator tests ---

    #[test]
    fn test_actuator_from_str_accepts_mixed_case() {
        assert_eq!("pump".parse::<Actuator>().unwrap(), Actuator::Pump);
        assert_eq!(" Heater ".parse::<Actuator>().unwrap(), Actuator::Heater);
    }

    #[test]
    fn test_actuator_from_str_rejects_unknown() {
        let err = "valve".parse::<Actuator>().unwrap_err();
        assert_eq!(err, ParseError::UnknownActuator("valve".to_string()));
        assert!(err.to_string().contains("expected 'pump' or 'heater'"));
    }

    #[test]
    fn test_actuator_serializes_lowercase() {
        let json = serde_json::to_string(&Actuator::Heater).unwrap();
        assert_eq!(json, "\"heater\"");
    }

    // --- DeviceState tests ---

    #[test]
    fn test_unconfirmed_state_is_off_and_at_epoch() {
        let state = DeviceState::unconfirmed();
        assert!(!state.pump_status);
        assert!(!state.heater_status);
        assert_eq!(state.source, StateSource::Memory);
        assert_eq!(state.timestamp, time::OffsetDateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_acknowledged_changes_only_target_actuator() {
        let base = DeviceState {
            pump_status: false,
            heater_status: true,
            source: StateSource::Database,
            timestamp: datetime!(2024-05-01 10:00 UTC),
        };
        let at = datetime!(2024-05-01 10:05 UTC);

        let next = base.acknowledged(Actuator::Pump, true, at);

        assert!(next.pump_status);
        assert!(next.heater_status);
        assert_eq!(next.source, StateSource::Memory);
        assert_eq!(next.timestamp, at);
        // the previous snapshot is untouched
        assert!(!base.pump_status);
    }

    #[test]
    fn test_from_reading_is_database_sourced() {
        let record = ReadingRecord::new(datetime!(2024-05-01 10:00 UTC), true, false);
        let state = DeviceState::from_reading(&record);
        assert_eq!(state.source, StateSource::Database);
        assert!(state.status(Actuator::Pump));
        assert!(!state.status(Actuator::Heater));
        assert_eq!(state.timestamp, record.timestamp);
    }

    #[test]
    fn test_device_state_wire_format() {
        let state = DeviceState {
            pump_status: true,
            heater_status: false,
            source: StateSource::Memory,
            timestamp: datetime!(2024-05-01 10:00 UTC),
        };
        let value = serde_json::to_value(state).unwrap();
        assert_eq!(value["pumpStatus"], true);
        assert_eq!(value["heaterStatus"], false);
        assert_eq!(value["source"], "memory");
        assert_eq!(value["timestamp"], "2024-05-01T10:00:00Z");
    }

    // --- DiagnosticKind tests ---

    #[test]
    fn test_diagnostic_kind_round_trips_through_str() {
        for kind in DiagnosticKind::ALL {
            assert_eq!(kind.as_str().parse::<DiagnosticKind>().unwrap(), kind);
        }
        assert!("disk_space".parse::<DiagnosticKind>().is_err());
    }

    #[test]
    fn test_diagnostic_record_uses_type_key() {
        let record = DiagnosticRecord {
            timestamp: datetime!(2024-05-01 10:00 UTC),
            kind: DiagnosticKind::DataIntegrity,
            description: "Max interval 400s exceeds 3x average".to_string(),
            resolved: false,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "data_integrity");
        assert_eq!(value["resolved"], false);
    }

    // --- DeviceMode tests ---

    #[test]
    fn test_device_mode_parsing_and_toggle() {
        assert_eq!("emulator".parse::<DeviceMode>().unwrap(), DeviceMode::Emulator);
        assert_eq!("NodeMCU".parse::<DeviceMode>().unwrap(), DeviceMode::Hardware);
        assert_eq!(DeviceMode::Hardware.toggled(), DeviceMode::Emulator);
        assert_eq!(DeviceMode::from_emulator_enabled(true), DeviceMode::Emulator);
    }

    // --- API body tests ---

    #[test]
    fn test_command_response_omits_empty_message() {
        let json = serde_json::to_string(&CommandResponse::ok(None)).unwrap();
        assert_eq!(json, r#"{"success":true}"#);

        let failed = CommandResponse::failed("Gateway returned HTTP 500");
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["message"], "Gateway returned HTTP 500");
    }

    #[test]
    fn test_emulator_config_defaults() {
        let config: EmulatorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.update_interval, 5000);
        assert_eq!(config.mode, EmulatorPattern::Stable);
        assert!(config.scenario_name.is_none());

        let config: EmulatorConfig =
            serde_json::from_str(r#"{"updateInterval":1000,"mode":"scenario","scenarioName":"heatwave"}"#)
                .unwrap();
        assert_eq!(config.update_interval, 1000);
        assert_eq!(config.mode, EmulatorPattern::Scenario);
        assert_eq!(config.scenario_name.as_deref(), Some("heatwave"));
    }

    #[test]
    fn test_device_status_response_parses_optional_snapshots() {
        let json = r#"{
            "pumpStatus": true,
            "heaterStatus": false,
            "source": "database",
            "timestamp": "2024-05-01T10:00:00Z"
        }"#;
        let response: DeviceStatusResponse = serde_json::from_str(json).unwrap();
        assert!(response.memory_state.is_none());
        assert!(response.database_state.is_none());
        let current = response.current();
        assert!(current.pump_status);
        assert_eq!(current.source, StateSource::Database);
    }

    #[test]
    fn test_report_all_passed_ignores_missing_checks() {
        let mut report = DiagnosticReport {
            timestamp: datetime!(2024-05-01 10:00 UTC),
            db_status: Some(CheckOutcome::passed(())),
            device_consistency: None,
            data_integrity: None,
            history: Vec::new(),
        };
        assert!(report.all_passed());

        report.data_integrity = Some(CheckOutcome::failed("insufficient data", None));
        assert!(!report.all_passed());
    }

    #[test]
    fn test_diagnostic_report_parses_checks_without_details() {
        let json = r#"{
            "timestamp": "2024-05-01T10:00:00Z",
            "dbStatus": {"success": true},
            "deviceConsistency": {"success": false, "error": "No readings available for comparison"},
            "dataIntegrity": {
                "success": true,
                "details": {"averageIntervalMs": 60000.0, "maxIntervalMs": 60000.0, "readingsCount": 5}
            },
            "history": [
                {"timestamp": "2024-05-01T10:00:00Z", "type": "device_consistency",
                 "description": "No readings available for state comparison", "resolved": false}
            ]
        }"#;
        let report: DiagnosticReport = serde_json::from_str(json).unwrap();

        assert!(report.db_status.unwrap().details.is_none());
        let consistency = report.device_consistency.unwrap();
        assert!(!consistency.success);
        assert!(consistency.details.is_none());
        assert_eq!(report.data_integrity.unwrap().details.unwrap().readings_count, 5);
        assert_eq!(report.history[0].kind, DiagnosticKind::DeviceConsistency);
    }
}
