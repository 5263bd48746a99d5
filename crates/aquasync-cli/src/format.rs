//! Output formatting for text and JSON.

use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use aquasync_core::Notification;
use aquasync_types::{
    CheckOutcome, DeviceMode, DeviceState, DeviceStatusResponse, DiagnosticRecord,
    DiagnosticReport, ReadingRecord,
};

/// Formatting options for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Disable colored output.
    pub no_color: bool,
}

impl FormatOptions {
    pub fn new(no_color: bool) -> Self {
        Self { no_color }
    }

    /// Serialize to pretty JSON with a trailing newline.
    pub fn as_json<T: Serialize>(&self, value: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(value)? + "\n")
    }

    fn paint_bool(&self, on: bool) -> String {
        let label = on_off(on);
        if self.no_color {
            label.to_string()
        } else if on {
            label.green().bold().to_string()
        } else {
            label.dimmed().to_string()
        }
    }

    fn paint_pass(&self, success: bool) -> String {
        let label = if success { "PASS" } else { "FAIL" };
        if self.no_color {
            label.to_string()
        } else if success {
            label.green().to_string()
        } else {
            label.red().bold().to_string()
        }
    }
}

/// `"ON"` or `"OFF"`.
pub fn on_off(on: bool) -> &'static str {
    if on { "ON" } else { "OFF" }
}

fn timestamp(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| at.to_string())
}

fn state_line(label: &str, state: &DeviceState) -> String {
    format!(
        "  {:<9} pump={} heater={} at {}\n",
        label,
        on_off(state.pump_status),
        on_off(state.heater_status),
        timestamp(state.timestamp)
    )
}

/// Reconciled device state as text.
pub fn format_status_text(status: &DeviceStatusResponse, opts: &FormatOptions) -> String {
    let mut out = String::new();
    out.push_str(&format!("Pump:    {}\n", opts.paint_bool(status.pump_status)));
    out.push_str(&format!("Heater:  {}\n", opts.paint_bool(status.heater_status)));
    out.push_str(&format!(
        "Source:  {} ({})\n",
        status.source,
        timestamp(status.timestamp)
    ));
    if let Some(memory) = &status.memory_state {
        out.push_str(&state_line("memory", memory));
    }
    if let Some(database) = &status.database_state {
        out.push_str(&state_line("database", database));
    }
    out
}

fn outcome_line<D>(name: &str, outcome: &Option<CheckOutcome<D>>, opts: &FormatOptions) -> String {
    match outcome {
        Some(o) => match &o.error {
            Some(error) => format!("{:<20} {}  {}\n", name, opts.paint_pass(o.success), error),
            None => format!("{:<20} {}\n", name, opts.paint_pass(o.success)),
        },
        None => format!("{:<20} -\n", name),
    }
}

fn history_line(record: &DiagnosticRecord, opts: &FormatOptions) -> String {
    format!(
        "  {} {:<18} {}  {}\n",
        timestamp(record.timestamp),
        record.kind.as_str(),
        opts.paint_pass(record.resolved),
        record.description
    )
}

/// Diagnostic report as text, with the newest `history_limit` records.
pub fn format_report_text(
    report: &DiagnosticReport,
    history_limit: usize,
    opts: &FormatOptions,
) -> String {
    let mut out = format!("Diagnostics at {}\n", timestamp(report.timestamp));
    out.push_str(&outcome_line("db_connection", &report.db_status, opts));
    out.push_str(&outcome_line(
        "device_consistency",
        &report.device_consistency,
        opts,
    ));
    if let Some(details) = report
        .device_consistency
        .as_ref()
        .and_then(|c| c.details.as_ref())
    {
        out.push_str(&state_line("memory", &details.memory));
        out.push_str(&state_line("database", &details.database));
    }
    out.push_str(&outcome_line("data_integrity", &report.data_integrity, opts));
    if let Some(details) = report
        .data_integrity
        .as_ref()
        .and_then(|c| c.details.as_ref())
    {
        out.push_str(&format!(
            "  {} readings, avg interval {:.1}s, max {:.1}s\n",
            details.readings_count,
            details.average_interval_ms / 1000.0,
            details.max_interval_ms / 1000.0
        ));
    }

    if !report.history.is_empty() && history_limit > 0 {
        out.push_str("History:\n");
        let skip = report.history.len().saturating_sub(history_limit);
        for record in report.history.iter().skip(skip) {
            out.push_str(&history_line(record, opts));
        }
    }
    out
}

fn sensor(value: Option<f32>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v:.1}{unit}"),
        None => "-".to_string(),
    }
}

/// Reading table, newest first as returned by the service.
pub fn format_readings_text(readings: &[ReadingRecord]) -> String {
    if readings.is_empty() {
        return "No readings stored.\n".to_string();
    }
    let mut out = format!(
        "{:<25} {:<4} {:<6} {:>8} {:>8} {:>7} {:>6}\n",
        "Timestamp", "Pump", "Heater", "Water", "Air", "Level", "pH"
    );
    for r in readings {
        out.push_str(&format!(
            "{:<25} {:<4} {:<6} {:>8} {:>8} {:>7} {:>6}\n",
            timestamp(r.timestamp),
            on_off(r.pump_status),
            on_off(r.heater_status),
            sensor(r.water_temp, "C"),
            sensor(r.air_temp, "C"),
            sensor(r.water_level, "%"),
            sensor(r.ph_level, "")
        ));
    }
    out
}

/// One-line command outcome.
pub fn format_notification(note: &Notification, opts: &FormatOptions) -> String {
    if opts.no_color {
        format!("{}\n", note.message)
    } else if note.success {
        format!("{}\n", note.message.green())
    } else {
        format!("{}\n", note.message.red())
    }
}

/// One line of `watch` output.
pub fn format_watch_line(
    at: OffsetDateTime,
    pump: bool,
    heater: bool,
    mode: DeviceMode,
    opts: &FormatOptions,
) -> String {
    format!(
        "[{}] pump={} heater={} mode={}\n",
        timestamp(at),
        opts.paint_bool(pump),
        opts.paint_bool(heater),
        mode
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use aquasync_core::reconciler::Control;
    use aquasync_types::{
        Actuator, ConsistencyDetails, DiagnosticKind, IntegrityDetails, StateSource,
    };
    use time::macros::datetime;

    const PLAIN: FormatOptions = FormatOptions { no_color: true };

    fn status() -> DeviceStatusResponse {
        let at = datetime!(2024-05-01 12:00 UTC);
        DeviceStatusResponse {
            pump_status: true,
            heater_status: false,
            source: StateSource::Database,
            memory_state: None,
            database_state: Some(DeviceState {
                pump_status: true,
                heater_status: false,
                source: StateSource::Database,
                timestamp: at,
            }),
            timestamp: at,
        }
    }

    #[test]
    fn test_on_off() {
        assert_eq!(on_off(true), "ON");
        assert_eq!(on_off(false), "OFF");
    }

    #[test]
    fn test_format_status_plain() {
        let text = format_status_text(&status(), &PLAIN);
        assert!(text.contains("Pump:    ON"));
        assert!(text.contains("Heater:  OFF"));
        assert!(text.contains("Source:  database (2024-05-01T12:00:00Z)"));
        assert!(text.contains("database  pump=ON heater=OFF"));
        assert!(!text.contains("memory"));
    }

    #[test]
    fn test_format_status_colored_differs() {
        let colored = format_status_text(&status(), &FormatOptions::new(false));
        assert!(colored.contains("\u{1b}["));
        assert!(!format_status_text(&status(), &PLAIN).contains("\u{1b}["));
    }

    #[test]
    fn test_format_report_with_failures() {
        let at = datetime!(2024-05-01 12:00 UTC);
        let memory = DeviceState {
            pump_status: false,
            heater_status: false,
            source: StateSource::Memory,
            timestamp: at,
        };
        let database = DeviceState {
            pump_status: true,
            source: StateSource::Database,
            ..memory
        };
        let report = DiagnosticReport {
            timestamp: at,
            db_status: Some(CheckOutcome::passed(())),
            device_consistency: Some(CheckOutcome::failed(
                "State mismatch: pump memory=false database=true",
                Some(ConsistencyDetails {
                    memory,
                    database,
                    is_pump_consistent: false,
                    is_heater_consistent: true,
                }),
            )),
            data_integrity: Some(CheckOutcome::passed(IntegrityDetails {
                average_interval_ms: 15_000.0,
                max_interval_ms: 20_000.0,
                readings_count: 60,
            })),
            history: vec![DiagnosticRecord {
                timestamp: at,
                kind: DiagnosticKind::DeviceConsistency,
                description: "State mismatch: pump memory=false database=true".to_string(),
                resolved: false,
            }],
        };

        let text = format_report_text(&report, 10, &PLAIN);
        assert!(text.contains("db_connection        PASS"));
        assert!(text.contains(
            "device_consistency   FAIL  State mismatch: pump memory=false database=true"
        ));
        assert!(text.contains("60 readings, avg interval 15.0s, max 20.0s"));
        assert!(text.contains("History:"));

        let without_history = format_report_text(&report, 0, &PLAIN);
        assert!(!without_history.contains("History:"));
    }

    #[test]
    fn test_format_report_skipped_check() {
        let report = DiagnosticReport {
            timestamp: datetime!(2024-05-01 12:00 UTC),
            db_status: Some(CheckOutcome::passed(())),
            device_consistency: None,
            data_integrity: None,
            history: Vec::new(),
        };
        let text = format_report_text(&report, 10, &PLAIN);
        assert!(text.contains("device_consistency   -"));
    }

    #[test]
    fn test_format_readings() {
        assert_eq!(format_readings_text(&[]), "No readings stored.\n");

        let mut reading = ReadingRecord::new(datetime!(2024-05-01 12:00 UTC), true, false);
        reading.water_temp = Some(24.5);
        let text = format_readings_text(&[reading]);
        let row = text.lines().nth(1).unwrap();
        assert!(row.starts_with("2024-05-01T12:00:00Z"));
        assert!(row.contains("ON   OFF"));
        assert!(row.contains("24.5C"));
    }

    #[test]
    fn test_format_notification_plain() {
        let note = Notification {
            control: Control::Actuator(Actuator::Pump),
            success: true,
            message: "Pump turned on".to_string(),
        };
        assert_eq!(format_notification(&note, &PLAIN), "Pump turned on\n");
    }

    #[test]
    fn test_as_json() {
        let json = PLAIN.as_json(&status()).unwrap();
        assert!(json.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["pumpStatus"], true);
        assert_eq!(value["source"], "database");
    }
}
