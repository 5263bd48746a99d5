//! Consistency diagnostics.
//!
//! Three independent checks audit the service:
//!
//! 1. **Connectivity** (`db_connection`): one record can be read from the store.
//! 2. **State consistency** (`device_consistency`): the last gateway
//!    acknowledgement agrees with the newest persisted reading.
//! 3. **Integrity** (`data_integrity`): the newest readings have no interval
//!    larger than `gap_factor` times the mean interval.
//!
//! Every check appends exactly one [`DiagnosticRecord`] to a bounded history.
//! Checks never fail the caller; problems become unresolved records.

use std::collections::VecDeque;

use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use aquasync_store::Store;
use aquasync_types::{
    CheckOutcome, ConsistencyDetails, DeviceState, DiagnosticKind, DiagnosticRecord,
    DiagnosticReport, IntegrityDetails, ReadingRecord,
};

use crate::cache::StateCache;
use crate::config::DiagnosticsConfig;

/// Number of records the history retains.
pub const HISTORY_CAPACITY: usize = 100;

/// Fixed-capacity record history; the oldest record is evicted first.
#[derive(Debug, Clone)]
pub struct DiagnosticHistory {
    records: VecDeque<DiagnosticRecord>,
    capacity: usize,
}

impl Default for DiagnosticHistory {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl DiagnosticHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, record: DiagnosticRecord) {
        if self.capacity == 0 {
            return;
        }
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Records, oldest first.
    pub fn to_vec(&self) -> Vec<DiagnosticRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn latest(&self) -> Option<&DiagnosticRecord> {
        self.records.back()
    }
}

/// Inputs a check needs, read once per run.
struct Inputs {
    latest: Result<Option<ReadingRecord>, String>,
    window: Result<Vec<ReadingRecord>, String>,
    memory: DeviceState,
}

/// The diagnostics job: settings, history, and the latest report.
#[derive(Debug)]
pub struct Diagnostics {
    settings: DiagnosticsConfig,
    history: Mutex<DiagnosticHistory>,
    latest: RwLock<Option<DiagnosticReport>>,
}

impl Diagnostics {
    pub fn new(settings: DiagnosticsConfig) -> Self {
        Self {
            settings,
            history: Mutex::new(DiagnosticHistory::default()),
            latest: RwLock::new(None),
        }
    }

    pub fn settings(&self) -> &DiagnosticsConfig {
        &self.settings
    }

    /// The most recent report, merged across single-check runs.
    pub async fn latest_report(&self) -> Option<DiagnosticReport> {
        self.latest.read().await.clone()
    }

    pub async fn history(&self) -> Vec<DiagnosticRecord> {
        self.history.lock().await.to_vec()
    }

    /// Run every check.
    pub async fn run_all(&self, store: &Mutex<Store>, cache: &StateCache) -> DiagnosticReport {
        self.run(&DiagnosticKind::ALL, store, cache).await
    }

    /// Run a single check.
    pub async fn run_check(
        &self,
        kind: DiagnosticKind,
        store: &Mutex<Store>,
        cache: &StateCache,
    ) -> DiagnosticReport {
        self.run(&[kind], store, cache).await
    }

    async fn run(
        &self,
        kinds: &[DiagnosticKind],
        store: &Mutex<Store>,
        cache: &StateCache,
    ) -> DiagnosticReport {
        // compare the acknowledgement, not the reconciled reported state
        let memory = cache.snapshot().await.memory;
        let inputs = {
            let store = store.lock().await;
            Inputs {
                latest: store.latest_reading().map_err(|e| e.to_string()),
                window: store
                    .latest_readings(self.settings.window)
                    .map_err(|e| e.to_string()),
                memory,
            }
        };

        let now = OffsetDateTime::now_utc();
        let mut report = DiagnosticReport {
            timestamp: now,
            db_status: None,
            device_consistency: None,
            data_integrity: None,
            history: Vec::new(),
        };
        let mut records = Vec::with_capacity(kinds.len());

        for kind in kinds {
            let (resolved, description) = match kind {
                DiagnosticKind::DbConnection => {
                    let (outcome, description) = check_connectivity(&inputs.latest);
                    let resolved = outcome.success;
                    report.db_status = Some(outcome);
                    (resolved, description)
                }
                DiagnosticKind::DeviceConsistency => {
                    let (outcome, description) =
                        check_consistency(inputs.memory, &inputs.latest);
                    let resolved = outcome.success;
                    report.device_consistency = Some(outcome);
                    (resolved, description)
                }
                DiagnosticKind::DataIntegrity => {
                    let (outcome, description) =
                        check_integrity(&inputs.window, self.settings.gap_factor);
                    let resolved = outcome.success;
                    report.data_integrity = Some(outcome);
                    (resolved, description)
                }
            };

            if resolved {
                debug!(check = %kind, "{description}");
            } else {
                warn!(check = %kind, "{description}");
            }

            records.push(DiagnosticRecord {
                timestamp: now,
                kind: *kind,
                description,
                resolved,
            });
        }

        {
            let mut history = self.history.lock().await;
            for record in records {
                history.push(record);
            }
            report.history = history.to_vec();
        }

        let mut latest = self.latest.write().await;
        let merged = match latest.take() {
            Some(previous) => merge(previous, &report),
            None => report.clone(),
        };
        *latest = Some(merged);

        if kinds.len() > 1 {
            info!(passed = report.all_passed(), "diagnostics run complete");
        }
        report
    }
}

/// Overlay the checks that ran in `newer` onto `previous`.
fn merge(previous: DiagnosticReport, newer: &DiagnosticReport) -> DiagnosticReport {
    DiagnosticReport {
        timestamp: newer.timestamp,
        db_status: newer.db_status.clone().or(previous.db_status),
        device_consistency: newer
            .device_consistency
            .clone()
            .or(previous.device_consistency),
        data_integrity: newer.data_integrity.clone().or(previous.data_integrity),
        history: newer.history.clone(),
    }
}

fn check_connectivity(latest: &Result<Option<ReadingRecord>, String>) -> (CheckOutcome<()>, String) {
    match latest {
        Ok(Some(record)) => (
            CheckOutcome::passed(()),
            format!(
                "Database reachable, newest reading at {}",
                record.timestamp
            ),
        ),
        Ok(None) => (
            CheckOutcome::failed("No readings found in database", None),
            "Database reachable but holds no readings".to_string(),
        ),
        Err(e) => (
            CheckOutcome::failed(e.clone(), None),
            format!("Database connection failed: {e}"),
        ),
    }
}

/// Compare the last gateway acknowledgement against the newest persisted
/// reading.
pub fn check_consistency(
    memory: DeviceState,
    latest: &Result<Option<ReadingRecord>, String>,
) -> (CheckOutcome<ConsistencyDetails>, String) {
    let record = match latest {
        Ok(Some(record)) => record,
        Ok(None) => {
            return (
                CheckOutcome::failed("No readings available for comparison", None),
                "No readings available for state comparison".to_string(),
            );
        }
        Err(e) => {
            return (
                CheckOutcome::failed(e.clone(), None),
                format!("State comparison skipped: {e}"),
            );
        }
    };

    let database = DeviceState::from_reading(record);
    let details = ConsistencyDetails {
        memory,
        database,
        is_pump_consistent: memory.pump_status == database.pump_status,
        is_heater_consistent: memory.heater_status == database.heater_status,
    };

    if details.is_pump_consistent && details.is_heater_consistent {
        (
            CheckOutcome::passed(details),
            "Memory and database states agree".to_string(),
        )
    } else {
        let mut mismatches = Vec::new();
        if !details.is_pump_consistent {
            mismatches.push(format!(
                "pump memory={} database={}",
                memory.pump_status, database.pump_status
            ));
        }
        if !details.is_heater_consistent {
            mismatches.push(format!(
                "heater memory={} database={}",
                memory.heater_status, database.heater_status
            ));
        }
        let description = format!("State mismatch: {}", mismatches.join(", "));
        (
            CheckOutcome::failed(description.clone(), Some(details)),
            description,
        )
    }
}

/// Scan reading intervals for a gap.
///
/// `window` may be in either time order. Fewer than two readings cannot be
/// judged and count as unresolved.
pub fn check_integrity(
    window: &Result<Vec<ReadingRecord>, String>,
    gap_factor: f64,
) -> (CheckOutcome<IntegrityDetails>, String) {
    let readings = match window {
        Ok(readings) => readings,
        Err(e) => {
            return (
                CheckOutcome::failed(e.clone(), None),
                format!("Integrity check skipped: {e}"),
            );
        }
    };

    if readings.len() < 2 {
        let message = format!(
            "Insufficient data: {} reading(s), need at least 2",
            readings.len()
        );
        return (CheckOutcome::failed(message.clone(), None), message);
    }

    let intervals: Vec<f64> = readings
        .windows(2)
        .map(|pair| {
            let delta = pair[0].timestamp - pair[1].timestamp;
            (delta.whole_milliseconds() as f64).abs()
        })
        .collect();

    let average = intervals.iter().sum::<f64>() / intervals.len() as f64;
    let max = intervals.iter().copied().fold(0.0_f64, f64::max);

    let details = IntegrityDetails {
        average_interval_ms: average,
        max_interval_ms: max,
        readings_count: readings.len(),
    };

    if max > gap_factor * average {
        let description = format!(
            "Gap detected: longest interval {:.1}s exceeds {}x the average {:.1}s",
            max / 1000.0,
            gap_factor,
            average / 1000.0
        );
        (
            CheckOutcome::failed(description.clone(), Some(details)),
            description,
        )
    } else {
        (
            CheckOutcome::passed(details),
            format!(
                "Intervals regular over {} readings: average {:.1}s, longest {:.1}s",
                readings.len(),
                average / 1000.0,
                max / 1000.0
            ),
        )
    }
}
