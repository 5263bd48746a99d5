//! State cache, consistency diagnostics, and HTTP API for aquasync.
//!
//! This crate provides a service that:
//! - Relays pump and heater commands to the telemetry service
//! - Keeps an in-memory cache of the best-known device state
//! - Ingests telemetry feed entries into the local reading history
//! - Reconciles the cache against the history on a schedule
//! - Audits cache/history agreement and reading gaps
//!
//! # REST API Endpoints
//!
//! - `GET /api/health` - Service health check
//! - `POST /api/pump`, `POST /api/heater` - Command an actuator (`{"status": bool}`)
//! - `GET /api/device/status` - Reconciled device state
//! - `POST /api/emulator/start`, `POST /api/emulator/stop`, `GET /api/emulator/status`
//! - `GET /api/diagnostics` - Latest diagnostic report
//! - `POST /api/diagnostics/run`, `POST /api/diagnostics/run/{kind}` - Run checks now
//! - `GET /api/readings` - Filtered, paginated reading history
//! - `GET /api/readings/latest` - Newest readings
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/aquasync/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:5000"
//!
//! [storage]
//! path = "~/.local/share/aquasync/data.db"
//!
//! [telemetry]
//! channel_id = "2840207"
//! write_api_key = "XXXXXXXXXXXXXXXX"
//! poll_interval_secs = 15
//!
//! [diagnostics]
//! interval_secs = 60
//! gap_factor = 3.0
//! ```
//!
//! `THINGSPEAK_CHANNEL_ID`, `THINGSPEAK_READ_API_KEY`,
//! `THINGSPEAK_WRITE_API_KEY`, and `PORT` override the file.

pub mod api;
pub mod cache;
pub mod collector;
pub mod command;
pub mod config;
pub mod diagnostics;
pub mod middleware;
pub mod state;
pub mod tasks;

pub use cache::{CacheSnapshot, StateCache};
pub use collector::{Collected, Collector, CollectorError};
pub use command::{CommandError, CommandGuard};
pub use config::{
    Config, ConfigError, DiagnosticsConfig, ServerConfig, StorageConfig, SyncConfig,
    TelemetryConfig, ValidationError,
};
pub use diagnostics::{DiagnosticHistory, Diagnostics, HISTORY_CAPACITY};
pub use state::AppState;
pub use tasks::{BackgroundTasks, TaskSet};
