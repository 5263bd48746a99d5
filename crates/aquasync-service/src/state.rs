//! Application state shared across handlers and background tasks.
//!
//! # Locking
//!
//! - **`store`** (Mutex): held only around synchronous SQLite calls, never
//!   across a gateway call.
//! - **`cache`**: internally an `RwLock`; reads never touch network or store.
//! - **`emulator`** (RwLock): written by the emulator endpoints.
//!
//! When both are needed, read the cache before locking the store.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use aquasync_core::{SharedFeed, SharedGateway};
use aquasync_store::Store;
use aquasync_types::{
    Actuator, DeviceState, DeviceStatusResponse, DiagnosticKind, DiagnosticReport, EmulatorConfig,
    EmulatorStatus, ReadingRecord,
};

use crate::cache::StateCache;
use crate::command::{self, CommandError, CommandGuard};
use crate::config::Config;
use crate::diagnostics::Diagnostics;

/// Shared application state.
pub struct AppState {
    /// The data store (wrapped in Mutex for thread-safe access).
    pub store: Mutex<Store>,
    /// Configuration, fixed at startup.
    pub config: Config,
    /// Best-known device state.
    pub cache: StateCache,
    /// Diagnostics job and history.
    pub diagnostics: Diagnostics,
    /// Outbound actuator writes.
    pub gateway: SharedGateway,
    /// Inbound telemetry reads.
    pub feed: SharedFeed,
    /// Emulator flag and start configuration.
    pub emulator: RwLock<EmulatorStatus>,
    /// Per-actuator in-flight guard.
    pub commands: CommandGuard,
}

impl AppState {
    /// Create new application state.
    pub fn new(store: Store, config: Config, gateway: SharedGateway, feed: SharedFeed) -> Arc<Self> {
        let diagnostics = Diagnostics::new(config.diagnostics.clone());
        Arc::new(Self {
            store: Mutex::new(store),
            config,
            cache: StateCache::new(),
            diagnostics,
            gateway,
            feed,
            emulator: RwLock::new(EmulatorStatus::default()),
            commands: CommandGuard::new(),
        })
    }

    /// Send an actuator command through the gateway.
    pub async fn send_command(
        &self,
        actuator: Actuator,
        status: bool,
    ) -> Result<DeviceState, CommandError> {
        command::execute(
            self.gateway.as_ref(),
            &self.commands,
            &self.cache,
            self.config.telemetry.request_timeout(),
            actuator,
            status,
        )
        .await
    }

    /// Newest persisted reading; store errors are logged and read as `None`.
    pub async fn latest_reading(&self) -> Option<ReadingRecord> {
        let store = self.store.lock().await;
        match store.latest_reading() {
            Ok(latest) => latest,
            Err(e) => {
                warn!("Failed to read latest reading: {e}");
                None
            }
        }
    }

    /// Run one reconciliation pass and report the result.
    pub async fn reconcile(&self) -> DeviceStatusResponse {
        let latest = self.latest_reading().await;
        self.cache.reconcile(latest.as_ref()).await;
        self.cache.snapshot().await.to_response()
    }

    pub async fn run_diagnostics(&self) -> DiagnosticReport {
        self.diagnostics.run_all(&self.store, &self.cache).await
    }

    pub async fn run_check(&self, kind: DiagnosticKind) -> DiagnosticReport {
        self.diagnostics
            .run_check(kind, &self.store, &self.cache)
            .await
    }

    /// Mark the emulator enabled. Returns `true` if it was already running.
    pub async fn start_emulator(&self, config: EmulatorConfig) -> bool {
        let mut emulator = self.emulator.write().await;
        let was_running = emulator.enabled;
        *emulator = EmulatorStatus {
            enabled: true,
            config: Some(config),
        };
        was_running
    }

    /// Mark the emulator disabled. Returns `true` if it was running.
    pub async fn stop_emulator(&self) -> bool {
        let mut emulator = self.emulator.write().await;
        let was_running = emulator.enabled;
        *emulator = EmulatorStatus::default();
        was_running
    }
}
