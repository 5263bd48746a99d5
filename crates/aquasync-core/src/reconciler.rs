//! Client-side reconciliation of actuator controls.
//!
//! Each control surface keeps an optimistic copy of the actuator state and
//! treats the service as authoritative. Every control (pump, heater, and the
//! device-mode selector) runs the same state machine:
//!
//! ```text
//! Idle --toggle--> Pending --ok--> Confirmed --settle--> Idle
//!                          \-err-> RolledBack --settle--> Idle
//! ```
//!
//! A toggle while the control is not `Idle` is ignored. After the settle
//! delay the control returns to `Idle` and a reconciliation read runs. The
//! background poller only corrects controls that are `Idle`.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use aquasync_core::reconciler::{Reconciler, ReconcilerOptions};
//! use aquasync_core::service_client::ServiceClient;
//! use aquasync_types::Actuator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ServiceClient::new("http://localhost:5000")?;
//! let reconciler = Arc::new(Reconciler::new(client, ReconcilerOptions::default()));
//! let mut notifications = reconciler.subscribe();
//!
//! let _polling = reconciler.start_polling();
//! reconciler.toggle(Actuator::Pump).await;
//!
//! if let Ok(note) = notifications.recv().await {
//!     println!("{}", note.message);
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use aquasync_types::{Actuator, DeviceMode, PendingCommand, ReadingRecord};

use crate::error::{Error, Result};
use crate::service_client::DeviceApi;

/// Phase of a single control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlPhase {
    /// Accepting toggles; the poller may correct the displayed value.
    Idle,
    /// A command is in flight; the displayed value is optimistic.
    Pending,
    /// The service confirmed the command; settling.
    Confirmed,
    /// The command failed and the prior value was restored; settling.
    RolledBack,
}

/// Result of a toggle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The control was busy; nothing was sent.
    Ignored,
    /// The service accepted the command.
    Confirmed,
    /// The command failed and the prior value was restored.
    RolledBack,
}

/// Which control a notification refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    Actuator(Actuator),
    Mode,
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Control::Actuator(actuator) => write!(f, "{actuator}"),
            Control::Mode => f.write_str("device mode"),
        }
    }
}

/// User-facing outcome of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub control: Control,
    pub success: bool,
    pub message: String,
}

/// Timing options for the reconciler.
#[derive(Debug, Clone)]
pub struct ReconcilerOptions {
    /// Interval between background status reads. Default: 5 seconds.
    pub poll_interval: Duration,
    /// Delay between resolution and returning to `Idle`. Default: 1 second.
    pub settle_delay: Duration,
    /// Caller-side bound on every service call. Default: 5 seconds.
    pub command_timeout: Duration,
    /// Capacity of the notification channel. Default: 32.
    pub notification_capacity: usize,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            settle_delay: Duration::from_secs(1),
            command_timeout: Duration::from_secs(5),
            notification_capacity: 32,
        }
    }
}

impl ReconcilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    #[must_use]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Validate the options and return an error if invalid.
    ///
    /// Checks that:
    /// - `poll_interval` is > 0
    /// - `command_timeout` is > 0
    /// - `notification_capacity` is > 0
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidConfig("poll_interval must be > 0".to_string()));
        }
        if self.command_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "command_timeout must be > 0".to_string(),
            ));
        }
        if self.notification_capacity == 0 {
            return Err(Error::InvalidConfig(
                "notification_capacity must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct ControlState<T> {
    displayed: T,
    phase: ControlPhase,
    /// Bumped on every accepted toggle so a poll that read the service before
    /// the toggle cannot overwrite its result.
    epoch: u64,
}

impl<T> ControlState<T> {
    fn new(displayed: T) -> Self {
        Self {
            displayed,
            phase: ControlPhase::Idle,
            epoch: 0,
        }
    }
}

#[derive(Debug)]
struct Inner {
    pump: ControlState<bool>,
    heater: ControlState<bool>,
    mode: ControlState<DeviceMode>,
    pending: HashMap<Actuator, PendingCommand>,
    readings: HashMap<u32, Vec<ReadingRecord>>,
}

impl Inner {
    fn control(&mut self, actuator: Actuator) -> &mut ControlState<bool> {
        match actuator {
            Actuator::Pump => &mut self.pump,
            Actuator::Heater => &mut self.heater,
        }
    }
}

/// Optimistic client-side view of the device, reconciled against the service.
pub struct Reconciler<A> {
    api: A,
    options: ReconcilerOptions,
    inner: Mutex<Inner>,
    notifications: broadcast::Sender<Notification>,
}

impl<A> fmt::Debug for Reconciler<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<A: DeviceApi> Reconciler<A> {
    /// Create a reconciler showing both actuators off in hardware mode until
    /// the first poll.
    pub fn new(api: A, options: ReconcilerOptions) -> Self {
        let (notifications, _) = broadcast::channel(options.notification_capacity.max(1));
        Self {
            api,
            options,
            inner: Mutex::new(Inner {
                pump: ControlState::new(false),
                heater: ControlState::new(false),
                mode: ControlState::new(DeviceMode::default()),
                pending: HashMap::new(),
                readings: HashMap::new(),
            }),
            notifications,
        }
    }

    /// Subscribe to command outcome notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub fn options(&self) -> &ReconcilerOptions {
        &self.options
    }

    /// Displayed value of an actuator.
    pub async fn displayed(&self, actuator: Actuator) -> bool {
        self.inner.lock().await.control(actuator).displayed
    }

    pub async fn phase(&self, actuator: Actuator) -> ControlPhase {
        self.inner.lock().await.control(actuator).phase
    }

    /// The in-flight command for an actuator, if any.
    pub async fn pending(&self, actuator: Actuator) -> Option<PendingCommand> {
        self.inner.lock().await.pending.get(&actuator).copied()
    }

    /// Displayed device mode.
    pub async fn mode(&self) -> DeviceMode {
        self.inner.lock().await.mode.displayed
    }

    pub async fn mode_phase(&self) -> ControlPhase {
        self.inner.lock().await.mode.phase
    }

    /// Flip an actuator.
    pub async fn toggle(&self, actuator: Actuator) -> ToggleOutcome {
        self.command(actuator, None).await
    }

    /// Drive an actuator to `desired` through the same state machine.
    pub async fn set(&self, actuator: Actuator, desired: bool) -> ToggleOutcome {
        self.command(actuator, Some(desired)).await
    }

    async fn command(&self, actuator: Actuator, desired: Option<bool>) -> ToggleOutcome {
        let command = {
            let mut inner = self.inner.lock().await;
            let control = inner.control(actuator);
            if control.phase != ControlPhase::Idle {
                debug!(%actuator, phase = ?control.phase, "Ignoring toggle while busy");
                return ToggleOutcome::Ignored;
            }

            let prior = control.displayed;
            let mut command = PendingCommand::toggle(actuator, prior);
            if let Some(desired) = desired {
                command.desired_status = desired;
            }

            control.phase = ControlPhase::Pending;
            control.displayed = command.desired_status;
            control.epoch += 1;
            inner.pending.insert(actuator, command);
            command
        };

        let result = self
            .bounded("actuator command", self.api.set_actuator(actuator, command.desired_status))
            .await
            .and_then(|response| {
                if response.success {
                    Ok(response.message)
                } else {
                    Err(Error::Rejected(response.message.unwrap_or_else(|| {
                        format!("Service refused the {actuator} command")
                    })))
                }
            });

        let outcome = {
            let mut inner = self.inner.lock().await;
            inner.pending.remove(&actuator);
            let control = inner.control(actuator);
            match &result {
                Ok(_) => {
                    control.phase = ControlPhase::Confirmed;
                    ToggleOutcome::Confirmed
                }
                Err(_) => {
                    control.displayed = command.optimistic_prior_status;
                    control.phase = ControlPhase::RolledBack;
                    ToggleOutcome::RolledBack
                }
            }
        };

        let state = if command.desired_status { "on" } else { "off" };
        match result {
            Ok(message) => {
                info!(%actuator, state, "Command confirmed");
                self.notify(Notification {
                    control: Control::Actuator(actuator),
                    success: true,
                    message: message.unwrap_or_else(|| format!("{actuator} turned {state}")),
                });
            }
            Err(e) => {
                warn!(%actuator, state, error = %e, "Command failed, rolled back");
                self.notify(Notification {
                    control: Control::Actuator(actuator),
                    success: false,
                    message: e.to_string(),
                });
            }
        }

        self.settle(|inner| inner.control(actuator)).await;
        outcome
    }

    /// Switch the data source through the same state machine.
    ///
    /// Success drops every cached reading query, since the readings now come
    /// from a different source.
    pub async fn select_mode(&self, mode: DeviceMode) -> ToggleOutcome {
        let prior = {
            let mut inner = self.inner.lock().await;
            let control = &mut inner.mode;
            if control.phase != ControlPhase::Idle {
                debug!(phase = ?control.phase, "Ignoring mode change while busy");
                return ToggleOutcome::Ignored;
            }
            let prior = control.displayed;
            control.phase = ControlPhase::Pending;
            control.displayed = mode;
            control.epoch += 1;
            prior
        };

        let result = self
            .bounded("mode change", self.api.set_mode(mode))
            .await
            .and_then(|response| {
                if response.success {
                    Ok(response.message)
                } else {
                    Err(Error::Rejected(
                        response
                            .message
                            .unwrap_or_else(|| "Service refused the mode change".to_string()),
                    ))
                }
            });

        let outcome = {
            let mut inner = self.inner.lock().await;
            match &result {
                Ok(_) => {
                    inner.mode.phase = ControlPhase::Confirmed;
                    inner.readings.clear();
                    ToggleOutcome::Confirmed
                }
                Err(_) => {
                    inner.mode.displayed = prior;
                    inner.mode.phase = ControlPhase::RolledBack;
                    ToggleOutcome::RolledBack
                }
            }
        };

        match result {
            Ok(message) => {
                info!(%mode, "Mode change confirmed");
                self.notify(Notification {
                    control: Control::Mode,
                    success: true,
                    message: message.unwrap_or_else(|| format!("Switched to {mode} mode")),
                });
            }
            Err(e) => {
                warn!(%mode, error = %e, "Mode change failed, rolled back");
                self.notify(Notification {
                    control: Control::Mode,
                    success: false,
                    message: e.to_string(),
                });
            }
        }

        self.settle(|inner| &mut inner.mode).await;
        outcome
    }

    /// Newest readings, served from the local cache when possible.
    pub async fn latest_readings(&self, limit: u32) -> Result<Vec<ReadingRecord>> {
        if let Some(cached) = self.inner.lock().await.readings.get(&limit) {
            return Ok(cached.clone());
        }

        let readings = self
            .bounded("readings query", self.api.latest_readings(limit))
            .await?;
        self.inner
            .lock()
            .await
            .readings
            .insert(limit, readings.clone());
        Ok(readings)
    }

    /// Drop every cached reading query.
    pub async fn invalidate_readings(&self) {
        self.inner.lock().await.readings.clear();
    }

    /// Read the service once and correct every `Idle` control that disagrees.
    ///
    /// Returns the number of corrected controls.
    pub async fn poll_once(&self) -> Result<usize> {
        let epochs = {
            let inner = self.inner.lock().await;
            (inner.pump.epoch, inner.heater.epoch, inner.mode.epoch)
        };

        let status = self
            .bounded("status poll", self.api.device_status())
            .await?;
        let mode = match self.bounded("mode poll", self.api.emulator_status()).await {
            Ok(emulator) => Some(emulator.mode()),
            Err(e) => {
                debug!(error = %e, "Mode poll failed, keeping displayed mode");
                None
            }
        };

        let mut inner = self.inner.lock().await;
        let mut corrections = 0;

        for (actuator, epoch) in [(Actuator::Pump, epochs.0), (Actuator::Heater, epochs.1)] {
            let server = status.current().status(actuator);
            let control = inner.control(actuator);
            if control.phase == ControlPhase::Idle
                && control.epoch == epoch
                && control.displayed != server
            {
                debug!(%actuator, from = control.displayed, to = server, "Correcting displayed state");
                control.displayed = server;
                corrections += 1;
            }
        }

        if let Some(mode) = mode
            && inner.mode.phase == ControlPhase::Idle
            && inner.mode.epoch == epochs.2
            && inner.mode.displayed != mode
        {
            debug!(from = %inner.mode.displayed, to = %mode, "Correcting displayed mode");
            inner.mode.displayed = mode;
            corrections += 1;
        }

        Ok(corrections)
    }

    /// Start the background polling loop.
    ///
    /// The loop stops when the returned handle is dropped or stopped.
    pub fn start_polling(self: &Arc<Self>) -> PollingHandle
    where
        A: 'static,
    {
        let cancel_token = CancellationToken::new();
        let task_token = cancel_token.clone();
        let reconciler = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(reconciler.options.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut consecutive_failures: u32 = 0;

            loop {
                tokio::select! {
                    _ = task_token.cancelled() => {
                        debug!("Polling cancelled, stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        match reconciler.poll_once().await {
                            Ok(corrections) => {
                                if consecutive_failures > 0 {
                                    info!("Status poll recovered after {} failures", consecutive_failures);
                                }
                                consecutive_failures = 0;
                                if corrections > 0 {
                                    debug!(corrections, "Applied server corrections");
                                }
                            }
                            Err(e) => {
                                consecutive_failures += 1;
                                if consecutive_failures <= 3 {
                                    warn!("Status poll failed (attempt {}): {}", consecutive_failures, e);
                                } else if consecutive_failures == 4 {
                                    error!("Status poll keeps failing, further failures logged at debug: {}", e);
                                } else {
                                    debug!("Status poll failed (attempt {}): {}", consecutive_failures, e);
                                }
                            }
                        }
                    }
                }
            }
        });

        PollingHandle {
            cancel_token,
            handle,
        }
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = crate::service_client::Result<T>>,
    {
        match timeout(self.options.command_timeout, call).await {
            Ok(result) => result.map_err(Error::from),
            Err(_) => Err(Error::Timeout {
                operation,
                duration: self.options.command_timeout,
            }),
        }
    }

    async fn settle<T>(&self, control: impl Fn(&mut Inner) -> &mut ControlState<T>) {
        sleep(self.options.settle_delay).await;
        {
            let mut inner = self.inner.lock().await;
            control(&mut *inner).phase = ControlPhase::Idle;
        }
        if let Err(e) = self.poll_once().await {
            debug!(error = %e, "Post-settle reconciliation failed");
        }
    }

    fn notify(&self, notification: Notification) {
        // no subscribers is fine
        let _ = self.notifications.send(notification);
    }
}

/// Handle to a running polling loop. Dropping it stops the loop.
#[derive(Debug)]
pub struct PollingHandle {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl PollingHandle {
    /// Stop polling.
    pub fn stop(self) {
        self.cancel_token.cancel();
    }

    /// A token that stops this loop when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

impl Drop for PollingHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use proptest::prelude::*;
    use time::OffsetDateTime;

    use aquasync_types::{CommandResponse, DeviceStatusResponse, EmulatorStatus, StateSource};

    use crate::service_client::{self, ServiceClientError};

    /// Service whose state is fixed and whose commands always fail.
    struct FailingApi {
        pump: bool,
        heater: bool,
        reachable: AtomicBool,
    }

    #[async_trait]
    impl DeviceApi for FailingApi {
        async fn device_status(&self) -> service_client::Result<DeviceStatusResponse> {
            if !self.reachable.load(Ordering::Relaxed) {
                return Err(ServiceClientError::InvalidUrl("offline".to_string()));
            }
            Ok(DeviceStatusResponse {
                pump_status: self.pump,
                heater_status: self.heater,
                source: StateSource::Database,
                memory_state: None,
                database_state: None,
                timestamp: OffsetDateTime::UNIX_EPOCH,
            })
        }

        async fn set_actuator(&self, _: Actuator, _: bool) -> service_client::Result<CommandResponse> {
            Err(ServiceClientError::ApiError {
                status: 502,
                message: "Gateway failure".to_string(),
            })
        }

        async fn emulator_status(&self) -> service_client::Result<EmulatorStatus> {
            Ok(EmulatorStatus::default())
        }

        async fn set_mode(&self, _: DeviceMode) -> service_client::Result<CommandResponse> {
            Ok(CommandResponse::ok(None))
        }

        async fn latest_readings(&self, _: u32) -> service_client::Result<Vec<ReadingRecord>> {
            Ok(Vec::new())
        }
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap()
    }

    proptest! {
        /// A failed command always restores the value displayed before it,
        /// whatever that value was.
        #[test]
        fn failed_toggle_restores_prior(pump in any::<bool>(), heater in any::<bool>(), heater_first in any::<bool>()) {
            runtime().block_on(async {
                let api = FailingApi { pump, heater, reachable: AtomicBool::new(true) };
                let rec = Reconciler::new(api, ReconcilerOptions::default().settle_delay(Duration::from_millis(1)));
                rec.poll_once().await.unwrap();
                // no reconciliation after settle, so only the rollback is observed
                rec.api.reachable.store(false, Ordering::Relaxed);

                let order = if heater_first {
                    [Actuator::Heater, Actuator::Pump]
                } else {
                    [Actuator::Pump, Actuator::Heater]
                };
                for actuator in order {
                    let before = rec.displayed(actuator).await;
                    prop_assert_eq!(rec.toggle(actuator).await, ToggleOutcome::RolledBack);
                    prop_assert_eq!(rec.displayed(actuator).await, before);
                }
                prop_assert_eq!(rec.displayed(Actuator::Pump).await, pump);
                prop_assert_eq!(rec.displayed(Actuator::Heater).await, heater);
                Ok(())
            })?;
        }

        /// Repeated polls against a fixed server converge after one pass.
        #[test]
        fn polling_is_idempotent(pump in any::<bool>(), heater in any::<bool>()) {
            runtime().block_on(async {
                let api = FailingApi { pump, heater, reachable: AtomicBool::new(true) };
                let rec = Reconciler::new(api, ReconcilerOptions::default());
                rec.poll_once().await.unwrap();
                prop_assert_eq!(rec.poll_once().await.unwrap(), 0);
                prop_assert_eq!(rec.displayed(Actuator::Pump).await, pump);
                prop_assert_eq!(rec.displayed(Actuator::Heater).await, heater);
                Ok(())
            })?;
        }
    }
}
