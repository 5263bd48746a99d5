//! Background scheduling.
//!
//! Three loops share one [`CancellationToken`]:
//!
//! - the [`Collector`], when a telemetry channel is configured
//! - the cache sync loop, one reconciliation pass per `sync.interval_secs`
//! - the diagnostics loop, one full run per `diagnostics.interval_secs`

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::collector::Collector;
use crate::state::AppState;

/// Which loops to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSet {
    pub collector: bool,
    pub sync: bool,
    pub diagnostics: bool,
}

impl Default for TaskSet {
    fn default() -> Self {
        Self {
            collector: true,
            sync: true,
            diagnostics: true,
        }
    }
}

/// Handle to the running background loops. Dropping it cancels them.
pub struct BackgroundTasks {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    /// Spawn the selected loops.
    pub fn spawn(state: Arc<AppState>, set: TaskSet) -> Self {
        let cancel = CancellationToken::new();
        let mut handles = Vec::new();

        if set.collector {
            if state.config.telemetry.is_configured() {
                let collector = Collector::new(Arc::clone(&state));
                handles.push(tokio::spawn(collector.run(cancel.child_token())));
            } else {
                info!("No telemetry channel configured, collector disabled");
            }
        }

        if set.sync {
            handles.push(tokio::spawn(sync_loop(
                Arc::clone(&state),
                cancel.child_token(),
            )));
        }

        if set.diagnostics {
            handles.push(tokio::spawn(diagnostics_loop(
                Arc::clone(&state),
                cancel.child_token(),
            )));
        }

        Self { cancel, handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel every loop and wait for them to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for handle in self.handles.drain(..) {
            let _ = handle.await;
        }
        info!("Background tasks stopped");
    }
}

impl Drop for BackgroundTasks {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn sync_loop(state: Arc<AppState>, cancel: CancellationToken) {
    let mut ticker = ticker(state.config.sync.interval());
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let status = state.reconcile().await;
        debug!(
            pump = status.pump_status,
            heater = status.heater_status,
            source = %status.source,
            "Cache reconciled"
        );
    }
}

async fn diagnostics_loop(state: Arc<AppState>, cancel: CancellationToken) {
    let mut ticker = ticker(state.config.diagnostics.interval());
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        state.run_diagnostics().await;
    }
}
