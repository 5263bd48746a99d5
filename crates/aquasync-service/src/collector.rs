//! Telemetry ingestion.
//!
//! Reads the newest channel entry on a fixed interval and appends it to the
//! store when it is newer than what is already there.

use std::sync::Arc;

use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use aquasync_core::GatewayError;
use aquasync_types::ReadingRecord;

use crate::state::AppState;

/// What one collection attempt did.
#[derive(Debug, Clone, PartialEq)]
pub enum Collected {
    /// A new reading was stored.
    Stored(ReadingRecord),
    /// The newest entry is already stored.
    Unchanged,
    /// The channel has no entries.
    Empty,
}

/// Collector errors.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Failed to fetch feed: {0}")]
    Fetch(#[from] GatewayError),
    #[error("Failed to store reading: {0}")]
    Store(#[from] aquasync_store::Error),
}

/// Background collector polling the telemetry feed.
pub struct Collector {
    state: Arc<AppState>,
}

impl Collector {
    /// Create a new collector.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Fetch the newest entry once and store it if it is new.
    ///
    /// Actuator fields the entry leaves empty are carried forward from the
    /// newest stored reading.
    pub async fn collect_once(&self) -> Result<Collected, CollectorError> {
        let Some(entry) = self.state.feed.fetch_latest().await? else {
            return Ok(Collected::Empty);
        };

        let store = self.state.store.lock().await;
        let previous = store.latest_reading()?;

        if let Some(prev) = &previous
            && entry.created_at <= prev.timestamp
        {
            return Ok(Collected::Unchanged);
        }

        let reading = entry.to_reading(&self.state.config.telemetry.fields, previous.as_ref());
        store.insert_reading(&reading)?;
        Ok(Collected::Stored(reading))
    }

    /// Poll until `cancel` fires.
    ///
    /// Failures are retried on the next tick. The first three consecutive
    /// failures log a warning, the fourth an error, later ones only at debug.
    pub async fn run(self, cancel: CancellationToken) {
        let poll_interval = self.state.config.telemetry.poll_interval();
        info!(
            "Starting collector for channel {} (interval: {}s)",
            self.state.config.telemetry.channel_id,
            poll_interval.as_secs()
        );

        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut consecutive_failures = 0u32;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Collector stopped");
                    break;
                }
                _ = ticker.tick() => {}
            }

            match self.collect_once().await {
                Ok(outcome) => {
                    if consecutive_failures > 0 {
                        info!("Feed reachable again after {consecutive_failures} failure(s)");
                    }
                    consecutive_failures = 0;
                    match outcome {
                        Collected::Stored(reading) => debug!(
                            pump = reading.pump_status,
                            heater = reading.heater_status,
                            "Stored reading captured at {}",
                            reading.timestamp
                        ),
                        Collected::Unchanged => debug!("No new feed entry"),
                        Collected::Empty => debug!("Feed has no entries yet"),
                    }
                }
                Err(e) => {
                    consecutive_failures += 1;
                    if consecutive_failures <= 3 {
                        warn!("Collection failed: {} (attempt {})", e, consecutive_failures);
                    } else if consecutive_failures == 4 {
                        error!(
                            "Collection failed {} times in a row, will continue trying silently",
                            consecutive_failures
                        );
                    } else {
                        debug!("Collection failed: {} (attempt {})", e, consecutive_failures);
                    }
                }
            }
        }
    }
}
