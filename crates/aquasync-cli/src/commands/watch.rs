//! Watch command implementation.
//!
//! Runs the reconciler's background poller and prints a line whenever the
//! displayed pump, heater, or mode value changes. Every printed change after
//! the first line is a correction the poller applied from the service.

use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use time::OffsetDateTime;
use tokio::time::{MissedTickBehavior, interval};

use aquasync_core::{DeviceApi, Reconciler};
use aquasync_types::{Actuator, DeviceMode};

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_watch_line};

/// Displayed control values at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchSnapshot {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub pump_status: bool,
    pub heater_status: bool,
    pub mode: DeviceMode,
}

impl WatchSnapshot {
    async fn capture<A: DeviceApi>(reconciler: &Reconciler<A>) -> Self {
        Self {
            timestamp: OffsetDateTime::now_utc(),
            pump_status: reconciler.displayed(Actuator::Pump).await,
            heater_status: reconciler.displayed(Actuator::Heater).await,
            mode: reconciler.mode().await,
        }
    }

    fn same_values(&self, other: &WatchSnapshot) -> bool {
        self.pump_status == other.pump_status
            && self.heater_status == other.heater_status
            && self.mode == other.mode
    }

    fn render(&self, format: OutputFormat, opts: &FormatOptions) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string(self)? + "\n"),
            OutputFormat::Text => Ok(format_watch_line(
                self.timestamp,
                self.pump_status,
                self.heater_status,
                self.mode,
                opts,
            )),
        }
    }
}

/// Follow the device until `stop` resolves.
///
/// Returns the number of lines written.
pub async fn cmd_watch<A, W, F>(
    reconciler: Arc<Reconciler<A>>,
    format: OutputFormat,
    opts: &FormatOptions,
    out: &mut W,
    stop: F,
) -> Result<usize>
where
    A: DeviceApi + 'static,
    W: Write,
    F: Future<Output = ()>,
{
    reconciler
        .poll_once()
        .await
        .context("Failed to read device status")?;

    let mut last = WatchSnapshot::capture(&reconciler).await;
    out.write_all(last.render(format, opts)?.as_bytes())?;
    out.flush()?;
    let mut lines = 1;

    let _polling = reconciler.start_polling();
    let mut ticker = interval(reconciler.options().poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = ticker.tick() => {}
        }

        let current = WatchSnapshot::capture(&reconciler).await;
        if !current.same_values(&last) {
            out.write_all(current.render(format, opts)?.as_bytes())?;
            out.flush()?;
            lines += 1;
            last = current;
        }
    }

    Ok(lines)
}
