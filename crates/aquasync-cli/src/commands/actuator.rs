//! Pump and heater commands.

use anyhow::{Context, Result, bail};
use serde::Serialize;

use aquasync_core::{DeviceApi, Reconciler, ToggleOutcome};
use aquasync_types::Actuator;

use crate::cli::{OutputFormat, Switch};
use crate::format::{FormatOptions, format_notification};

#[derive(Debug, Serialize)]
struct ActuatorResult {
    actuator: Actuator,
    status: bool,
    success: bool,
    message: String,
}

/// Drive an actuator through the reconciler and report the outcome.
///
/// The reconciler is synced with the service first so `toggle` flips the
/// real state rather than the boot default. A rolled-back command is an
/// error.
pub async fn cmd_actuator<A: DeviceApi>(
    reconciler: &Reconciler<A>,
    actuator: Actuator,
    switch: Switch,
    format: OutputFormat,
    opts: &FormatOptions,
) -> Result<String> {
    reconciler
        .poll_once()
        .await
        .context("Failed to read device status")?;

    let mut notifications = reconciler.subscribe();
    let outcome = match switch.target() {
        Some(desired) => reconciler.set(actuator, desired).await,
        None => reconciler.toggle(actuator).await,
    };

    let note = notifications
        .try_recv()
        .context("Command finished without a notification")?;
    let status = reconciler.displayed(actuator).await;

    match outcome {
        ToggleOutcome::Confirmed => {}
        ToggleOutcome::RolledBack => bail!("{}", note.message),
        ToggleOutcome::Ignored => bail!("{actuator} command already in flight"),
    }

    match format {
        OutputFormat::Json => opts.as_json(&ActuatorResult {
            actuator,
            status,
            success: note.success,
            message: note.message,
        }),
        OutputFormat::Text => Ok(format_notification(&note, opts)),
    }
}
