//! Device mode command.

use anyhow::{Context, Result, bail};
use serde::Serialize;

use aquasync_core::{DeviceApi, Reconciler, ToggleOutcome};
use aquasync_types::DeviceMode;

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_notification};

#[derive(Debug, Serialize)]
struct ModeResult {
    mode: DeviceMode,
    changed: bool,
    message: String,
}

/// Switch between hardware and emulator data.
///
/// Selecting the mode that is already active sends nothing.
pub async fn cmd_mode<A: DeviceApi>(
    reconciler: &Reconciler<A>,
    mode: DeviceMode,
    format: OutputFormat,
    opts: &FormatOptions,
) -> Result<String> {
    reconciler
        .poll_once()
        .await
        .context("Failed to read device status")?;

    if reconciler.mode().await == mode {
        let message = format!("Already in {mode} mode");
        return match format {
            OutputFormat::Json => opts.as_json(&ModeResult {
                mode,
                changed: false,
                message,
            }),
            OutputFormat::Text => Ok(format!("{message}\n")),
        };
    }

    let mut notifications = reconciler.subscribe();
    let outcome = reconciler.select_mode(mode).await;
    let note = notifications
        .try_recv()
        .context("Mode change finished without a notification")?;

    match outcome {
        ToggleOutcome::Confirmed => {}
        ToggleOutcome::RolledBack => bail!("{}", note.message),
        ToggleOutcome::Ignored => bail!("Mode change already in flight"),
    }

    match format {
        OutputFormat::Json => opts.as_json(&ModeResult {
            mode,
            changed: true,
            message: note.message,
        }),
        OutputFormat::Text => Ok(format_notification(&note, opts)),
    }
}
