//! Status command implementation.

use anyhow::{Context, Result};

use aquasync_core::ServiceClient;

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_status_text};

pub async fn cmd_status(
    client: &ServiceClient,
    format: OutputFormat,
    opts: &FormatOptions,
) -> Result<String> {
    let status = client
        .device_status()
        .await
        .context("Failed to read device status")?;

    match format {
        OutputFormat::Json => opts.as_json(&status),
        OutputFormat::Text => Ok(format_status_text(&status, opts)),
    }
}
