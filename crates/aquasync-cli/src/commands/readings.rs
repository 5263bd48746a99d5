//! Readings command implementation.

use anyhow::{Context, Result};

use aquasync_core::ServiceClient;

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_readings_text};

pub async fn cmd_readings(
    client: &ServiceClient,
    limit: u32,
    format: OutputFormat,
    opts: &FormatOptions,
) -> Result<String> {
    let readings = client
        .latest_readings(limit)
        .await
        .context("Failed to fetch readings")?;

    match format {
        OutputFormat::Json => opts.as_json(&readings),
        OutputFormat::Text => Ok(format_readings_text(&readings)),
    }
}
