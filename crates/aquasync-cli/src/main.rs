//! Command-line control surface for the aquasync service.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `status` | Reconciled pump/heater state with both candidates |
//! | `pump <on\|off\|toggle>` | Switch the pump |
//! | `heater <on\|off\|toggle>` | Switch the heater |
//! | `mode <hardware\|emulator>` | Select the data source |
//! | `diagnostics [--run] [--check KIND]` | Show or run the self-checks |
//! | `readings [-n N]` | Newest stored readings |
//! | `watch [--interval S]` | Follow the device and print corrections |

mod cli;
mod commands;
mod format;

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use aquasync_core::{Reconciler, ReconcilerOptions, ServiceClient};
use aquasync_types::Actuator;

use crate::cli::{Cli, Commands};
use crate::commands::{
    DiagnosticsAction, cmd_actuator, cmd_diagnostics, cmd_mode, cmd_readings, cmd_status,
    cmd_watch,
};
use crate::format::FormatOptions;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("aquasync=debug,aquasync_core=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let opts = FormatOptions::new(cli.no_color);
    let client = ServiceClient::new(&cli.url)?;
    let options = ReconcilerOptions::new().command_timeout(Duration::from_secs(cli.timeout));
    options.validate()?;
    tracing::debug!("Using service at {}", client.base_url());

    let content = match cli.command {
        Commands::Status => cmd_status(&client, cli.format, &opts).await?,
        Commands::Pump { state } => {
            let reconciler = Reconciler::new(client, options);
            cmd_actuator(&reconciler, Actuator::Pump, state, cli.format, &opts).await?
        }
        Commands::Heater { state } => {
            let reconciler = Reconciler::new(client, options);
            cmd_actuator(&reconciler, Actuator::Heater, state, cli.format, &opts).await?
        }
        Commands::Mode { mode } => {
            let reconciler = Reconciler::new(client, options);
            cmd_mode(&reconciler, mode, cli.format, &opts).await?
        }
        Commands::Diagnostics { run, check } => {
            let action = DiagnosticsAction::from_flags(run, check);
            let (content, passed) = cmd_diagnostics(&client, action, cli.format, &opts).await?;
            print!("{content}");
            if !passed {
                std::process::exit(1);
            }
            return Ok(());
        }
        Commands::Readings { limit } => cmd_readings(&client, limit, cli.format, &opts).await?,
        Commands::Watch { interval } => {
            let options = options.poll_interval(Duration::from_secs(interval));
            options.validate()?;
            let reconciler = Arc::new(Reconciler::new(client, options));
            let stop = async {
                let _ = tokio::signal::ctrl_c().await;
            };
            let lines = cmd_watch(reconciler, cli.format, &opts, &mut io::stdout(), stop).await?;
            tracing::debug!("Watch stopped after {lines} line(s)");
            return Ok(());
        }
    };

    let mut stdout = io::stdout();
    stdout.write_all(content.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
