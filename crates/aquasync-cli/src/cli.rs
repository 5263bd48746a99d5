//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};

use aquasync_types::{DeviceMode, DiagnosticKind};

/// Default service URL.
pub const DEFAULT_URL: &str = "http://localhost:5000";

#[derive(Debug, Parser)]
#[command(name = "aquasync")]
#[command(author, version, about = "Control and audit the aquasync pump/heater service", long_about = None)]
pub struct Cli {
    /// Service base URL
    #[arg(short, long, global = true, env = "AQUASYNC_URL", default_value = DEFAULT_URL)]
    pub url: String,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Seconds to wait for each service call
    #[arg(short = 'T', long, global = true, default_value = "5")]
    pub timeout: u64,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Requested actuator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
    Toggle,
}

impl Switch {
    /// The explicit target, or `None` for a toggle.
    pub fn target(self) -> Option<bool> {
        match self {
            Switch::On => Some(true),
            Switch::Off => Some(false),
            Switch::Toggle => None,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the reconciled pump and heater state
    Status,

    /// Switch the pump
    Pump {
        #[arg(value_enum)]
        state: Switch,
    },

    /// Switch the heater
    Heater {
        #[arg(value_enum)]
        state: Switch,
    },

    /// Select the data source (hardware or emulator)
    Mode {
        #[arg(value_parser = parse_mode)]
        mode: DeviceMode,
    },

    /// Show the latest diagnostic report
    Diagnostics {
        /// Run every check now instead of showing the stored report
        #[arg(long, conflicts_with = "check")]
        run: bool,

        /// Run a single check now
        #[arg(long, value_parser = parse_kind)]
        check: Option<DiagnosticKind>,
    },

    /// Show the newest stored readings
    Readings {
        /// Number of readings
        #[arg(short = 'n', long, default_value = "10")]
        limit: u32,
    },

    /// Follow the device state and print every change
    Watch {
        /// Seconds between status polls
        #[arg(short, long, default_value = "5")]
        interval: u64,
    },
}

fn parse_mode(s: &str) -> Result<DeviceMode, String> {
    s.parse().map_err(|e: aquasync_types::ParseError| e.to_string())
}

fn parse_kind(s: &str) -> Result<DiagnosticKind, String> {
    s.parse().map_err(|e: aquasync_types::ParseError| e.to_string())
}
