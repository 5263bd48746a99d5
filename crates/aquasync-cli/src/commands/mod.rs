//! Command implementations for the CLI.
//!
//! Each command returns its rendered output so `main` decides where it goes;
//! only `watch` streams directly to stdout.

mod actuator;
mod diagnostics;
mod mode;
mod readings;
mod status;
mod watch;

pub use actuator::cmd_actuator;
pub use diagnostics::{DiagnosticsAction, cmd_diagnostics};
pub use mode::cmd_mode;
pub use readings::cmd_readings;
pub use status::cmd_status;
pub use watch::cmd_watch;

#[cfg(test)]
pub(crate) mod testing;
