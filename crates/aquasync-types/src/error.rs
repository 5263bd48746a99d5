//! Error types for parsing aquasync identifiers.

use thiserror::Error;

/// Errors that can occur when parsing identifiers carried in URLs, config
/// files, or command-line arguments.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The name does not match any known actuator.
    #[error("Unknown actuator: {0} (expected 'pump' or 'heater')")]
    UnknownActuator(String),

    /// The name does not match any diagnostic check.
    #[error("Unknown diagnostic check: {0}")]
    UnknownDiagnosticKind(String),

    /// The name does not match any device mode.
    #[error("Unknown device mode: {0} (expected 'hardware' or 'emulator')")]
    UnknownDeviceMode(String),
}

/// Result type alias using aquasync-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
