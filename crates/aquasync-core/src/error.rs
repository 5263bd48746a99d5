//! Error types for aquasync-core.
//!
//! Gateway failures ([`GatewayError`]) and service API failures
//! ([`ServiceClientError`](crate::service_client::ServiceClientError)) live
//! next to their clients. This module holds the crate-level [`Error`] that
//! the reconciler reports, which wraps both.
//!
//! None of these errors is fatal. The reconciler turns every failure into a
//! rollback plus a [`Notification`](crate::reconciler::Notification) and keeps
//! polling.

use std::time::Duration;

use thiserror::Error;

use crate::service_client::ServiceClientError;

/// Errors raised by the reconciler and its options.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The call did not complete within the caller-side bound.
    #[error("{operation} timed out after {duration:?}")]
    Timeout {
        operation: &'static str,
        duration: Duration,
    },

    /// The service answered but reported failure.
    #[error("{0}")]
    Rejected(String),

    /// The service could not be reached or returned an error status.
    #[error(transparent)]
    Service(#[from] ServiceClientError),

    /// Options failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias using aquasync-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from the remote command gateway and telemetry feed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// The telemetry service could not be reached.
    #[error("Telemetry service not reachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// The telemetry service returned a non-success status.
    #[error("Telemetry service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be interpreted.
    #[error("Malformed response from telemetry service: {0}")]
    Malformed(String),

    /// Credentials or channel are missing.
    #[error("Telemetry service not configured: {0}")]
    NotConfigured(String),
}

impl GatewayError {
    /// Raw diagnostic text suitable for surfacing to an operator.
    pub fn raw_message(&self) -> String {
        match self {
            GatewayError::Transport(e) => e.to_string(),
            GatewayError::Status { status, body } if body.trim().is_empty() => {
                format!("HTTP {status}")
            }
            GatewayError::Status { body, .. } => body.clone(),
            GatewayError::Malformed(msg) | GatewayError::NotConfigured(msg) => msg.clone(),
        }
    }
}
