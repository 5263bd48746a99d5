//! Actuator command execution.
//!
//! A command goes out through the [`CommandGateway`] exactly once, bounded by
//! the configured request timeout. Only one command per actuator may be in
//! flight; pump and heater are independent. On acknowledgement the state
//! cache is updated; nothing is written to the store here, the collector
//! picks the new state up from the telemetry feed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::{
    Json, extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse,
};
use tokio::time::timeout;
use tracing::{info, warn};

use aquasync_core::{CommandGateway, GatewayError};
use aquasync_types::{Actuator, CommandResponse, DeviceState};

use crate::cache::StateCache;

/// Per-actuator in-flight flags.
#[derive(Debug, Default)]
pub struct CommandGuard {
    pump: AtomicBool,
    heater: AtomicBool,
}

/// Held while a command for one actuator is in flight.
#[derive(Debug)]
pub struct CommandPermit<'a> {
    flag: &'a AtomicBool,
}

impl Drop for CommandPermit<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl CommandGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn flag(&self, actuator: Actuator) -> &AtomicBool {
        match actuator {
            Actuator::Pump => &self.pump,
            Actuator::Heater => &self.heater,
        }
    }

    /// Claim `actuator`, or `None` if a command for it is already in flight.
    pub fn try_acquire(&self, actuator: Actuator) -> Option<CommandPermit<'_>> {
        let flag = self.flag(actuator);
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CommandPermit { flag })
    }

    pub fn is_busy(&self, actuator: Actuator) -> bool {
        self.flag(actuator).load(Ordering::Acquire)
    }
}

/// Why a command did not take effect.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    InvalidBody(#[from] JsonRejection),

    #[error("A {0} command is already in progress")]
    InFlight(Actuator),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Telemetry service rejected the update (response: {0})")]
    Refused(String),

    #[error("Telemetry service did not respond within {0:?}")]
    Timeout(Duration),
}

impl CommandError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CommandError::InvalidBody(rejection) => rejection.status(),
            CommandError::InFlight(_) => StatusCode::CONFLICT,
            CommandError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            CommandError::Gateway(GatewayError::NotConfigured(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            CommandError::Gateway(_) | CommandError::Refused(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for CommandError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        (status, Json(CommandResponse::failed(self.to_string()))).into_response()
    }
}

/// Send one actuator command and record the acknowledgement.
pub async fn execute(
    gateway: &dyn CommandGateway,
    guard: &CommandGuard,
    cache: &StateCache,
    request_timeout: Duration,
    actuator: Actuator,
    status: bool,
) -> Result<DeviceState, CommandError> {
    let _permit = guard
        .try_acquire(actuator)
        .ok_or(CommandError::InFlight(actuator))?;

    let result = timeout(request_timeout, gateway.send(actuator, status)).await;

    let ack = match result {
        Err(_) => {
            warn!(%actuator, status, "gateway call timed out after {request_timeout:?}");
            return Err(CommandError::Timeout(request_timeout));
        }
        Ok(Err(e)) => {
            warn!(%actuator, status, "gateway call failed: {e}");
            return Err(e.into());
        }
        Ok(Ok(ack)) => ack,
    };

    if !ack.accepted {
        warn!(%actuator, status, raw = %ack.raw_message, "gateway refused the update");
        return Err(CommandError::Refused(ack.raw_message));
    }

    let state = cache.apply_from_gateway(actuator, status).await;
    info!(%actuator, status, entry = %ack.raw_message, "command acknowledged");
    Ok(state)
}

/// Human-readable confirmation, e.g. "Pump turned on".
pub fn confirmation(actuator: Actuator, status: bool) -> String {
    let name = match actuator {
        Actuator::Pump => "Pump",
        Actuator::Heater => "Heater",
    };
    format!("{name} turned {}", if status { "on" } else { "off" })
}
