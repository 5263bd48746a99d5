//! In-memory gateway and feed for testing.
//!
//! [`MockGateway`] implements [`CommandGateway`] and [`MockFeed`] implements
//! [`TelemetryFeed`], so service and reconciler logic can be exercised without
//! a telemetry service.
//!
//! # Features
//!
//! - **Failure injection**: fail every call, or only the next N calls
//! - **Refusal**: acknowledge with entry id `0` (accepted = false)
//! - **Latency simulation**: delay each call to exercise timeouts
//! - **Call recording**: inspect what was sent

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use aquasync_types::Actuator;

use crate::error::GatewayError;
use crate::feed::{FeedEntry, TelemetryFeed};
use crate::gateway::{CommandGateway, GatewayAck};

/// A scriptable [`CommandGateway`].
///
/// # Example
///
/// ```
/// use aquasync_core::{CommandGateway, MockGateway};
/// use aquasync_types::Actuator;
///
/// #[tokio::main]
/// async fn main() {
///     let gateway = MockGateway::new();
///     gateway.fail_next(1, 500, "Internal Server Error");
///
///     assert!(gateway.send(Actuator::Heater, true).await.is_err());
///     assert!(gateway.send(Actuator::Heater, true).await.unwrap().accepted);
///     assert_eq!(gateway.calls().len(), 2);
/// }
/// ```
#[derive(Debug, Default)]
pub struct MockGateway {
    should_fail: AtomicBool,
    refuse: AtomicBool,
    remaining_failures: AtomicU32,
    failure: Mutex<(u16, String)>,
    latency_ms: AtomicU64,
    next_entry_id: AtomicU64,
    calls: Mutex<Vec<(Actuator, bool)>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            failure: Mutex::new((500, "Mock failure".to_string())),
            next_entry_id: AtomicU64::new(1),
            ..Default::default()
        }
    }

    /// Fail every call with HTTP `status` and `body` until cleared.
    pub fn set_should_fail(&self, fail: bool, status: u16, body: &str) {
        self.set_failure(status, body);
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Fail the next `count` calls, then succeed.
    pub fn fail_next(&self, count: u32, status: u16, body: &str) {
        self.set_failure(status, body);
        self.remaining_failures.store(count, Ordering::Relaxed);
    }

    /// Acknowledge writes with entry id `0`.
    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::Relaxed);
    }

    /// Delay every call.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<(Actuator, bool)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn set_failure(&self, status: u16, body: &str) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = (status, body.to_string());
        }
    }

    fn injected_error(&self) -> GatewayError {
        let (status, body) = self
            .failure
            .lock()
            .map(|f| f.clone())
            .unwrap_or_else(|_| (500, "Mock failure".to_string()));
        GatewayError::Status { status, body }
    }
}

#[async_trait]
impl CommandGateway for MockGateway {
    async fn send(
        &self,
        actuator: Actuator,
        desired_status: bool,
    ) -> Result<GatewayAck, GatewayError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((actuator, desired_status));
        }

        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self
            .remaining_failures
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(self.injected_error());
        }

        if self.should_fail.load(Ordering::Relaxed) {
            return Err(self.injected_error());
        }

        if self.refuse.load(Ordering::Relaxed) {
            return Ok(GatewayAck {
                accepted: false,
                raw_message: "0".to_string(),
            });
        }

        let id = self.next_entry_id.fetch_add(1, Ordering::Relaxed);
        Ok(GatewayAck {
            accepted: true,
            raw_message: id.to_string(),
        })
    }
}

/// A scriptable [`TelemetryFeed`] holding at most one current entry.
#[derive(Debug, Default)]
pub struct MockFeed {
    entry: Mutex<Option<FeedEntry>>,
    should_fail: AtomicBool,
    fetch_count: AtomicU32,
}

impl MockFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entry returned by the next fetch.
    pub fn set_entry(&self, entry: Option<FeedEntry>) {
        if let Ok(mut current) = self.entry.lock() {
            *current = entry;
        }
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetch_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TelemetryFeed for MockFeed {
    async fn fetch_latest(&self) -> Result<Option<FeedEntry>, GatewayError> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(GatewayError::Status {
                status: 503,
                body: "Mock feed unavailable".to_string(),
            });
        }
        Ok(self.entry.lock().ok().and_then(|e| e.clone()))
    }
}
