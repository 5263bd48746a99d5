//! In-memory snapshot of the best-known device state.
//!
//! The cache holds three values:
//!
//! - **current**: what `GET /api/device/status` reports
//! - **memory**: the last gateway acknowledgement (or the unconfirmed boot
//!   state)
//! - **database**: the last state read back from the store, if any
//!
//! Reading never touches the network or the store. Writers are the command
//! path ([`StateCache::apply_from_gateway`]) and reconciliation passes
//! ([`StateCache::apply_from_store`], [`StateCache::reconcile`]).

use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::debug;

use aquasync_types::{Actuator, DeviceState, DeviceStatusResponse, ReadingRecord, StateSource};

/// All three cached values at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSnapshot {
    pub current: DeviceState,
    pub memory: DeviceState,
    pub database: Option<DeviceState>,
}

impl CacheSnapshot {
    /// Body of `GET /api/device/status`.
    pub fn to_response(&self) -> DeviceStatusResponse {
        DeviceStatusResponse {
            pump_status: self.current.pump_status,
            heater_status: self.current.heater_status,
            source: self.current.source,
            memory_state: Some(self.memory),
            database_state: self.database,
            timestamp: self.current.timestamp,
        }
    }
}

#[derive(Debug)]
struct Slots {
    current: DeviceState,
    memory: DeviceState,
    database: Option<DeviceState>,
}

/// Server-side cache of the actuator state.
#[derive(Debug)]
pub struct StateCache {
    slots: RwLock<Slots>,
}

impl Default for StateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StateCache {
    /// A cache holding only the unconfirmed boot state.
    pub fn new() -> Self {
        let boot = DeviceState::unconfirmed();
        Self {
            slots: RwLock::new(Slots {
                current: boot,
                memory: boot,
                database: None,
            }),
        }
    }

    /// The state currently reported to clients.
    pub async fn read(&self) -> DeviceState {
        self.slots.read().await.current
    }

    pub async fn snapshot(&self) -> CacheSnapshot {
        let slots = self.slots.read().await;
        CacheSnapshot {
            current: slots.current,
            memory: slots.memory,
            database: slots.database,
        }
    }

    /// Record a gateway acknowledgement for `actuator`.
    ///
    /// The other actuator keeps its currently reported value.
    pub async fn apply_from_gateway(&self, actuator: Actuator, status: bool) -> DeviceState {
        self.apply_from_gateway_at(actuator, status, OffsetDateTime::now_utc())
            .await
    }

    pub(crate) async fn apply_from_gateway_at(
        &self,
        actuator: Actuator,
        status: bool,
        at: OffsetDateTime,
    ) -> DeviceState {
        let mut slots = self.slots.write().await;
        let next = slots.current.acknowledged(actuator, status, at);
        slots.memory = next;
        slots.current = next;
        debug!(%actuator, status, "cache updated from gateway");
        next
    }

    /// Offer a persisted reading to the cache.
    ///
    /// The database value always replaces the cached database slot. It
    /// becomes the reported state when it is not older than the last gateway
    /// acknowledgement; otherwise the acknowledgement stands.
    pub async fn apply_from_store(&self, record: &ReadingRecord) -> DeviceState {
        let candidate = DeviceState::from_reading(record);
        let mut slots = self.slots.write().await;
        slots.database = Some(candidate);

        if candidate.timestamp >= slots.memory.timestamp {
            if !slots.current.same_actuators(&candidate) {
                debug!(
                    pump = candidate.pump_status,
                    heater = candidate.heater_status,
                    "database state replaces cached state"
                );
            }
            slots.current = candidate;
        } else {
            slots.current = slots.memory;
        }
        slots.current
    }

    /// One reconciliation pass.
    ///
    /// `latest` is the newest persisted reading, or `None` when the store
    /// read failed or returned nothing; the cached value is then kept.
    pub async fn reconcile(&self, latest: Option<&ReadingRecord>) -> DeviceState {
        match latest {
            Some(record) => self.apply_from_store(record).await,
            None => self.read().await,
        }
    }

    /// Whether the reported state has never been confirmed by anything.
    pub async fn is_unconfirmed(&self) -> bool {
        let slots = self.slots.read().await;
        slots.current.source == StateSource::Memory
            && slots.current.timestamp == OffsetDateTime::UNIX_EPOCH
    }
}
