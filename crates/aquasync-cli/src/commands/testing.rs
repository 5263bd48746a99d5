//! In-memory [`DeviceApi`] for command tests.

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use time::macros::datetime;

use aquasync_core::service_client::Result;
use aquasync_core::{DeviceApi, ServiceClientError};
use aquasync_types::{
    Actuator, CommandResponse, DeviceMode, DeviceStatusResponse, EmulatorStatus, ReadingRecord,
    StateSource,
};

/// Cloning shares the state, so a test can keep a handle after moving the
/// API into a reconciler.
#[derive(Debug, Clone, Default)]
pub struct FakeApi {
    state: Arc<FakeState>,
}

impl Deref for FakeApi {
    type Target = FakeState;

    fn deref(&self) -> &FakeState {
        &self.state
    }
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub pump: AtomicBool,
    pub heater: AtomicBool,
    pub emulator: AtomicBool,
    pub refuse: AtomicBool,
    pub unreachable: AtomicBool,
    pub commands: Mutex<Vec<(Actuator, bool)>>,
}

impl FakeApi {
    fn check_reachable(&self) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            Err(ServiceClientError::ApiError {
                status: 503,
                message: "service down".to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn response(&self, message: &str) -> CommandResponse {
        if self.refuse.load(Ordering::SeqCst) {
            CommandResponse::failed("Gateway refused the update")
        } else {
            CommandResponse::ok(Some(message.to_string()))
        }
    }
}

#[async_trait]
impl DeviceApi for FakeApi {
    async fn device_status(&self) -> Result<DeviceStatusResponse> {
        self.check_reachable()?;
        Ok(DeviceStatusResponse {
            pump_status: self.pump.load(Ordering::SeqCst),
            heater_status: self.heater.load(Ordering::SeqCst),
            source: StateSource::Memory,
            memory_state: None,
            database_state: None,
            timestamp: datetime!(2024-05-01 12:00 UTC),
        })
    }

    async fn set_actuator(&self, actuator: Actuator, status: bool) -> Result<CommandResponse> {
        self.check_reachable()?;
        self.commands.lock().unwrap().push((actuator, status));
        let response = self.response(&format!(
            "{actuator} turned {}",
            if status { "on" } else { "off" }
        ));
        if response.success {
            match actuator {
                Actuator::Pump => self.pump.store(status, Ordering::SeqCst),
                Actuator::Heater => self.heater.store(status, Ordering::SeqCst),
            }
        }
        Ok(response)
    }

    async fn emulator_status(&self) -> Result<EmulatorStatus> {
        self.check_reachable()?;
        Ok(EmulatorStatus {
            enabled: self.emulator.load(Ordering::SeqCst),
            config: None,
        })
    }

    async fn set_mode(&self, mode: DeviceMode) -> Result<CommandResponse> {
        self.check_reachable()?;
        let response = self.response(&format!("Switched to {mode} mode"));
        if response.success {
            self.emulator
                .store(mode == DeviceMode::Emulator, Ordering::SeqCst);
        }
        Ok(response)
    }

    async fn latest_readings(&self, _limit: u32) -> Result<Vec<ReadingRecord>> {
        self.check_reachable()?;
        Ok(Vec::new())
    }
}
