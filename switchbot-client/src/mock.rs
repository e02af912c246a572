//! In-memory device client for tests.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::DeviceClient;
use crate::device::{Device, DeviceList, DeviceStatus, InfraredDevice};
use crate::error::{ClientError, Result};

/// API code used for injected failures.
const MOCK_FAILURE_CODE: i64 = 190;

/// Which client operation a [`CallRecord`] refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListDevices,
    Status(String),
}

/// Start and end of one client call.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub call: Call,
    pub started: Instant,
    pub finished: Instant,
}

impl CallRecord {
    /// Whether two calls were in flight at the same time.
    pub fn overlaps(&self, other: &CallRecord) -> bool {
        self.started < other.finished && other.started < self.finished
    }
}

#[derive(Debug, Default)]
struct MockState {
    inventory: DeviceList,
    statuses: HashMap<String, DeviceStatus>,
    list_failure: Option<String>,
    status_failures: HashSet<String>,
    latency: Option<Duration>,
    calls: Vec<CallRecord>,
}

/// A [`DeviceClient`] backed by in-memory fixtures.
///
/// Failures and latency can be injected; every call is recorded with its
/// start and end instants.
#[derive(Debug, Default)]
pub struct MockDeviceClient {
    state: Mutex<MockState>,
}

impl MockDeviceClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a physical device to the inventory.
    pub fn add_device(&self, device: Device) {
        self.state.lock().inventory.devices.push(device);
    }

    /// Add an infrared remote to the inventory.
    pub fn add_infrared(&self, device: InfraredDevice) {
        self.state.lock().inventory.infrared.push(device);
    }

    /// Replace the whole inventory.
    pub fn set_inventory(&self, inventory: DeviceList) {
        self.state.lock().inventory = inventory;
    }

    /// Set the status returned for `status.id`.
    pub fn set_status(&self, status: DeviceStatus) {
        self.state.lock().statuses.insert(status.id.clone(), status);
    }

    /// Make `list_devices` fail with the given message, or succeed again with `None`.
    pub fn fail_list(&self, message: Option<&str>) {
        self.state.lock().list_failure = message.map(str::to_string);
    }

    /// Make `status` fail for one device.
    pub fn fail_status(&self, device_id: &str) {
        self.state
            .lock()
            .status_failures
            .insert(device_id.to_string());
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().latency = Some(latency);
    }

    /// All recorded calls, in completion order.
    pub fn calls(&self) -> Vec<CallRecord> {
        self.state.lock().calls.clone()
    }

    /// Number of `list_devices` calls made so far.
    pub fn list_calls(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.call == Call::ListDevices)
            .count()
    }

    async fn simulate(&self, call: Call) {
        let started = Instant::now();
        let latency = self.state.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let finished = Instant::now();
        self.state.lock().calls.push(CallRecord {
            call,
            started,
            finished,
        });
    }
}

#[async_trait]
impl DeviceClient for MockDeviceClient {
    async fn list_devices(&self) -> Result<DeviceList> {
        self.simulate(Call::ListDevices).await;

        let state = self.state.lock();
        if let Some(message) = &state.list_failure {
            return Err(ClientError::Api {
                code: MOCK_FAILURE_CODE,
                message: message.clone(),
            });
        }
        Ok(state.inventory.clone())
    }

    async fn status(&self, device_id: &str) -> Result<DeviceStatus> {
        self.simulate(Call::Status(device_id.to_string())).await;

        let state = self.state.lock();
        if state.status_failures.contains(device_id) {
            return Err(ClientError::Api {
                code: MOCK_FAILURE_CODE,
                message: format!("status unavailable for {}", device_id),
            });
        }
        state.statuses.get(device_id).cloned().ok_or_else(|| ClientError::Api {
            code: 152,
            message: "device not found".to_string(),
        })
    }
}
