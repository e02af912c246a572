//! SwitchBot cloud API client.
//!
//! This crate provides the typed data model and transport used by the exporter:
//!
//! - [`device`] - Device inventory and status types (`Device`, `DeviceStatus`, `DeviceType`)
//! - [`auth`] - Request signing with the open token / secret key pair
//! - [`http`] - [`SwitchBotClient`], the reqwest-backed API client
//! - [`error`] - Error types
//! - `mock` - In-memory [`DeviceClient`] for tests (feature `mock`)

pub mod auth;
pub mod device;
pub mod error;
pub mod http;
#[cfg(feature = "mock")]
pub mod mock;

use async_trait::async_trait;

pub use auth::{Credentials, SignedHeaders};
pub use device::{Device, DeviceList, DeviceStatus, DeviceType, InfraredDevice};
pub use error::{ClientError, Result};
pub use http::{DEFAULT_BASE_URL, SwitchBotClient};

/// Source of device inventory and device status readings.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Fetch the full inventory: physical devices and infrared remotes.
    async fn list_devices(&self) -> Result<DeviceList>;

    /// Fetch the current status of one device.
    async fn status(&self, device_id: &str) -> Result<DeviceStatus>;
}
