//! Prometheus HTTP service discovery document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use switchbot_client::{Device, DeviceType};
use tracing::debug;

/// Labels attached to a discovered target.
pub type LabelSet = BTreeMap<String, String>;

/// One entry of the HTTP SD response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticConfig {
    pub targets: Vec<String>,
    pub labels: LabelSet,
}

impl StaticConfig {
    /// Build the entry for one device.
    pub fn for_device(device: &Device) -> Self {
        let mut labels = LabelSet::new();
        labels.insert("device_id".to_string(), device.id.clone());
        labels.insert("device_name".to_string(), device.name.clone());
        labels.insert(
            "device_type".to_string(),
            device.device_type.as_str().to_string(),
        );

        Self {
            targets: vec![device.id.clone()],
            labels,
        }
    }
}

/// Whether devices of this type are offered as scrape targets.
pub fn is_supported(device_type: &DeviceType) -> bool {
    matches!(
        device_type,
        DeviceType::Meter
            | DeviceType::MeterPlus
            | DeviceType::MeterPro
            | DeviceType::MeterProCo2
            | DeviceType::WoIoSensor
            | DeviceType::Hub2
            | DeviceType::Humidifier
            | DeviceType::PlugMiniJp
            | DeviceType::PlugMiniUs
    )
}

/// Build the discovery document for a physical device inventory.
pub fn discover(devices: &[Device]) -> Vec<StaticConfig> {
    devices
        .iter()
        .filter(|device| {
            let supported = is_supported(&device.device_type);
            if !supported {
                debug!(
                    device_id = %device.id,
                    device_type = %device.device_type,
                    "Skipping unsupported device"
                );
            }
            supported
        })
        .map(StaticConfig::for_device)
        .collect()
}
