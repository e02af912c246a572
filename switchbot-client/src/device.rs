//! Device inventory and status data model.

use serde::{Deserialize, Serialize};

/// A physical SwitchBot device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Stable device identifier.
    #[serde(rename = "deviceId")]
    pub id: String,

    /// User-assigned display name.
    #[serde(rename = "deviceName", default)]
    pub name: String,

    /// Physical device type.
    #[serde(default)]
    pub device_type: DeviceType,

    /// Hub this device is paired with, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hub_device_id: Option<String>,

    /// Whether cloud service is enabled for this device.
    #[serde(default)]
    pub enable_cloud_service: bool,
}

impl Device {
    /// Create a device with the given identity.
    pub fn new(id: impl Into<String>, name: impl Into<String>, device_type: DeviceType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            device_type,
            hub_device_id: None,
            enable_cloud_service: true,
        }
    }
}

/// A virtual device controlled through an infrared remote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfraredDevice {
    #[serde(rename = "deviceId")]
    pub id: String,

    #[serde(rename = "deviceName", default)]
    pub name: String,

    /// Remote type, e.g. "Air Conditioner" or "TV".
    #[serde(default)]
    pub remote_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hub_device_id: Option<String>,
}

impl InfraredDevice {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        remote_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            remote_type: remote_type.into(),
            hub_device_id: None,
        }
    }
}

/// Full device inventory as returned by the device list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceList {
    #[serde(rename = "deviceList", default)]
    pub devices: Vec<Device>,

    #[serde(rename = "infraredRemoteList", default)]
    pub infrared: Vec<InfraredDevice>,
}

/// Point-in-time status reading for one device.
///
/// Only the fields relevant to `device_type` are populated upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    #[serde(rename = "deviceId")]
    pub id: String,

    #[serde(default)]
    pub device_type: DeviceType,

    /// Relative humidity in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<i64>,

    /// Temperature in degrees Celsius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// CO2 concentration in ppm.
    #[serde(rename = "CO2", default, skip_serializing_if = "Option::is_none")]
    pub co2: Option<i64>,

    /// Power consumption in watts (reported as "weight" by plugs).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub electric_current: Option<f64>,
}

impl DeviceStatus {
    /// Create an empty status for a device.
    pub fn new(id: impl Into<String>, device_type: DeviceType) -> Self {
        Self {
            id: id.into(),
            device_type,
            ..Default::default()
        }
    }
}

/// Physical device type.
///
/// Types not known to this crate are preserved verbatim in [`DeviceType::Other`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceType {
    Hub,
    HubPlus,
    HubMini,
    Hub2,
    Bot,
    Curtain,
    Plug,
    Meter,
    MeterPlus,
    MeterPro,
    MeterProCo2,
    WoIoSensor,
    Humidifier,
    PlugMiniUs,
    PlugMiniJp,
    MotionSensor,
    ContactSensor,
    ColorBulb,
    StripLight,
    SmartLock,
    Keypad,
    KeypadTouch,
    RobotVacuumCleanerS1,
    CeilingLight,
    BlindTilt,
    Other(String),
    #[default]
    Unknown,
}

static KNOWN_TYPES: &[(DeviceType, &str)] = &[
    (DeviceType::Hub, "Hub"),
    (DeviceType::HubPlus, "Hub Plus"),
    (DeviceType::HubMini, "Hub Mini"),
    (DeviceType::Hub2, "Hub 2"),
    (DeviceType::Bot, "Bot"),
    (DeviceType::Curtain, "Curtain"),
    (DeviceType::Plug, "Plug"),
    (DeviceType::Meter, "Meter"),
    (DeviceType::MeterPlus, "MeterPlus"),
    (DeviceType::MeterPro, "MeterPro"),
    (DeviceType::MeterProCo2, "MeterPro(CO2)"),
    (DeviceType::WoIoSensor, "WoIOSensor"),
    (DeviceType::Humidifier, "Humidifier"),
    (DeviceType::PlugMiniUs, "Plug Mini (US)"),
    (DeviceType::PlugMiniJp, "Plug Mini (JP)"),
    (DeviceType::MotionSensor, "Motion Sensor"),
    (DeviceType::ContactSensor, "Contact Sensor"),
    (DeviceType::ColorBulb, "Color Bulb"),
    (DeviceType::StripLight, "Strip Light"),
    (DeviceType::SmartLock, "Smart Lock"),
    (DeviceType::Keypad, "Keypad"),
    (DeviceType::KeypadTouch, "Keypad Touch"),
    (DeviceType::RobotVacuumCleanerS1, "Robot Vacuum Cleaner S1"),
    (DeviceType::CeilingLight, "Ceiling Light"),
    (DeviceType::BlindTilt, "Blind Tilt"),
];

impl DeviceType {
    /// The type string used by the SwitchBot API.
    pub fn as_str(&self) -> &str {
        match self {
            DeviceType::Other(s) => s.as_str(),
            DeviceType::Unknown => "",
            known => KNOWN_TYPES
                .iter()
                .find(|(t, _)| t == known)
                .map(|(_, s)| *s)
                .unwrap_or_default(),
        }
    }
}

impl From<&str> for DeviceType {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            return DeviceType::Unknown;
        }
        KNOWN_TYPES
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(t, _)| t.clone())
            .unwrap_or_else(|| DeviceType::Other(s.to_string()))
    }
}

impl From<String> for DeviceType {
    fn from(s: String) -> Self {
        DeviceType::from(s.as_str())
    }
}

impl From<DeviceType> for String {
    fn from(t: DeviceType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_type_from_api_string() {
        assert_eq!(DeviceType::from("Meter"), DeviceType::Meter);
        assert_eq!(DeviceType::from("Hub 2"), DeviceType::Hub2);
        assert_eq!(DeviceType::from("MeterPro(CO2)"), DeviceType::MeterProCo2);
        assert_eq!(DeviceType::from("Plug Mini (JP)"), DeviceType::PlugMiniJp);
        assert_eq!(DeviceType::from(""), DeviceType::Unknown);
    }

    #[test]
    fn test_unrecognized_device_type_is_preserved() {
        let t = DeviceType::from("Battery Circulator Fan");
        assert_eq!(t, DeviceType::Other("Battery Circulator Fan".to_string()));
        assert_eq!(t.as_str(), "Battery Circulator Fan");
    }

    #[test]
    fn test_device_type_as_str_matches_lookup() {
        for (t, name) in KNOWN_TYPES {
            assert_eq!(t.as_str(), *name);
            assert_eq!(&DeviceType::from(*name), t);
        }
    }

    #[test]
    fn test_parse_device_list() {
        let json = r#"{
            "deviceList": [
                {
                    "deviceId": "C271111EC0AB",
                    "deviceName": "Living Room Meter",
                    "deviceType": "Meter",
                    "enableCloudService": true,
                    "hubDeviceId": "E2F6032048AB"
                },
                {
                    "deviceId": "6055F92FCFD2",
                    "deviceName": "Desk Plug",
                    "deviceType": "Plug Mini (JP)",
                    "enableCloudService": true,
                    "hubDeviceId": ""
                }
            ],
            "infraredRemoteList": [
                {
                    "deviceId": "02-202008110034-13",
                    "deviceName": "Air Conditioner",
                    "remoteType": "Air Conditioner",
                    "hubDeviceId": "E2F6032048AB"
                }
            ]
        }"#;

        let list: DeviceList = serde_json::from_str(json).unwrap();
        assert_eq!(list.devices.len(), 2);
        assert_eq!(list.devices[0].id, "C271111EC0AB");
        assert_eq!(list.devices[0].device_type, DeviceType::Meter);
        assert_eq!(list.devices[1].device_type, DeviceType::PlugMiniJp);
        assert_eq!(list.infrared.len(), 1);
        assert_eq!(list.infrared[0].remote_type, "Air Conditioner");
    }

    #[test]
    fn test_parse_status_fields() {
        let json = r#"{
            "deviceId": "B0E9FE000001",
            "deviceType": "MeterPro(CO2)",
            "hubDeviceId": "B0E9FE000001",
            "humidity": 48,
            "temperature": 23.4,
            "CO2": 812,
            "battery": 100,
            "version": "V1.0"
        }"#;

        let status: DeviceStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.device_type, DeviceType::MeterProCo2);
        assert_eq!(status.humidity, Some(48));
        assert_eq!(status.temperature, Some(23.4));
        assert_eq!(status.co2, Some(812));
        assert_eq!(status.weight, None);
    }

    #[test]
    fn test_parse_plug_status() {
        let json = r#"{
            "deviceId": "6055F92FCFD2",
            "deviceType": "Plug Mini (JP)",
            "power": "on",
            "voltage": 100.3,
            "weight": 12.0,
            "electricityOfDay": 34,
            "electricCurrent": 0.13
        }"#;

        let status: DeviceStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.voltage, Some(100.3));
        assert_eq!(status.weight, Some(12.0));
        assert_eq!(status.electric_current, Some(0.13));
        assert_eq!(status.humidity, None);
    }
}
