//! Per-scrape metrics snapshot.
//!
//! Every scrape builds a fresh [`Registry`], pre-registers all reading
//! families plus the shared device roster, fills in the readings for the
//! requested targets and renders it. Nothing but the roster outlives the
//! request, so series of one target never leak into another scrape.

use std::sync::atomic::AtomicU64;

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use switchbot_client::{ClientError, DeviceClient, DeviceStatus, DeviceType};
use tracing::{debug, info, warn};

use crate::cache::DeviceLabelCache;

/// Metric namespace.
pub const NAMESPACE: &str = "switchbot";

/// Content type of the rendered exposition.
pub const CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Reading families a device type maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    /// Humidity and temperature.
    Meter,
    /// Humidity, temperature and CO2.
    Co2Meter,
    /// Power, voltage and current.
    Plug,
}

impl DeviceClass {
    /// Classify a device type, or `None` if it has no exported readings.
    pub fn classify(device_type: &DeviceType) -> Option<Self> {
        match device_type {
            DeviceType::Meter
            | DeviceType::MeterPlus
            | DeviceType::MeterPro
            | DeviceType::Hub2
            | DeviceType::WoIoSensor
            | DeviceType::Humidifier => Some(Self::Meter),
            DeviceType::MeterProCo2 => Some(Self::Co2Meter),
            DeviceType::PlugMiniJp | DeviceType::PlugMiniUs => Some(Self::Plug),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Meter => "meter",
            Self::Co2Meter => "co2_meter",
            Self::Plug => "plug",
        }
    }
}

/// Label set of every reading family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EncodeLabelSet)]
pub struct DeviceIdLabels {
    pub device_id: String,
}

type ReadingFamily = Family<DeviceIdLabels, Gauge<f64, AtomicU64>>;

/// A scrape-scoped registry with all reading families registered.
#[derive(Debug)]
pub struct MetricsSnapshot {
    registry: Registry,
    meter_humidity: ReadingFamily,
    meter_temperature: ReadingFamily,
    meter_co2: ReadingFamily,
    plug_weight: ReadingFamily,
    plug_voltage: ReadingFamily,
    plug_electric_current: ReadingFamily,
}

impl MetricsSnapshot {
    /// Build an empty snapshot that also exposes the device roster.
    pub fn new(roster: &DeviceLabelCache) -> Self {
        let mut registry = Registry::with_prefix(NAMESPACE);
        roster.register(&mut registry);

        let meter_humidity = ReadingFamily::default();
        let meter_temperature = ReadingFamily::default();
        let meter_co2 = ReadingFamily::default();
        let plug_weight = ReadingFamily::default();
        let plug_voltage = ReadingFamily::default();
        let plug_electric_current = ReadingFamily::default();

        let meter = registry.sub_registry_with_prefix("meter");
        meter.register(
            "humidity",
            "Relative humidity in percent",
            meter_humidity.clone(),
        );
        meter.register(
            "temperature",
            "Temperature in degrees Celsius",
            meter_temperature.clone(),
        );
        meter.register("co2", "CO2 concentration in ppm", meter_co2.clone());

        let plug = registry.sub_registry_with_prefix("plug");
        plug.register("weight", "Power consumption in watts", plug_weight.clone());
        plug.register("voltage", "Voltage in volts", plug_voltage.clone());
        plug.register(
            "electricCurrent",
            "Electric current",
            plug_electric_current.clone(),
        );

        Self {
            registry,
            meter_humidity,
            meter_temperature,
            meter_co2,
            plug_weight,
            plug_voltage,
            plug_electric_current,
        }
    }

    /// Record the readings of one status.
    ///
    /// Returns the class the status was recorded as, or `None` when its
    /// type is not exported. Fields the device did not report are skipped.
    pub fn record(&self, status: &DeviceStatus) -> Option<DeviceClass> {
        let class = DeviceClass::classify(&status.device_type)?;
        let labels = DeviceIdLabels {
            device_id: status.id.clone(),
        };

        match class {
            DeviceClass::Meter | DeviceClass::Co2Meter => {
                set(&self.meter_humidity, &labels, status.humidity.map(|h| h as f64));
                set(&self.meter_temperature, &labels, status.temperature);
                if class == DeviceClass::Co2Meter {
                    set(&self.meter_co2, &labels, status.co2.map(|c| c as f64));
                }
            }
            DeviceClass::Plug => {
                set(&self.plug_weight, &labels, status.weight);
                set(&self.plug_voltage, &labels, status.voltage);
                set(&self.plug_electric_current, &labels, status.electric_current);
            }
        }

        Some(class)
    }

    /// Render the snapshot in the OpenMetrics text format.
    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut output = String::new();
        encode(&mut output, &self.registry)?;
        Ok(output)
    }
}

fn set(family: &ReadingFamily, labels: &DeviceIdLabels, value: Option<f64>) {
    if let Some(value) = value {
        family.get_or_create(labels).set(value);
    }
}

/// Resolve the devices a scrape covers.
///
/// An explicit target is used as-is, without checking that it exists.
/// Otherwise every physical device in a fresh inventory is a target.
pub async fn resolve_targets(
    client: &dyn DeviceClient,
    target: Option<&str>,
) -> Result<Vec<String>, ClientError> {
    match target {
        Some(target) => Ok(vec![target.to_string()]),
        None => {
            let list = client.list_devices().await?;
            Ok(list.devices.into_iter().map(|d| d.id).collect())
        }
    }
}

/// Fetch the status of every target and record it into a fresh snapshot.
///
/// Targets are independent: a failed status fetch is logged and that target
/// is skipped.
pub async fn collect(
    client: &dyn DeviceClient,
    roster: &DeviceLabelCache,
    targets: &[String],
) -> MetricsSnapshot {
    let snapshot = MetricsSnapshot::new(roster);

    for target in targets {
        debug!(target = %target, "Getting device status");
        let status = match client.status(target).await {
            Ok(status) => status,
            Err(e) => {
                warn!(target = %target, error = %e, "Failed to get device status");
                continue;
            }
        };

        if snapshot.record(&status).is_none() {
            info!(
                target = %target,
                device_type = %status.device_type,
                "Unrecognized device type"
            );
        }
    }

    snapshot
}
