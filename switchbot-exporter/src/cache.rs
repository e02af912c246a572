//! Process-wide roster of known devices.
//!
//! Every device seen in an inventory fetch is recorded as an `(id, name)`
//! pair and exposed as `switchbot_device{device_id, device_name} 0`, so a
//! collector can join display names onto the per-device readings.

use std::collections::BTreeSet;

use parking_lot::RwLock;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use switchbot_client::{ClientError, DeviceClient};
use tracing::{debug, info};

/// Label set of the `switchbot_device` family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EncodeLabelSet)]
pub struct DeviceLabels {
    pub device_id: String,
    pub device_name: String,
}

/// Outcome of one inventory refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Physical devices returned upstream.
    pub devices: usize,
    /// Infrared remotes returned upstream.
    pub infrared: usize,
    /// Pairs not previously known.
    pub added: usize,
    /// Pairs dropped because pruning is enabled.
    pub removed: usize,
}

/// Roster of `(device_id, device_name)` pairs.
#[derive(Debug, Default)]
pub struct DeviceLabelCache {
    entries: RwLock<BTreeSet<(String, String)>>,
    prune_on_reload: bool,
}

impl DeviceLabelCache {
    /// Create an empty cache that only ever grows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache that replaces its roster on every refresh.
    pub fn with_pruning(prune_on_reload: bool) -> Self {
        Self {
            entries: RwLock::new(BTreeSet::new()),
            prune_on_reload,
        }
    }

    /// Mark a device as known. Returns `true` if the pair was new.
    pub fn record_device(&self, id: &str, name: &str) -> bool {
        self.entries
            .write()
            .insert((id.to_string(), name.to_string()))
    }

    /// All known pairs, sorted by id then name.
    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.entries.read().iter().cloned().collect()
    }

    /// Number of known pairs.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no device has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Register the roster as the `device` family of `registry`.
    ///
    /// The family is built from a snapshot, so a concurrent refresh never
    /// shows up half-applied in a single scrape.
    pub fn register(&self, registry: &mut Registry) {
        let family = Family::<DeviceLabels, Gauge>::default();
        for (device_id, device_name) in self.snapshot() {
            family
                .get_or_create(&DeviceLabels {
                    device_id,
                    device_name,
                })
                .set(0);
        }
        registry.register(
            "device",
            "Known SwitchBot devices, labelled with their display name",
            family,
        );
    }

    /// Fetch the full inventory and record every device in it.
    ///
    /// Physical devices and infrared remotes are both recorded. On error the
    /// roster is left untouched.
    pub async fn refresh(&self, client: &dyn DeviceClient) -> Result<RefreshSummary, ClientError> {
        debug!("Fetching device list");
        let list = client.list_devices().await?;

        let fetched: BTreeSet<(String, String)> = list
            .devices
            .iter()
            .map(|d| (d.id.clone(), d.name.clone()))
            .chain(list.infrared.iter().map(|d| (d.id.clone(), d.name.clone())))
            .collect();

        let mut entries = self.entries.write();
        let added = fetched.difference(&entries).count();
        let removed = if self.prune_on_reload {
            let removed = entries.difference(&fetched).count();
            *entries = fetched;
            removed
        } else {
            entries.extend(fetched);
            0
        };
        let known = entries.len();
        drop(entries);

        let summary = RefreshSummary {
            devices: list.devices.len(),
            infrared: list.infrared.len(),
            added,
            removed,
        };
        info!(
            devices = summary.devices,
            infrared = summary.infrared,
            added = summary.added,
            removed = summary.removed,
            known,
            "Reloaded device list"
        );
        Ok(summary)
    }
}
