//! SIGHUP handling, in its own test binary since it signals the process.

#![cfg(unix)]

use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use switchbot_client::mock::MockDeviceClient;
use switchbot_client::{Device, DeviceType};
use switchbot_exporter::reload::{hangup_signal, watch_hangup};
use switchbot_exporter::{DeviceLabelCache, MetricsSnapshot, ReloadCoordinator};

fn send_hangup() {
    let status = Command::new("kill")
        .args(["-HUP", &std::process::id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());
}

async fn wait_for_len(cache: &DeviceLabelCache, len: usize) -> bool {
    for _ in 0..100 {
        if cache.len() == len {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn test_sighup_reloads_roster() {
    let hangup = hangup_signal().unwrap();

    let client = Arc::new(MockDeviceClient::new());
    client.add_device(Device::new("M1", "Kitchen", DeviceType::Meter));

    let cache = Arc::new(DeviceLabelCache::new());
    cache.refresh(client.as_ref()).await.unwrap();

    let (reload, _task) = ReloadCoordinator::spawn(cache.clone(), client.clone());
    client.add_device(Device::new("P1", "Heater", DeviceType::PlugMiniUs));

    // Delivered before the watcher task is first polled; the installed
    // handler keeps it pending instead of terminating the process.
    send_hangup();
    tokio::spawn(watch_hangup(hangup, reload));

    assert!(wait_for_len(&cache, 2).await, "SIGHUP did not trigger a reload");

    let output = MetricsSnapshot::new(&cache).render().unwrap();
    assert!(output.contains(r#"switchbot_device{device_id="P1",device_name="Heater"} 0"#));

    client.add_device(Device::new("M2", "Bedroom", DeviceType::MeterPlus));
    send_hangup();

    assert!(wait_for_len(&cache, 3).await, "second SIGHUP did not trigger a reload");
}
