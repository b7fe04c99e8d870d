use std::collections::BTreeMap;

use async_trait::async_trait;
use fleet_common::FleetResult;
use serde::Serialize;
use tracing::warn;

use crate::bridge::Bridge;

/// Handle printed by the bridge for devices it lacks permission to talk to
const NO_PERMISSION_HANDLE: &str = "????????????";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    pub handle: String,
    pub state: String,
}

/// Supplies the devices a dispatch call should run against.
///
/// Identifiers are fetched fresh on every call; an empty `allow` list means
/// every usable device.
#[async_trait]
pub trait DeviceSource: Send + Sync {
    async fn list_devices(&self, allow: &[String]) -> FleetResult<BTreeMap<String, Device>>;
}

/// [`DeviceSource`] backed by `<bridge> devices`
pub struct AdbDeviceSource {
    bridge: Bridge,
}

impl AdbDeviceSource {
    pub fn new(bridge: Bridge) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl DeviceSource for AdbDeviceSource {
    async fn list_devices(&self, allow: &[String]) -> FleetResult<BTreeMap<String, Device>> {
        let argv = self.bridge.command(&["devices"]);
        let result = self.bridge.run(&argv, self.bridge.default_options()).await;
        Ok(parse_device_list(result.stdout_str(), allow))
    }
}

/// Parse `adb devices` output, dropping devices that cannot be used
pub fn parse_device_list(output: &str, allow: &[String]) -> BTreeMap<String, Device> {
    let mut devices = BTreeMap::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("List of devices") || line.starts_with('*') {
            continue;
        }

        let mut parts = line.split_whitespace();
        let Some(handle) = parts.next() else {
            continue;
        };
        let state = parts.next().unwrap_or_default();

        if handle == NO_PERMISSION_HANDLE || state == "no" {
            warn!(device = handle, "Device with insufficient permissions found, skipping");
            continue;
        }
        if state == "unauthorized" {
            warn!(device = handle, "Unauthorized device found, skipping");
            continue;
        }
        if !allow.is_empty() && !allow.iter().any(|a| a == handle) {
            continue;
        }

        devices.insert(
            handle.to_string(),
            Device {
                handle: handle.to_string(),
                state: state.to_string(),
            },
        );
    }

    devices
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::exec::ConcurrencyGate;
    use crate::sink::OutputSink;
    use crate::test_support::FakeRunner;

    const LISTING: &str = "List of devices attached\n\
        0123456789ABCDEF\tdevice\n\
        ????????????\tno permissions\n\
        emulator-5554\tunauthorized\n\
        192.168.1.20:5555\tdevice\n\
        \n";

    #[test]
    fn test_filters_unusable_devices() {
        let devices = parse_device_list(LISTING, &[]);
        let handles: Vec<_> = devices.keys().cloned().collect();
        assert_eq!(handles, vec!["0123456789ABCDEF", "192.168.1.20:5555"]);
        assert_eq!(devices["0123456789ABCDEF"].state, "device");
    }

    #[test]
    fn test_allow_list_restricts() {
        let allow = vec!["192.168.1.20:5555".to_string(), "missing".to_string()];
        let devices = parse_device_list(LISTING, &allow);
        assert_eq!(devices.len(), 1);
        assert!(devices.contains_key("192.168.1.20:5555"));
    }

    #[test]
    fn test_daemon_chatter_and_named_no_permissions() {
        let output = "* daemon not running; starting now at tcp:5037\n\
            * daemon started successfully\n\
            List of devices attached\n\
            R58M12345\tno permissions (user in plugdev group); see [http://developer.android.com/tools/device.html]\n\
            R58M99999\tdevice\n";
        let devices = parse_device_list(output, &[]);
        assert_eq!(devices.keys().collect::<Vec<_>>(), vec!["R58M99999"]);
    }

    #[test]
    fn test_empty_output() {
        assert!(parse_device_list("", &[]).is_empty());
        assert!(parse_device_list("List of devices attached\n\n", &[]).is_empty());
    }

    #[tokio::test]
    async fn test_source_runs_devices_command() {
        let runner = FakeRunner::new().respond("devices", LISTING);
        let calls = runner.calls();
        let (sink, _) = OutputSink::buffer();
        let bridge = Bridge::new(
            "/opt/adb",
            Arc::new(runner),
            ConcurrencyGate::default(),
            Arc::new(sink),
        );

        let devices = AdbDeviceSource::new(bridge).list_devices(&[]).await.unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(calls.all()[0].argv, vec!["/opt/adb", "devices"]);
    }
}
