//! Read-only device state queries
//!
//! Each query is one short bridge call whose text output is matched against
//! a known marker. Missing or unrecognised output maps to a fixed sentinel
//! instead of an error.

use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::bridge::Bridge;
use crate::retry::RetryPolicy;

/// `dumpsys input` occasionally omits the orientation, so it is polled
pub const ORIENTATION_RETRY: RetryPolicy = RetryPolicy::new(10, Duration::from_secs(1));

/// `Display: init=WxH` from `dumpsys window windows` (before Android 4.3)
static DISPLAY_INIT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Display: init=(\d+)x(\d+)").expect("Invalid regex"));

/// `Physical size: WxH` from `wm size`
static PHYSICAL_SIZE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Physical size: (\d+)x(\d+)").expect("Invalid regex"));

const BATTERY_CAPACITY_PATH: &str = "/sys/class/power_supply/battery/capacity";

/// Status bar flags present while the keyguard is showing
const LOCKED_MARKERS: &[&str] = &["mDisabled=0x1e00000", "mDisabled1=0x3200000"];

const SCREEN_ON_MARKERS: &[&str] = &["mScreenOn=true", "SCREEN_ON_BIT", "Display Power: state=ON"];

/// Platform release as `major.minor.patch`; `0.0.0` when unknown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct AndroidVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl AndroidVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for AndroidVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Parse `ro.build.version.release`; missing components are zero
pub fn parse_version(release: &str) -> AndroidVersion {
    let parts: Vec<&str> = release.trim().split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return AndroidVersion::default();
    }

    let mut numbers = [0u32; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        match part.parse() {
            Ok(n) => *slot = n,
            Err(_) => return AndroidVersion::default(),
        }
    }
    AndroidVersion::new(numbers[0], numbers[1], numbers[2])
}

/// Display rotation as reported by `SurfaceOrientation`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Orientation {
    Portrait = 0,
    Landscape = 1,
    PortraitUpsideDown = 2,
    LandscapeUpsideDown = 3,
}

impl Orientation {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Portrait),
            1 => Some(Self::Landscape),
            2 => Some(Self::PortraitUpsideDown),
            3 => Some(Self::LandscapeUpsideDown),
            _ => None,
        }
    }

    pub fn is_portrait(self) -> bool {
        matches!(self, Self::Portrait | Self::PortraitUpsideDown)
    }
}

/// First `SurfaceOrientation` line in `dumpsys input`, read from its last character
pub fn parse_orientation(dumpsys: &str) -> Option<Orientation> {
    let line = dumpsys.lines().find(|l| l.contains("SurfaceOrientation"))?;
    let code = line.trim_end().chars().last()?.to_digit(10)?;
    Orientation::from_code(code)
}

/// Battery level text, or `-` when the device does not expose it
pub fn parse_battery(output: Option<&str>) -> String {
    match output.map(str::trim) {
        Some(level) if !level.is_empty() && !level.contains("No such file or directory") => {
            level.to_string()
        }
        _ => "-".to_string(),
    }
}

/// Lock state from `dumpsys statusbar`; no output counts as locked
pub fn parse_screen_locked(output: Option<&str>) -> bool {
    match output {
        Some(text) if !text.trim().is_empty() => LOCKED_MARKERS.iter().any(|m| text.contains(m)),
        _ => true,
    }
}

/// Screen state from `dumpsys power`; no output counts as off
pub fn parse_screen_on(output: Option<&str>) -> bool {
    output.is_some_and(|text| SCREEN_ON_MARKERS.iter().any(|m| text.contains(m)))
}

fn capture_size(regex: &Regex, output: &str) -> (u32, u32) {
    regex
        .captures(output)
        .and_then(|caps| Some((caps[1].parse().ok()?, caps[2].parse().ok()?)))
        .unwrap_or((0, 0))
}

/// Single system property, trimmed; empty when unavailable
pub async fn get_prop(bridge: &Bridge, handle: &str, prop: &str) -> String {
    let result = bridge.shell(handle, &["getprop", prop]).await;
    result.stdout_str().trim().to_string()
}

pub async fn version(bridge: &Bridge, handle: &str) -> AndroidVersion {
    parse_version(&get_prop(bridge, handle, "ro.build.version.release").await)
}

pub async fn ip(bridge: &Bridge, handle: &str) -> String {
    get_prop(bridge, handle, "dhcp.wlan0.ipaddress").await
}

pub async fn serial(bridge: &Bridge, handle: &str) -> String {
    get_prop(bridge, handle, "ro.serialno").await
}

pub async fn brand(bridge: &Bridge, handle: &str) -> String {
    get_prop(bridge, handle, "ro.product.brand").await
}

pub async fn model(bridge: &Bridge, handle: &str) -> String {
    get_prop(bridge, handle, "ro.product.model").await
}

pub async fn battery(bridge: &Bridge, handle: &str) -> String {
    let result = bridge.shell(handle, &["cat", BATTERY_CAPACITY_PATH]).await;
    parse_battery(result.stdout.as_deref())
}

/// The bridge runs unsecured while the unit is powered off (charging screen)
pub async fn is_off(bridge: &Bridge, handle: &str) -> bool {
    get_prop(bridge, handle, "ro.adb.secure").await == "0"
}

pub async fn is_screen_locked(bridge: &Bridge, handle: &str) -> bool {
    let result = bridge.shell(handle, &["dumpsys", "statusbar"]).await;
    parse_screen_locked(result.stdout.as_deref())
}

pub async fn is_screen_on(bridge: &Bridge, handle: &str) -> bool {
    let result = bridge.shell(handle, &["dumpsys", "power"]).await;
    parse_screen_on(result.stdout.as_deref())
}

/// Physical display size in pixels, `(0, 0)` when it cannot be determined
pub async fn screen_size(bridge: &Bridge, handle: &str) -> (u32, u32) {
    if version(bridge, handle).await < AndroidVersion::new(4, 3, 0) {
        let result = bridge.shell(handle, &["dumpsys", "window", "windows"]).await;
        return capture_size(&DISPLAY_INIT_REGEX, result.stdout_str());
    }

    let result = bridge.shell(handle, &["wm", "size"]).await;
    capture_size(&PHYSICAL_SIZE_REGEX, result.stdout_str())
}

/// Current orientation, guessing landscape if it never shows up
pub async fn orientation(bridge: &Bridge, handle: &str) -> Orientation {
    ORIENTATION_RETRY
        .run(
            |_| async move {
                let result = bridge.shell(handle, &["dumpsys", "input"]).await;
                parse_orientation(result.stdout_str())
            },
            Orientation::Landscape,
            || {
                warn!(device = handle, "Unable to find SurfaceOrientation, guessing landscape");
                bridge.sink().print_line(format!(
                    "Warning: unable to find SurfaceOrientation on {}, guessing landscape.",
                    handle
                ));
            },
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::exec::ConcurrencyGate;
    use crate::sink::{OutputSink, SharedBuffer};
    use crate::test_support::FakeRunner;

    fn bridge_with(runner: FakeRunner) -> (Bridge, SharedBuffer) {
        let (sink, buffer) = OutputSink::buffer();
        let bridge = Bridge::new(
            "adb",
            Arc::new(runner),
            ConcurrencyGate::default(),
            Arc::new(sink),
        );
        (bridge, buffer)
    }

    const INPUT_NO_MARKER: &str = "INPUT MANAGER (dumpsys input)\n  Event Hub State:\n";
    const INPUT_WITH_MARKER: &str =
        "INPUT MANAGER (dumpsys input)\n  Input Reader State:\n      SurfaceOrientation: 3\n";

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("4.4.2"), AndroidVersion::new(4, 4, 2));
        assert_eq!(parse_version("7.0\n"), AndroidVersion::new(7, 0, 0));
        assert_eq!(parse_version("11"), AndroidVersion::new(11, 0, 0));
        assert_eq!(parse_version(""), AndroidVersion::default());
        assert_eq!(parse_version("S"), AndroidVersion::default());
        assert_eq!(parse_version("1.2.3.4"), AndroidVersion::default());
        assert_eq!(parse_version("8.1.0").to_string(), "8.1.0");
    }

    #[test]
    fn test_parse_orientation() {
        assert_eq!(parse_orientation(INPUT_WITH_MARKER), Some(Orientation::LandscapeUpsideDown));
        assert_eq!(
            parse_orientation("      SurfaceOrientation: 0\r\n"),
            Some(Orientation::Portrait)
        );
        assert_eq!(parse_orientation(INPUT_NO_MARKER), None);
        assert_eq!(parse_orientation("SurfaceOrientation: 7"), None);
    }

    #[test]
    fn test_parse_battery() {
        assert_eq!(parse_battery(Some("87\n")), "87");
        assert_eq!(parse_battery(None), "-");
        assert_eq!(
            parse_battery(Some("cat: /sys/class/power_supply/battery/capacity: No such file or directory")),
            "-"
        );
    }

    #[test]
    fn test_parse_screen_state() {
        assert!(parse_screen_locked(None));
        assert!(parse_screen_locked(Some("  mDisabled=0x1e00000 ")));
        assert!(!parse_screen_locked(Some("mDisabled=0x0")));
        assert!(parse_screen_on(Some("Display Power: state=ON")));
        assert!(!parse_screen_on(Some("Display Power: state=OFF")));
        assert!(!parse_screen_on(None));
    }

    #[tokio::test]
    async fn test_screen_size_modern() {
        let runner = FakeRunner::new()
            .respond("ro.build.version.release", "9\n")
            .respond("wm size", "Physical size: 1080x1920\n");
        let (bridge, _) = bridge_with(runner);
        assert_eq!(screen_size(&bridge, "dev").await, (1080, 1920));
    }

    #[tokio::test]
    async fn test_screen_size_legacy() {
        let runner = FakeRunner::new()
            .respond("ro.build.version.release", "4.2.2\n")
            .respond("window windows", "  Display: init=800x1280 cur=800x1280\n");
        let calls = runner.calls();
        let (bridge, _) = bridge_with(runner);
        assert_eq!(screen_size(&bridge, "dev").await, (800, 1280));
        assert!(calls.find("wm size").is_none());
    }

    #[tokio::test]
    async fn test_screen_size_sentinel() {
        let (bridge, _) = bridge_with(FakeRunner::new().respond("wm size", "garbage"));
        assert_eq!(screen_size(&bridge, "dev").await, (0, 0));
    }

    #[tokio::test]
    async fn test_props_are_trimmed() {
        let runner = FakeRunner::new()
            .respond("ro.product.model", "Nexus 4\r\n")
            .respond("ro.adb.secure", "0\n");
        let (bridge, _) = bridge_with(runner);
        assert_eq!(model(&bridge, "dev").await, "Nexus 4");
        assert!(is_off(&bridge, "dev").await);
        assert_eq!(brand(&bridge, "dev").await, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_orientation_retries_until_marker() {
        let mut outputs = vec![INPUT_NO_MARKER.to_string(); 9];
        outputs.push(INPUT_WITH_MARKER.to_string());
        let runner = FakeRunner::new().respond_sequence("dumpsys input", outputs);
        let calls = runner.calls();
        let (bridge, buffer) = bridge_with(runner);

        let start = tokio::time::Instant::now();
        let value = orientation(&bridge, "dev").await;

        assert_eq!(value, Orientation::LandscapeUpsideDown);
        assert_eq!(calls.count_matching("dumpsys input"), 10);
        assert_eq!(start.elapsed(), Duration::from_secs(9));
        assert!(buffer.contents().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_orientation_falls_back_to_landscape() {
        let runner = FakeRunner::new().respond("dumpsys input", INPUT_NO_MARKER);
        let calls = runner.calls();
        let (bridge, buffer) = bridge_with(runner);

        let value = orientation(&bridge, "dev").await;

        assert_eq!(value, Orientation::Landscape);
        assert_eq!(calls.count_matching("dumpsys input"), 10);
        assert!(buffer.contents().contains("guessing landscape"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_orientation_portrait_is_not_a_miss() {
        let runner = FakeRunner::new().respond("dumpsys input", "SurfaceOrientation: 0\n");
        let calls = runner.calls();
        let (bridge, _) = bridge_with(runner);

        assert_eq!(orientation(&bridge, "dev").await, Orientation::Portrait);
        assert_eq!(calls.count_matching("dumpsys input"), 1);
    }
}
