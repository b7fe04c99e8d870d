//! Fleet-wide commands
//!
//! [`Fleet`] ties the bridge, the device source and the dispatcher together
//! and exposes one method per CLI command. Each method enumerates devices
//! afresh, fans the per-device operation out and reports the aggregate.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use fleet_common::{FleetError, FleetResult};
use serde::Serialize;
use tracing::warn;

use crate::adb::{self, AdbDeviceSource, DeviceSource, LogType, Point, StartRequest};
use crate::bridge::Bridge;
use crate::config::FleetConfig;
use crate::dispatch::{Dispatcher, ResultSet};
use crate::exec::ExecResult;
use crate::sink::OutputSink;

/// Pause between the steps of `disable_verify_apps`
const TASK_STEP_PAUSE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Predefined multi-step jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
pub enum Task {
    /// Turn off package verification (screen is cycled so affected units are visible)
    #[value(name = "disable_verify_apps")]
    DisableVerifyApps,
}

/// Which fact a [`PresenceReport`] is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Installed,
    Running,
}

/// Summary of a package check across the fleet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresenceReport {
    pub check: Presence,
    pub package: String,
    pub total: usize,
    /// Devices without the package (or not running it), including failed checks
    pub missing: Vec<String>,
}

impl PresenceReport {
    pub fn from_results(check: Presence, package: &str, results: &ResultSet<bool>) -> Self {
        let missing = results
            .iter()
            .filter(|(_, outcome)| !matches!(outcome, Ok(true)))
            .map(|(device, _)| device.clone())
            .collect();

        Self {
            check,
            package: package.to_string(),
            total: results.len(),
            missing,
        }
    }

    pub fn all_present(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn lines(&self) -> Vec<String> {
        let headline = match (self.check, self.all_present()) {
            (Presence::Installed, true) => format!(
                "All the {} devices have {} installed.",
                self.total, self.package
            ),
            (Presence::Installed, false) => format!(
                "{}/{} devices does not have {} installed:",
                self.missing.len(),
                self.total,
                self.package
            ),
            (Presence::Running, true) => {
                format!("All {} devices are running {}.", self.total, self.package)
            }
            (Presence::Running, false) => format!(
                "{}/{} devices are not running {}:",
                self.missing.len(),
                self.total,
                self.package
            ),
        };

        std::iter::once(headline)
            .chain(self.missing.iter().map(|device| format!("  {}", device)))
            .collect()
    }
}

/// One line of `list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRow {
    pub id: String,
    pub brand: String,
    pub model: String,
    pub version: String,
    pub battery: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<DeviceDetails>,
}

/// Extra columns of `list --wide`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceDetails {
    pub ip: String,
    pub serial: String,
    pub locked: bool,
}

impl DeviceRow {
    /// Query everything `list` shows for one device, in sequence
    pub async fn probe(bridge: &Bridge, handle: &str, wide: bool) -> Self {
        let version = adb::version(bridge, handle).await.to_string();
        let brand = adb::brand(bridge, handle).await;
        let model = adb::model(bridge, handle).await;
        let battery = adb::battery(bridge, handle).await;

        let state = if adb::is_off(bridge, handle).await {
            "device off"
        } else if adb::is_screen_on(bridge, handle).await {
            "screen on"
        } else {
            "screen off"
        };

        let details = if wide {
            Some(DeviceDetails {
                ip: adb::ip(bridge, handle).await,
                serial: adb::serial(bridge, handle).await,
                locked: adb::is_screen_locked(bridge, handle).await,
            })
        } else {
            None
        };

        Self {
            id: handle.to_string(),
            brand,
            model,
            version,
            battery,
            state: state.to_string(),
            details,
        }
    }

    fn unreachable(id: &str) -> Self {
        Self {
            id: id.to_string(),
            brand: String::new(),
            model: String::new(),
            version: "0.0.0".to_string(),
            battery: "-".to_string(),
            state: "error".to_string(),
            details: None,
        }
    }

    pub fn render(&self) -> String {
        let mut line = format!(
            "{:20} {:10} {:12} {:6} {:>3} % {:3}",
            self.id, self.brand, self.model, self.version, self.battery, self.state
        );
        if let Some(details) = &self.details {
            let lock = if details.locked { "locked" } else { "unlocked" };
            line.push_str(&format!(" {:15} {:16} {}", details.ip, details.serial, lock));
        }
        line
    }
}

/// Rendered `list` table: rows, a rule and the total line
pub fn render_table(rows: &[DeviceRow]) -> Vec<String> {
    let mut lines: Vec<String> = rows.iter().map(DeviceRow::render).collect();
    let longest = lines.iter().map(String::len).max().unwrap_or_default();

    let total = format!(
        "total: {:>width$} device(s)",
        rows.len(),
        width = longest.saturating_sub(17)
    );
    lines.push("-".repeat(total.len()));
    lines.push(total);
    lines
}

pub struct Fleet {
    bridge: Bridge,
    source: Arc<dyn DeviceSource>,
    sink: Arc<OutputSink>,
    allow: Vec<String>,
    format: OutputFormat,
}

impl Fleet {
    pub fn new(bridge: Bridge, source: Arc<dyn DeviceSource>, allow: Vec<String>) -> Self {
        let sink = bridge.shared_sink();
        Self {
            bridge,
            source,
            sink,
            allow,
            format: OutputFormat::default(),
        }
    }

    /// Build the production fleet and start the bridge server.
    ///
    /// Fails when the bridge executable cannot be started at all.
    pub async fn connect(config: &FleetConfig, sink: Arc<OutputSink>) -> FleetResult<Self> {
        let bridge = Bridge::from_config(config, sink)?;
        bridge.start_server().await?;
        let source = Arc::new(AdbDeviceSource::new(bridge.clone()));
        Ok(Self::new(bridge, source, config.devices.clone()))
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Current device handles, sorted
    pub async fn device_ids(&self) -> FleetResult<Vec<String>> {
        Ok(self
            .source
            .list_devices(&self.allow)
            .await?
            .into_keys()
            .collect())
    }

    /// Enumerate devices and run `op` on each of them concurrently
    pub async fn run_on_all<A, T, F, Fut>(&self, args: A, op: F) -> FleetResult<ResultSet<T>>
    where
        A: Send + Sync + 'static,
        T: Send + 'static,
        F: Fn(Bridge, String, Arc<A>) -> Fut,
        Fut: Future<Output = FleetResult<T>> + Send + 'static,
    {
        let announce = self.format == OutputFormat::Text;
        self.fan_out(args, op, announce).await
    }

    async fn fan_out<A, T, F, Fut>(&self, args: A, op: F, announce: bool) -> FleetResult<ResultSet<T>>
    where
        A: Send + Sync + 'static,
        T: Send + 'static,
        F: Fn(Bridge, String, Arc<A>) -> Fut,
        Fut: Future<Output = FleetResult<T>> + Send + 'static,
    {
        let devices = self.device_ids().await?;
        let dispatcher = Dispatcher::new(self.sink.clone());
        let dispatcher = if announce { dispatcher } else { dispatcher.quiet() };

        let bridge = self.bridge.clone();
        Ok(dispatcher
            .dispatch_all(devices, args, move |device, args| {
                op(bridge.clone(), device, args)
            })
            .await)
    }

    fn emit_json<T: Serialize>(&self, value: &T) -> FleetResult<()> {
        let json = serde_json::to_string_pretty(value).map_err(|e| FleetError::Json(e.to_string()))?;
        self.sink.print_line(json);
        Ok(())
    }

    // ========================================================================
    // Listing
    // ========================================================================

    pub async fn list_quick(&self) -> FleetResult<Vec<String>> {
        let devices = self.device_ids().await?;

        if self.format == OutputFormat::Json {
            self.emit_json(&devices)?;
            return Ok(devices);
        }
        if devices.is_empty() {
            self.sink.print_line("No devices detected.");
            return Ok(devices);
        }

        let mut lines = devices.clone();
        lines.push("-".repeat(20));
        lines.push(format!("total: {:3} device(s)", devices.len()));
        self.sink.print_block(lines);
        Ok(devices)
    }

    pub async fn list(&self, wide: bool) -> FleetResult<Vec<DeviceRow>> {
        let results = self
            .fan_out(
                wide,
                |bridge, device, wide| async move { Ok(DeviceRow::probe(&bridge, &device, *wide).await) },
                false,
            )
            .await?;

        let rows: Vec<DeviceRow> = results
            .into_iter()
            .map(|(device, row)| row.unwrap_or_else(|_| DeviceRow::unreachable(&device)))
            .collect();

        if self.format == OutputFormat::Json {
            self.emit_json(&rows)?;
        } else if rows.is_empty() {
            self.sink.print_line("No devices detected.");
        } else {
            self.sink.print_block(render_table(&rows));
        }
        Ok(rows)
    }

    // ========================================================================
    // Input
    // ========================================================================

    pub async fn tap(&self, location: Point) -> FleetResult<ResultSet<ExecResult>> {
        self.run_on_all(location, |bridge, device, location| async move {
            Ok(adb::tap(&bridge, &device, *location).await)
        })
        .await
    }

    pub async fn swipe(&self, start: Point, end: Point) -> FleetResult<ResultSet<ExecResult>> {
        self.run_on_all((start, end), |bridge, device, points| async move {
            let (start, end) = *points;
            Ok(adb::swipe(&bridge, &device, start, end).await)
        })
        .await
    }

    pub async fn press(&self, button: &str) -> FleetResult<ResultSet<ExecResult>> {
        // Reject unknown names before touching any device.
        adb::keycode(button)?;
        self.run_on_all(button.to_string(), |bridge, device, button| async move {
            adb::press(&bridge, &device, &button).await
        })
        .await
    }

    pub async fn turn_screen(&self, on: bool) -> FleetResult<ResultSet<bool>> {
        self.run_on_all(on, |bridge, device, on| async move {
            adb::turn_screen(&bridge, &device, *on).await
        })
        .await
    }

    // ========================================================================
    // Packages
    // ========================================================================

    /// Install an APK everywhere, printing each device's verdict
    pub async fn install(&self, apk: &Path) -> FleetResult<ResultSet<ExecResult>> {
        let apk = std::path::absolute(apk)?.to_string_lossy().into_owned();
        self.run_on_all(apk, |bridge, device, apk| async move {
            let result = adb::install(&bridge, &device, &apk).await;
            bridge
                .sink()
                .print_line(format!("{}: {}", device, install_verdict(&result)));
            Ok(result)
        })
        .await
    }

    /// Copy a local file to the same remote path on every device
    pub async fn push(&self, local: &Path, remote: &str) -> FleetResult<ResultSet<ExecResult>> {
        let local = std::path::absolute(local)?.to_string_lossy().into_owned();
        self.run_on_all((local, remote.to_string()), |bridge, device, paths| async move {
            let (local, remote) = &*paths;
            Ok(adb::push(&bridge, &device, local, remote).await)
        })
        .await
    }

    pub async fn uninstall(&self, package: &str) -> FleetResult<ResultSet<ExecResult>> {
        self.run_on_all(package.to_string(), |bridge, device, package| async move {
            Ok(adb::uninstall(&bridge, &device, &package).await)
        })
        .await
    }

    pub async fn has(&self, package: &str) -> FleetResult<PresenceReport> {
        let results = self
            .run_on_all(package.to_string(), |bridge, device, package| async move {
                Ok(adb::has(&bridge, &device, &package).await)
            })
            .await?;
        let report = PresenceReport::from_results(Presence::Installed, package, &results);
        self.emit_report(&report)?;
        Ok(report)
    }

    pub async fn running(&self, package: &str) -> FleetResult<PresenceReport> {
        let results = self
            .run_on_all(package.to_string(), |bridge, device, package| async move {
                Ok(adb::running(&bridge, &device, &package).await)
            })
            .await?;
        let report = PresenceReport::from_results(Presence::Running, package, &results);
        self.emit_report(&report)?;
        Ok(report)
    }

    fn emit_report(&self, report: &PresenceReport) -> FleetResult<()> {
        match self.format {
            OutputFormat::Json => self.emit_json(report),
            OutputFormat::Text => {
                self.sink.print_block(report.lines());
                Ok(())
            }
        }
    }

    pub async fn start(&self, request: StartRequest) -> FleetResult<ResultSet<ExecResult>> {
        self.run_on_all(request, |bridge, device, request| async move {
            Ok(adb::start(&bridge, &device, &request).await)
        })
        .await
    }

    pub async fn stop(&self, package: &str) -> FleetResult<ResultSet<ExecResult>> {
        self.run_on_all(package.to_string(), |bridge, device, package| async move {
            Ok(adb::stop(&bridge, &device, &package).await)
        })
        .await
    }

    /// Force-stop then start the default activity
    pub async fn restart(&self, package: &str) -> FleetResult<ResultSet<ExecResult>> {
        self.run_on_all(StartRequest::new(package), |bridge, device, request| async move {
            adb::stop(&bridge, &device, &request.package).await;
            Ok(adb::start(&bridge, &device, &request).await)
        })
        .await
    }

    // ========================================================================
    // Power
    // ========================================================================

    pub async fn shutdown(&self) -> FleetResult<ResultSet<ExecResult>> {
        self.run_on_all((), |bridge, device, _| async move {
            Ok(adb::shutdown(&bridge, &device).await)
        })
        .await
    }

    pub async fn reboot(&self) -> FleetResult<ResultSet<ExecResult>> {
        self.run_on_all((), |bridge, device, _| async move {
            Ok(adb::reboot(&bridge, &device).await)
        })
        .await
    }

    pub async fn turn_on(&self) -> FleetResult<ResultSet<bool>> {
        self.run_on_all((), |bridge, device, _| async move {
            Ok(adb::turn_on(&bridge, &device).await)
        })
        .await
    }

    pub async fn unlock(&self) -> FleetResult<ResultSet<adb::UnlockPolicy>> {
        self.run_on_all((), |bridge, device, _| async move {
            adb::unlock(&bridge, &device).await
        })
        .await
    }

    // ========================================================================
    // Tasks and raw shell
    // ========================================================================

    pub async fn run_task(&self, task: Task) -> FleetResult<ResultSet<()>> {
        match task {
            Task::DisableVerifyApps => {
                self.run_on_all((), |bridge, device, _| async move {
                    adb::turn_screen(&bridge, &device, false).await?;
                    tokio::time::sleep(TASK_STEP_PAUSE).await;
                    bridge
                        .shell(
                            &device,
                            &["settings", "put", "global", "package_verifier_enable", "0"],
                        )
                        .await;
                    tokio::time::sleep(TASK_STEP_PAUSE).await;
                    adb::turn_screen(&bridge, &device, true).await?;
                    Ok(())
                })
                .await
            }
        }
    }

    /// Run a shell command everywhere without a deadline and log the output
    pub async fn shell(
        &self,
        args: Vec<String>,
        log_type: LogType,
        out_dir: &Path,
    ) -> FleetResult<ResultSet<ExecResult>> {
        let results = self
            .run_on_all(args, |bridge, device, args| async move {
                Ok(adb::run_shell(&bridge, &device, &args).await)
            })
            .await?;

        for (device, outcome) in &results {
            let Ok(result) = outcome else {
                continue;
            };
            match log_type {
                LogType::None => {}
                LogType::Stdout => self
                    .sink
                    .print_block(adb::stdout_entry(device, result.stdout_str())),
                LogType::File => {
                    if let Err(e) = adb::write_output_file(out_dir, device, result.stdout_str()) {
                        warn!(device = %device, "Failed to write output file: {}", e);
                    }
                }
            }
        }

        Ok(results)
    }
}

/// Last line of install output, else stderr, else the reason nothing came back
fn install_verdict(result: &ExecResult) -> String {
    if result.timed_out {
        return "timed out".to_string();
    }
    if let Some(last) = result.stdout_str().lines().rev().find(|l| !l.trim().is_empty()) {
        return last.trim().to_string();
    }
    let stderr = result.stderr_str().trim();
    if stderr.is_empty() {
        "no output".to_string()
    } else {
        stderr.to_string()
    }
}
