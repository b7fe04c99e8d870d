use std::path::{Path, PathBuf};

use clap::ValueEnum;
use fleet_common::FleetResult;
use serde::Serialize;

use crate::bridge::{Bridge, RunOptions};
use crate::exec::ExecResult;

/// Where `shell` output ends up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    /// Discard the output
    #[default]
    None,
    /// Print each device's output block
    Stdout,
    /// Write `device_<id>.out` per device, replacing existing files
    File,
}

/// Run an arbitrary shell command with no deadline
pub async fn run_shell(bridge: &Bridge, handle: &str, args: &[String]) -> ExecResult {
    let argv = bridge.shell_command(handle, args);
    bridge.run(&argv, RunOptions::with_timeout(None)).await
}

/// Copy a local file to the device with `push <local> <remote>`
pub async fn push(bridge: &Bridge, handle: &str, local: &str, remote: &str) -> ExecResult {
    let argv = bridge.device_command(handle, &["push", local, remote]);
    bridge.run(&argv, bridge.default_options()).await
}

pub fn output_file_name(handle: &str) -> String {
    format!("device_{}.out", handle)
}

/// Write one device's output into `dir`, overwriting any previous file
pub fn write_output_file(dir: &Path, handle: &str, content: &str) -> FleetResult<PathBuf> {
    let path = dir.join(output_file_name(handle));
    std::fs::write(&path, content)?;
    Ok(path)
}

/// Lines printed for one device by the stdout logger
pub fn stdout_entry(handle: &str, content: &str) -> Vec<String> {
    vec![
        format!("Device: {}", handle),
        "Output:".to_string(),
        content.to_string(),
    ]
}
