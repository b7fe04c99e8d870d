//! Configuration loading
//!
//! Values come from a TOML file found in the standard locations, then the
//! command line overrides whatever it sets explicitly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fleet_common::{FleetError, FleetResult};
use serde::{Deserialize, Serialize};

use crate::exec::DEFAULT_CAPACITY;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "ADB_FLEET_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Path or name of the bridge executable
    #[serde(default = "default_adb")]
    pub adb: String,

    /// Maximum number of bridge processes running at once
    #[serde(default = "default_threads")]
    pub threads: usize,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Only talk to these device ids (empty = every connected device)
    #[serde(default)]
    pub devices: Vec<String>,
}

fn default_adb() -> String {
    "adb".to_string()
}

fn default_threads() -> usize {
    DEFAULT_CAPACITY
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            adb: default_adb(),
            threads: default_threads(),
            timeouts: TimeoutConfig::default(),
            devices: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Deadline for ordinary bridge commands, in seconds
    #[serde(default = "default_timeout")]
    pub default_secs: u64,
    /// Deadline for `install`, in seconds
    #[serde(default = "default_install_timeout")]
    pub install_secs: u64,
}

fn default_timeout() -> u64 {
    20
}

fn default_install_timeout() -> u64 {
    40
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_secs: default_timeout(),
            install_secs: default_install_timeout(),
        }
    }
}

impl TimeoutConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.default_secs)
    }

    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_secs)
    }
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub adb: Option<String>,
    pub threads: Option<usize>,
    pub devices: Vec<String>,
}

impl FleetConfig {
    /// Load config from standard file locations
    ///
    /// Config is searched in order:
    /// 1. `ADB_FLEET_CONFIG` env var
    /// 2. `./adb-fleet.toml`
    /// 3. `$XDG_CONFIG_HOME/adb-fleet/config.toml`
    /// 4. `~/.adb-fleet.toml`
    /// 5. Default config if none found
    pub fn load() -> Self {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                match Self::load_from_path(&path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {}={}", CONFIG_ENV, path.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}={}: {}", CONFIG_ENV, path.display(), e);
                    }
                }
            } else {
                tracing::warn!("{}={} does not exist", CONFIG_ENV, env_path);
            }
        }

        Self::load_first(&Self::search_paths())
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("adb-fleet.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("adb-fleet").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".adb-fleet.toml"));
        }

        paths
    }

    /// First existing, parseable file among `paths`, else defaults
    pub fn load_first(paths: &[PathBuf]) -> Self {
        for path in paths {
            if !path.exists() {
                continue;
            }
            match Self::load_from_path(path) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load config {}: {}", path.display(), e);
                }
            }
        }

        tracing::debug!("Using default configuration");
        Self::default()
    }

    /// Load from a specific path
    pub fn load_from_path(path: &Path) -> FleetResult<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| FleetError::Config(e.to_string()))
    }

    pub fn apply(mut self, overrides: ConfigOverrides) -> FleetResult<Self> {
        if let Some(adb) = overrides.adb {
            self.adb = adb;
        }
        if let Some(threads) = overrides.threads {
            self.threads = threads;
        }
        if !overrides.devices.is_empty() {
            self.devices = overrides.devices;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> FleetResult<()> {
        if self.threads == 0 {
            return Err(FleetError::Config("threads must be at least 1".to_string()));
        }
        if self.adb.trim().is_empty() {
            return Err(FleetError::Config("adb path must not be empty".to_string()));
        }
        Ok(())
    }
}
