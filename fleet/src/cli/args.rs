//! CLI argument definitions
//!
//! Contains the main CLI struct and Commands enum for clap parsing.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use fleet_common::FleetError;

use crate::adb::{button_names, keycode, LogType, Point, DEFAULT_ACTIVITY};
use crate::config::ConfigOverrides;
use crate::fleet::{OutputFormat, Task};

#[derive(Parser)]
#[command(name = "adb-fleet")]
#[command(about = "Run adb commands on every connected Android device at once")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the adb executable (default: from adb-fleet.toml or "adb")
    #[arg(long, env = "ADB_FLEET_ADB", global = true)]
    pub adb: Option<String>,

    /// Maximum number of adb processes running at once
    #[arg(long, env = "ADB_FLEET_THREADS", global = true)]
    pub threads: Option<usize>,

    /// Only act on this device (repeatable)
    #[arg(short = 's', long = "device", global = true)]
    pub devices: Vec<String>,

    /// Print reports as JSON (list, has, running)
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase verbosity (-v info, -vv debug, -vvv trace). Default is warn.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            adb: self.adb.clone(),
            threads: self.threads,
            devices: self.devices.clone(),
        }
    }

    pub fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScreenState {
    On,
    Off,
}

impl ScreenState {
    pub fn is_on(self) -> bool {
        self == ScreenState::On
    }
}

#[derive(Subcommand)]
pub enum Commands {
    // =========================================================================
    // Inventory
    // =========================================================================
    /// List connected devices with brand, model, version, battery and state
    List {
        /// Only print device ids
        #[arg(short, long)]
        quick: bool,
        /// Also show ip, serial and lock state
        #[arg(long)]
        wide: bool,
    },
    /// Check whether a package is installed everywhere
    Has {
        /// Package name
        package: String,
    },
    /// Check whether a package is running everywhere
    Running {
        /// Package name
        package: String,
    },

    // =========================================================================
    // Input
    // =========================================================================
    /// Tap a screen location
    Tap {
        /// Location as x,y
        #[arg(value_parser = parse_point)]
        location: Point,
    },
    /// Swipe between two screen locations
    Swipe {
        /// Start as x,y
        #[arg(value_parser = parse_point)]
        start: Point,
        /// End as x,y
        #[arg(value_parser = parse_point)]
        end: Point,
    },
    /// Press a named button (e.g. home, back, power, a, enter)
    Press {
        #[arg(value_parser = parse_button)]
        button: String,
    },
    /// Turn the screen on or off
    Screen {
        #[arg(value_enum)]
        state: ScreenState,
    },
    /// Wake and unlock the screen
    Unlock,

    // =========================================================================
    // Power
    // =========================================================================
    /// Power devices off
    Shutdown,
    /// Reboot devices sitting powered off on the charging screen
    TurnOn,
    /// Reboot devices
    Reboot,

    // =========================================================================
    // Packages
    // =========================================================================
    /// Install (or reinstall) an APK
    Install {
        /// Path to the APK
        apk: PathBuf,
    },
    /// Copy a local file to every device
    Push {
        /// Local file
        local: PathBuf,
        /// Destination path on the device
        remote: String,
    },
    /// Uninstall a package
    Uninstall {
        /// Package name
        package: String,
    },
    /// Start an activity
    Start {
        /// Package name
        package: String,
        /// Activity name inside the package
        #[arg(long, default_value = DEFAULT_ACTIVITY)]
        activity: String,
        /// Intent action
        #[arg(long)]
        action: Option<String>,
        /// Intent data URI
        #[arg(short = 'd', long)]
        data: Option<String>,
        /// String extra as key=value (repeatable)
        #[arg(short = 'e', long = "extra", value_parser = parse_extra)]
        extras: Vec<(String, String)>,
    },
    /// Force-stop a package
    Stop {
        /// Package name
        package: String,
    },
    /// Force-stop a package, then start its main activity
    Restart {
        /// Package name
        package: String,
    },

    // =========================================================================
    // Raw access
    // =========================================================================
    /// Run a shell command on every device
    Shell {
        /// Where to send each device's output
        #[arg(long, value_enum, default_value_t = LogType::None)]
        log_type: LogType,
        /// Directory for output files when --log-type=file
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Command and arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Run a predefined task
    Run {
        #[arg(value_enum)]
        task: Task,
    },
}

/// Parse `x,y` into a screen location
pub fn parse_point(value: &str) -> Result<Point, FleetError> {
    let invalid = || FleetError::InvalidCoordinate(value.to_string());
    let (x, y) = value.split_once(',').ok_or_else(invalid)?;
    let x = x.trim().parse().map_err(|_| invalid())?;
    let y = y.trim().parse().map_err(|_| invalid())?;
    Ok((x, y))
}

/// Accept only names from the keyevent table, listing them on error
pub fn parse_button(value: &str) -> Result<String, FleetError> {
    if keycode(value).is_err() {
        let known: Vec<&str> = button_names().collect();
        return Err(FleetError::UnknownButton(format!(
            "{} (known: {})",
            value,
            known.join(", ")
        )));
    }
    Ok(value.to_string())
}

/// Parse `key=value`; the value may itself contain `=`
pub fn parse_extra(value: &str) -> Result<(String, String), FleetError> {
    match value.split_once('=') {
        Some((key, extra)) if !key.is_empty() => Ok((key.to_string(), extra.to_string())),
        _ => Err(FleetError::Parse(format!(
            "extras must be key=value (got '{}')",
            value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("100,400").unwrap(), (100, 400));
        assert_eq!(parse_point(" 5 , 7 ").unwrap(), (5, 7));
        assert!(matches!(
            parse_point("100"),
            Err(FleetError::InvalidCoordinate(_))
        ));
        assert!(parse_point("a,b").is_err());
    }

    #[test]
    fn test_parse_extra() {
        assert_eq!(
            parse_extra("url=http://x?a=b").unwrap(),
            ("url".to_string(), "http://x?a=b".to_string())
        );
        assert!(parse_extra("novalue").is_err());
        assert!(parse_extra("=x").is_err());
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "adb-fleet", "has", "com.example", "--json", "-s", "A", "-s", "B", "-vv",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.overrides().devices, vec!["A", "B"]);
        assert!(matches!(cli.command, Commands::Has { ref package } if package == "com.example"));
    }

    #[test]
    fn test_parse_button_lists_known_names() {
        assert_eq!(parse_button("home").unwrap(), "home");

        let message = parse_button("jump").unwrap_err().to_string();
        assert!(message.contains("jump"));
        assert!(message.contains("soft_right"));
        assert!(message.contains("search"));
    }

    #[test]
    fn test_cli_rejects_unknown_button() {
        assert!(Cli::try_parse_from(["adb-fleet", "press", "jump"]).is_err());
        assert!(Cli::try_parse_from(["adb-fleet", "press", "home"]).is_ok());
    }

    #[test]
    fn test_cli_swipe_and_shell() {
        let cli = Cli::try_parse_from(["adb-fleet", "swipe", "100,400", "300,400"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Swipe {
                start: (100, 400),
                end: (300, 400)
            }
        ));

        let cli =
            Cli::try_parse_from(["adb-fleet", "shell", "--log-type", "file", "ls", "-la"]).unwrap();
        let Commands::Shell {
            log_type, command, ..
        } = cli.command
        else {
            panic!("expected shell");
        };
        assert_eq!(log_type, LogType::File);
        assert_eq!(command, vec!["ls", "-la"]);
    }

    #[test]
    fn test_start_flags() {
        let cli = Cli::try_parse_from([
            "adb-fleet", "start", "com.example", "-d", "http://x", "-e", "k=v",
        ])
        .unwrap();
        let Commands::Start {
            activity,
            data,
            extras,
            ..
        } = cli.command
        else {
            panic!("expected start");
        };

        assert_eq!(activity, DEFAULT_ACTIVITY);
        assert_eq!(data.as_deref(), Some("http://x"));
        assert_eq!(extras, vec![("k".to_string(), "v".to_string())]);
    }

    #[test]
    fn test_run_task_name() {
        let cli = Cli::try_parse_from(["adb-fleet", "run", "disable_verify_apps"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Run {
                task: Task::DisableVerifyApps
            }
        ));
    }
}
