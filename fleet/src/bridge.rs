//! The device-bridge executable and how every command reaches it
//!
//! All bridge invocations go through [`Bridge::run`], which holds a
//! [`ConcurrencyGate`] permit for the lifetime of the process. Launch and
//! IO faults are logged here and turned into an absent result so that a
//! single misbehaving device only costs its own task.

use std::sync::Arc;
use std::time::Duration;

use fleet_common::{FleetError, FleetResult};
use tracing::{debug, warn};

use crate::config::FleetConfig;
use crate::exec::{CommandRunner, ConcurrencyGate, ExecResult, TimedProcess};
use crate::sink::OutputSink;

/// Default deadline for short bridge queries
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Deadline for `install`, which copies and verifies a whole package
pub const INSTALL_TIMEOUT: Duration = Duration::from_secs(40);

/// Per-invocation options
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// `None` waits for the process indefinitely
    pub timeout: Option<Duration>,
    /// Print the command line and its trimmed output through the sink
    pub echo: bool,
}

impl RunOptions {
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            echo: false,
        }
    }

    pub fn echoed(mut self) -> Self {
        self.echo = true;
        self
    }
}

/// Handle on the bridge executable shared by every device task
#[derive(Clone)]
pub struct Bridge {
    program: String,
    runner: Arc<dyn CommandRunner>,
    gate: ConcurrencyGate,
    sink: Arc<OutputSink>,
    default_timeout: Duration,
    install_timeout: Duration,
}

impl Bridge {
    pub fn new(
        program: impl Into<String>,
        runner: Arc<dyn CommandRunner>,
        gate: ConcurrencyGate,
        sink: Arc<OutputSink>,
    ) -> Self {
        Self {
            program: program.into(),
            runner,
            gate,
            sink,
            default_timeout: DEFAULT_TIMEOUT,
            install_timeout: INSTALL_TIMEOUT,
        }
    }

    /// Build the production bridge described by `config`
    pub fn from_config(config: &FleetConfig, sink: Arc<OutputSink>) -> FleetResult<Self> {
        let gate = ConcurrencyGate::new(config.threads)?;
        Ok(Self::new(&config.adb, Arc::new(TimedProcess::new()), gate, sink)
            .with_timeouts(
                config.timeouts.command_timeout(),
                config.timeouts.install_timeout(),
            ))
    }

    pub fn with_timeouts(mut self, default_timeout: Duration, install_timeout: Duration) -> Self {
        self.default_timeout = default_timeout;
        self.install_timeout = install_timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    pub fn sink(&self) -> &OutputSink {
        &self.sink
    }

    pub fn shared_sink(&self) -> Arc<OutputSink> {
        self.sink.clone()
    }

    pub fn default_options(&self) -> RunOptions {
        RunOptions::with_timeout(Some(self.default_timeout))
    }

    pub fn install_options(&self) -> RunOptions {
        RunOptions::with_timeout(Some(self.install_timeout))
    }

    /// `[<bridge>, args...]`
    pub fn command<S: AsRef<str>>(&self, args: &[S]) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(args.iter().map(|a| a.as_ref().to_string()))
            .collect()
    }

    /// `[<bridge>, -s, <handle>, args...]`
    pub fn device_command<S: AsRef<str>>(&self, handle: &str, args: &[S]) -> Vec<String> {
        let mut argv = self.command(&["-s", handle]);
        argv.extend(args.iter().map(|a| a.as_ref().to_string()));
        argv
    }

    /// Run a full command line under a gate permit, propagating launch faults
    pub async fn try_run(&self, argv: &[String], options: RunOptions) -> FleetResult<ExecResult> {
        let _permit = self.gate.acquire().await;

        if options.echo {
            self.sink.print_line(argv.join(" "));
        }

        let result = self.runner.run(argv, options.timeout).await?;
        debug!(
            command = %argv.join(" "),
            exit_code = ?result.exit_code,
            timed_out = result.timed_out,
            "Bridge command finished"
        );

        if options.echo {
            for stream in [result.stdout_str(), result.stderr_str()] {
                let trimmed = stream.trim();
                if !trimmed.is_empty() {
                    self.sink.print_line(trimmed);
                }
            }
        }

        Ok(result)
    }

    /// Run a full command line; launch and IO faults yield an absent result
    pub async fn run(&self, argv: &[String], options: RunOptions) -> ExecResult {
        match self.try_run(argv, options).await {
            Ok(result) => result,
            Err(e) => {
                warn!(command = %argv.join(" "), "Bridge command failed: {}", e);
                ExecResult::absent()
            }
        }
    }

    /// Run `-s <handle> args...` with the default deadline
    pub async fn run_on<S: AsRef<str>>(&self, handle: &str, args: &[S]) -> ExecResult {
        let argv = self.device_command(handle, args);
        self.run(&argv, self.default_options()).await
    }

    /// `[<bridge>, -s, <handle>, shell, args...]`
    pub fn shell_command<S: AsRef<str>>(&self, handle: &str, args: &[S]) -> Vec<String> {
        let mut argv = self.device_command(handle, &["shell"]);
        argv.extend(args.iter().map(|a| a.as_ref().to_string()));
        argv
    }

    /// Run `-s <handle> shell args...` with the default deadline
    pub async fn shell<S: AsRef<str>>(&self, handle: &str, args: &[S]) -> ExecResult {
        let argv = self.shell_command(handle, args);
        self.run(&argv, self.default_options()).await
    }

    /// Start the bridge server; failure here means no device work is possible
    pub async fn start_server(&self) -> FleetResult<()> {
        let argv = self.command(&["start-server"]);
        match self.try_run(&argv, self.default_options()).await {
            Ok(result) if result.timed_out => Err(FleetError::BridgeUnavailable(format!(
                "'{}' did not finish in time",
                argv.join(" ")
            ))),
            Ok(_) => Ok(()),
            Err(e) if e.is_missing_program() => Err(FleetError::BridgeUnavailable(format!(
                "'{}' not found (set --adb or ADB_FLEET_ADB)",
                self.program()
            ))),
            Err(e) => Err(FleetError::BridgeUnavailable(e.to_string())),
        }
    }
}
