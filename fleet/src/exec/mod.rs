//! External process execution
//!
//! [`TimedProcess`] runs one command line with an optional deadline and
//! [`ConcurrencyGate`] bounds how many of them run at the same time. The
//! [`CommandRunner`] trait is the seam test doubles plug into.

mod gate;
mod process;

pub use gate::{ConcurrencyGate, GatePermit, DEFAULT_CAPACITY};
pub use process::{TimedProcess, KILL_GRACE};

use std::time::Duration;

use async_trait::async_trait;
use fleet_common::FleetResult;
use serde::Serialize;

/// Captured outcome of one external process run.
///
/// Every field is `None` when the process never produced a result (launch
/// fault, or a timeout that left nothing behind).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecResult {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl ExecResult {
    /// The all-absent result
    pub fn absent() -> Self {
        Self::default()
    }

    /// A finished run, used by test doubles and the process runner alike
    pub fn completed(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: Some(stdout.into()),
            stderr: Some(stderr.into()),
            exit_code: Some(exit_code),
            timed_out: false,
        }
    }

    /// Stdout, or the empty string when nothing was captured
    pub fn stdout_str(&self) -> &str {
        self.stdout.as_deref().unwrap_or("")
    }

    /// Stderr, or the empty string when nothing was captured
    pub fn stderr_str(&self) -> &str {
        self.stderr.as_deref().unwrap_or("")
    }

    /// True when stdout was captured and holds something besides whitespace
    pub fn has_output(&self) -> bool {
        !self.stdout_str().trim().is_empty()
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs a single command line to completion or until its deadline.
///
/// `argv[0]` is the program. A `None` timeout waits indefinitely.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, argv: &[String], timeout: Option<Duration>) -> FleetResult<ExecResult>;
}
