//! Run adb commands across every connected Android device concurrently

pub mod adb;
pub mod bridge;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod exec;
pub mod fleet;
pub mod retry;
pub mod sink;

#[cfg(test)]
pub(crate) mod test_support;

pub use bridge::Bridge;
pub use config::FleetConfig;
pub use dispatch::{Dispatcher, ResultSet, TaskError};
pub use exec::{CommandRunner, ExecResult, TimedProcess};
pub use fleet::{Fleet, OutputFormat};
pub use sink::OutputSink;
