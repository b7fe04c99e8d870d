//! CLI module
//!
//! Argument definitions and the value parsers clap uses for coordinates,
//! buttons and intent extras.

pub mod args;

pub use args::{Cli, Commands, ScreenState};
