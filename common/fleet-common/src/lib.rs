//! Fleet Common - Shared utilities for adb-fleet
//!
//! This crate provides the ambient pieces every fleet binary needs:
//!
//! - **Initialization**: [`init_tracing`] for standardized log setup on stderr
//! - **Errors**: [`FleetError`], the error taxonomy shared by the bridge,
//!   the dispatcher and the CLI
//!
//! # Example
//!
//! ```rust,ignore
//! use fleet_common::{init_tracing, FleetResult};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_tracing("adb_fleet", 1)?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod init;

// Re-export commonly used items at crate root
pub use error::{FleetError, FleetResult};
pub use init::{init_tracing, level_for_verbosity};
