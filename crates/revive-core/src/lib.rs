//! revive-core — shared data model for the Revive recovery orchestrator.
//!
//! Defines the component taxonomy, recovery attempt records, recovery
//! plans, the tunable `RecoveryConfig`, and the daemon's TOML config file.
//! Everything here is plain data: no async, no I/O beyond reading a config
//! file. The orchestrator and adapters build on these types.
//!
//! # Attempt lifecycle
//!
//! ```text
//! Pending ──► InProgress ──┬──► Succeeded
//!                          ├──► Failed
//!                          ├──► Abandoned
//!                          └──► Escalated ──┬──► Succeeded
//!                                           └──► Failed
//! ```

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    ComponentConfig, DaemonConfig, MethodConfig, ProbeConfig, RecoveryConfig, format_duration,
    parse_duration,
};
pub use error::{ConfigError, RecoveryError, RecoveryResult};
pub use types::*;
