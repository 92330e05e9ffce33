//! revive-adapters — the subsystem-facing side of recovery.
//!
//! Each subsystem module defines a service trait for the thing it
//! controls and a `register_*_recovery` function that turns every trait
//! method into a named recovery method on the orchestrator.
//!
//! # Architecture
//!
//! ```text
//! RecoveryOrchestrator
//!   ├── register_recovery_method  ◄── stream / remote_server / plugin /
//!   │                                 database / queue / circuit_breaker
//!   │                                 (service trait → RecoveryAction)
//!   │                             ◄── command::CommandAction (external argv)
//!   └── register_component        ◄── bootstrap::register_inventory
//!                                     (ComponentInventory + HealthSource)
//!                                 ◄── probe::HttpProbe / probe::TcpProbe
//! ```
//!
//! Recovery actions decode the component id (see [`ids`]) to find the
//! subsystem key. An id that does not decode is "not recovered", never
//! an error.

pub mod bootstrap;
pub mod circuit_breaker;
pub mod command;
pub mod database;
pub mod ids;
pub mod plugin;
pub mod probe;
pub mod queue;
pub mod remote_server;
pub mod stream;

pub use bootstrap::{ComponentInventory, HealthSource, register_inventory};
pub use circuit_breaker::{CircuitBreakerRegistry, register_circuit_breaker_recovery};
pub use command::CommandAction;
pub use database::{DatabaseEngine, register_database_recovery};
pub use ids::ComponentRef;
pub use plugin::{PluginManager, register_plugin_recovery};
pub use probe::{HttpProbe, TcpProbe};
pub use queue::{QueueManager, register_queue_recovery};
pub use remote_server::{RemoteServerManager, register_remote_server_recovery};
pub use stream::{StreamManager, register_stream_recovery};
