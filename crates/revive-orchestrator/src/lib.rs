//! revive-orchestrator — self-healing control loop.
//!
//! Monitors registered components through their health checks and drives
//! failed ones back to health by running ordered, retryable recovery
//! methods, escalating to more aggressive methods when the normal plan is
//! exhausted.
//!
//! # Architecture
//!
//! ```text
//! RecoveryOrchestrator (cloneable handle)
//!   ├── ComponentRegistry   id → (HealthCheck, RecoveryPlan), registration order
//!   ├── MethodRegistry      ComponentType → method name → RecoveryAction
//!   ├── Monitoring loop     sequential health pass every health_check_interval
//!   └── Attempt state       active attempts, bounded history, statistics
//!         └── per-attempt task (fire-and-forget)
//!               plan walk → backoff → health re-check → escalation
//! ```
//!
//! # Concurrency
//!
//! Registries and attempt bookkeeping sit behind tokio locks that are only
//! held across non-suspending work; no lock is held while a health check
//! or recovery action runs. Health checks within one pass run strictly in
//! registration order, so a slow check delays every check after it.
//!
//! # Cancellation
//!
//! `cancel_recovery` only rewrites bookkeeping: the attempt is recorded as
//! `Abandoned` immediately, but its task keeps running its current and
//! remaining recovery methods. When that task finishes, its outcome is
//! logged and discarded.

pub mod callback;
mod execution;
pub mod history;
pub mod orchestrator;
pub mod registry;
pub mod report;
pub mod stats;

pub use callback::{
    HealthCheck, RecoveryAction, SharedHealthCheck, SharedRecoveryAction, health_check_fn,
    recovery_action_fn,
};
pub use history::{AttemptHistory, HISTORY_CAPACITY, STATUS_LOOKBACK};
pub use orchestrator::RecoveryOrchestrator;
pub use registry::{ComponentRegistry, MethodRegistry};
pub use report::{RecoveryStatusReport, ServiceStatus};
pub use stats::RecoveryStats;
