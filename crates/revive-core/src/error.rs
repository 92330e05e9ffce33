//! Error types for recovery orchestration.

use std::time::Duration;

use thiserror::Error;

use crate::types::ComponentType;

/// Result type alias for recovery operations.
pub type RecoveryResult<T> = Result<T, RecoveryError>;

/// Errors raised while starting or running a recovery attempt.
///
/// Method-level variants are recorded on the attempt and never abort it;
/// the `initiate_recovery` refusals are returned to the caller.
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("health check failed for {component}: {reason}")]
    HealthCheckFailed { component: String, reason: String },

    #[error("recovery method {method} timed out after {timeout:?}")]
    MethodTimeout { method: String, timeout: Duration },

    #[error("recovery method {method} failed: {message}")]
    MethodFailed { method: String, message: String },

    #[error("no recovery method {method} registered for {component_type}")]
    MethodMissing {
        component_type: ComponentType,
        method: String,
    },

    #[error("attempt {attempt_number} exceeds retry limit of {max_attempts}")]
    Exhausted { attempt_number: u32, max_attempts: u32 },

    #[error("escalation exhausted for {0}")]
    EscalationFailed(String),

    #[error("recovery already in progress: {0}")]
    AlreadyInProgress(String),

    #[error("no recovery plan registered: {0}")]
    NoPlan(String),

    #[error("{id} waits on dependency under recovery: {dependency}")]
    DependencyRecovering { id: String, dependency: String },

    #[error("invalid recovery plan: {0}")]
    InvalidPlan(String),

    #[error("internal orchestrator error: {0}")]
    Internal(String),
}

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
