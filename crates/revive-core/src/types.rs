//! Domain types for recovery orchestration.
//!
//! These types describe what can be recovered (`ComponentType`), how
//! (`RecoveryPlan`), and what happened (`RecoveryAttempt`). All of them
//! are serializable so status views can be handed to an API or logged
//! as JSON.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::RecoveryConfig;
use crate::error::{RecoveryError, RecoveryResult};

/// Unique identifier for a monitored component (e.g. `stream_7`).
pub type ComponentId = String;

// ── Component type ─────────────────────────────────────────────────

/// The kind of runtime component under supervision.
///
/// Selects both the recovery-method sub-table and the default plan and
/// escalation lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Stream,
    RemoteServer,
    Plugin,
    Database,
    Queue,
    CircuitBreaker,
}

impl ComponentType {
    pub const ALL: [ComponentType; 6] = [
        ComponentType::Stream,
        ComponentType::RemoteServer,
        ComponentType::Plugin,
        ComponentType::Database,
        ComponentType::Queue,
        ComponentType::CircuitBreaker,
    ];

    /// Ordered recovery methods used when a component is registered
    /// without an explicit plan.
    pub fn default_methods(self) -> &'static [&'static str] {
        match self {
            ComponentType::Stream => &["restart_stream", "reset_plugin", "reconnect_remote"],
            ComponentType::RemoteServer => &["reconnect_server", "reset_connection"],
            ComponentType::Plugin => &["restart_plugin", "reload_plugin"],
            ComponentType::Database => &["reconnect_database", "reset_pool"],
            ComponentType::Queue => &["restart_queue", "drain_queue"],
            ComponentType::CircuitBreaker => &["reset_breaker", "half_open_breaker"],
        }
    }

    /// More aggressive methods tried once the normal plan is exhausted.
    pub fn escalation_methods(self) -> &'static [&'static str] {
        match self {
            ComponentType::Stream => &["force_restart", "recreate_stream"],
            ComponentType::RemoteServer => &["force_reconnect"],
            ComponentType::Plugin => &["reinstall_plugin"],
            ComponentType::Database => &["recreate_pool"],
            ComponentType::Queue => &["purge_queue"],
            ComponentType::CircuitBreaker => &["force_close_breaker"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ComponentType::Stream => "stream",
            ComponentType::RemoteServer => "remote_server",
            ComponentType::Plugin => "plugin",
            ComponentType::Database => "database",
            ComponentType::Queue => "queue",
            ComponentType::CircuitBreaker => "circuit_breaker",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = RecoveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComponentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| RecoveryError::InvalidPlan(format!("unknown component type: {s}")))
    }
}

// ── Attempt status ─────────────────────────────────────────────────

/// Status of a single recovery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStatus {
    Pending,
    InProgress,
    Succeeded,
    Failed,
    /// Escalation methods are running. Always followed by `Succeeded` or `Failed`.
    Escalated,
    Abandoned,
}

impl RecoveryStatus {
    /// Whether the attempt has reached a final outcome.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RecoveryStatus::Succeeded | RecoveryStatus::Failed | RecoveryStatus::Abandoned
        )
    }
}

impl fmt::Display for RecoveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecoveryStatus::Pending => "pending",
            RecoveryStatus::InProgress => "in_progress",
            RecoveryStatus::Succeeded => "succeeded",
            RecoveryStatus::Failed => "failed",
            RecoveryStatus::Escalated => "escalated",
            RecoveryStatus::Abandoned => "abandoned",
        };
        f.write_str(s)
    }
}

// ── Attempt ────────────────────────────────────────────────────────

/// One execution of a component's recovery plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryAttempt {
    pub component_id: ComponentId,
    pub component_type: ComponentType,
    /// Strictly increasing per component across its full history.
    pub attempt_number: u32,
    /// Unix timestamp (milliseconds) when the attempt was created.
    pub started_at: u64,
    /// Unix timestamp (milliseconds) when the attempt reached a final status.
    pub completed_at: Option<u64>,
    pub status: RecoveryStatus,
    /// Last error observed while running recovery methods.
    pub error_message: Option<String>,
    /// Last recovery method tried (the winning one on success).
    pub recovery_method: Option<String>,
    pub duration_ms: Option<u64>,
}

impl RecoveryAttempt {
    /// Create a pending attempt stamped with the current time.
    pub fn new(component_id: &str, component_type: ComponentType, attempt_number: u32) -> Self {
        Self {
            component_id: component_id.to_string(),
            component_type,
            attempt_number,
            started_at: epoch_millis(),
            completed_at: None,
            status: RecoveryStatus::Pending,
            error_message: None,
            recovery_method: None,
            duration_ms: None,
        }
    }

    /// Stamp completion time and duration.
    pub fn finish(&mut self) {
        let now = epoch_millis();
        self.completed_at = Some(now);
        self.duration_ms = Some(now.saturating_sub(self.started_at));
    }

    /// Milliseconds since the attempt started.
    pub fn elapsed_ms(&self) -> u64 {
        self.completed_at
            .unwrap_or_else(epoch_millis)
            .saturating_sub(self.started_at)
    }
}

// ── Plan ───────────────────────────────────────────────────────────

/// Per-component recovery configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryPlan {
    pub component_id: ComponentId,
    pub component_type: ComponentType,
    /// Method names, tried in order.
    pub recovery_methods: Vec<String>,
    /// Components that must not be under recovery when this one starts.
    pub dependencies: BTreeSet<ComponentId>,
    pub priority: u32,
    /// Overrides the orchestrator default when set.
    pub config: Option<RecoveryConfig>,
}

impl RecoveryPlan {
    /// Plan built from the type's default method list.
    pub fn new(component_id: &str, component_type: ComponentType) -> Self {
        Self {
            component_id: component_id.to_string(),
            component_type,
            recovery_methods: component_type
                .default_methods()
                .iter()
                .map(|m| m.to_string())
                .collect(),
            dependencies: BTreeSet::new(),
            priority: 1,
            config: None,
        }
    }

    /// Builder method: replace the ordered method list.
    pub fn with_methods<I, S>(self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            recovery_methods: methods.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    /// Builder method: add a dependency.
    pub fn with_dependency(mut self, component_id: &str) -> Self {
        self.dependencies.insert(component_id.to_string());
        self
    }

    pub fn with_priority(self, priority: u32) -> Self {
        Self { priority, ..self }
    }

    /// Builder method: attach a config override.
    pub fn with_config(self, config: RecoveryConfig) -> Self {
        Self {
            config: Some(config),
            ..self
        }
    }

    /// Reject plans the execution routine cannot run.
    pub fn validate(&self) -> RecoveryResult<()> {
        if self.component_id.is_empty() {
            return Err(RecoveryError::InvalidPlan(
                "plan has an empty component id".to_string(),
            ));
        }
        if let Some(pos) = self.recovery_methods.iter().position(|m| m.trim().is_empty()) {
            return Err(RecoveryError::InvalidPlan(format!(
                "plan for {} has an empty method name at position {pos}",
                self.component_id
            )));
        }
        if self.dependencies.contains(&self.component_id) {
            return Err(RecoveryError::InvalidPlan(format!(
                "plan for {} depends on itself",
                self.component_id
            )));
        }
        if let Some(config) = &self.config {
            config.validate().map_err(|e| {
                RecoveryError::InvalidPlan(format!(
                    "plan for {} has invalid config: {e}",
                    self.component_id
                ))
            })?;
        }
        Ok(())
    }
}

/// Current Unix time in milliseconds.
pub fn epoch_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
