//! Read-only views returned by the query surface.

use serde::Serialize;

use revive_core::{RecoveryAttempt, RecoveryConfig, RecoveryStatus};

use crate::stats::RecoveryStats;

/// Result of `get_recovery_status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RecoveryStatusReport {
    /// An attempt is running right now.
    Active {
        component_id: String,
        attempt_number: u32,
        status: RecoveryStatus,
        elapsed_ms: u64,
        current_method: Option<String>,
    },
    /// No active attempt; the latest recent one from history.
    Completed(RecoveryAttempt),
    /// Nothing known about this component.
    Unknown,
}

impl RecoveryStatusReport {
    /// The attempt status, if anything is known.
    pub fn status(&self) -> Option<RecoveryStatus> {
        match self {
            RecoveryStatusReport::Active { status, .. } => Some(*status),
            RecoveryStatusReport::Completed(attempt) => Some(attempt.status),
            RecoveryStatusReport::Unknown => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, RecoveryStatusReport::Active { .. })
    }
}

/// Result of `get_service_status`.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub running: bool,
    pub active_recoveries: usize,
    pub registered_components: usize,
    pub statistics: RecoveryStats,
    pub config: RecoveryConfig,
}
