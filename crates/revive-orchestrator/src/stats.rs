//! Aggregate recovery counters.

use serde::{Deserialize, Serialize};

/// Cumulative counters since the orchestrator was created.
///
/// `successful_recoveries` counts only recoveries achieved by the normal
/// plan; recoveries achieved during escalation are counted separately in
/// `escalation_successes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryStats {
    pub total_attempts: u64,
    pub successful_recoveries: u64,
    pub failed_recoveries: u64,
    /// Cancelled attempts plus attempts over the retry limit.
    pub abandoned_recoveries: u64,
    /// Attempts that entered escalation.
    pub escalations: u64,
    pub escalation_successes: u64,
    /// Monitoring-pass health checks that returned false or errored.
    pub health_check_failures: u64,
}

impl RecoveryStats {
    /// Fraction of completed attempts that ended healthy, in `[0, 1]`.
    pub fn success_rate(&self) -> f64 {
        let recovered = self.successful_recoveries + self.escalation_successes;
        let completed = recovered + self.failed_recoveries + self.abandoned_recoveries;
        if completed == 0 {
            return 0.0;
        }
        recovered as f64 / completed as f64
    }
}
