//! Circuit breaker recovery methods (`circuit_breaker_<name>`).
//!
//! A breaker stuck open is "unhealthy". Resetting returns it to closed
//! with cleared counters; half-opening lets a probe request through
//! first. Forcing it closed ignores the failure window and is only used
//! on escalation.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use revive_core::ComponentType;
use revive_orchestrator::{RecoveryAction, RecoveryOrchestrator};

use crate::ids;

#[async_trait]
pub trait CircuitBreakerRegistry: Send + Sync {
    async fn reset_breaker(&self, name: &str) -> anyhow::Result<bool>;
    async fn half_open_breaker(&self, name: &str) -> anyhow::Result<bool>;
    async fn force_close_breaker(&self, name: &str) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitBreakerMethod {
    ResetBreaker,
    HalfOpenBreaker,
    ForceCloseBreaker,
}

impl CircuitBreakerMethod {
    pub const ALL: [CircuitBreakerMethod; 3] = [
        CircuitBreakerMethod::ResetBreaker,
        CircuitBreakerMethod::HalfOpenBreaker,
        CircuitBreakerMethod::ForceCloseBreaker,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CircuitBreakerMethod::ResetBreaker => "reset_breaker",
            CircuitBreakerMethod::HalfOpenBreaker => "half_open_breaker",
            CircuitBreakerMethod::ForceCloseBreaker => "force_close_breaker",
        }
    }
}

struct CircuitBreakerRecovery {
    registry: Arc<dyn CircuitBreakerRegistry>,
    method: CircuitBreakerMethod,
}

#[async_trait]
impl RecoveryAction for CircuitBreakerRecovery {
    async fn recover(&self, component_id: &str) -> anyhow::Result<bool> {
        let Some(name) = ids::circuit_breaker_name(component_id) else {
            return ids::unrecognized(component_id, self.method.name());
        };
        debug!(breaker = %name, method = self.method.name(), "recovering circuit breaker");

        match self.method {
            CircuitBreakerMethod::ResetBreaker => self.registry.reset_breaker(&name).await,
            CircuitBreakerMethod::HalfOpenBreaker => self.registry.half_open_breaker(&name).await,
            CircuitBreakerMethod::ForceCloseBreaker => {
                self.registry.force_close_breaker(&name).await
            }
        }
    }
}

pub async fn register_circuit_breaker_recovery(
    orchestrator: &RecoveryOrchestrator,
    registry: Arc<dyn CircuitBreakerRegistry>,
) -> usize {
    for method in CircuitBreakerMethod::ALL {
        let action = Arc::new(CircuitBreakerRecovery {
            registry: registry.clone(),
            method,
        });
        orchestrator
            .register_recovery_method(ComponentType::CircuitBreaker, method.name(), action)
            .await;
    }
    info!(
        methods = CircuitBreakerMethod::ALL.len(),
        "circuit breaker recovery methods registered"
    );
    CircuitBreakerMethod::ALL.len()
}
