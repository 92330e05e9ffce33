//! Collaborator contracts: health checks and recovery actions.
//!
//! Both are async and fallible. An `Err` from either is never propagated:
//! a failing health check counts as unhealthy, a failing recovery action
//! counts as "this method did not work".

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

/// Asks a component whether it is healthy. Expected to be side-effect free.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self) -> anyhow::Result<bool>;
}

/// One named way of fixing a component.
///
/// May be slow (the orchestrator bounds it with `recovery_timeout`) and
/// must tolerate being invoked again after a timeout.
#[async_trait]
pub trait RecoveryAction: Send + Sync {
    /// Try to recover `component_id`. `Ok(true)` means the action believes
    /// it worked; the orchestrator still re-runs the health check.
    async fn recover(&self, component_id: &str) -> anyhow::Result<bool>;
}

pub type SharedHealthCheck = Arc<dyn HealthCheck>;
pub type SharedRecoveryAction = Arc<dyn RecoveryAction>;

/// Adapter turning an async closure into a `HealthCheck`.
pub struct FnHealthCheck<F>(F);

#[async_trait]
impl<F, Fut> HealthCheck for FnHealthCheck<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
{
    async fn check(&self) -> anyhow::Result<bool> {
        (self.0)().await
    }
}

/// Adapter turning an async closure into a `RecoveryAction`.
pub struct FnRecoveryAction<F>(F);

#[async_trait]
impl<F, Fut> RecoveryAction for FnRecoveryAction<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
{
    async fn recover(&self, component_id: &str) -> anyhow::Result<bool> {
        (self.0)(component_id.to_string()).await
    }
}

/// Wrap an async closure as a shared health check.
pub fn health_check_fn<F, Fut>(f: F) -> SharedHealthCheck
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
{
    Arc::new(FnHealthCheck(f))
}

/// Wrap an async closure as a shared recovery action.
pub fn recovery_action_fn<F, Fut>(f: F) -> SharedRecoveryAction
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
{
    Arc::new(FnRecoveryAction(f))
}
