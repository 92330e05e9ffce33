//! Shared fixtures for orchestrator scenario tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use revive_core::{RecoveryAttempt, RecoveryConfig};
use revive_orchestrator::{
    RecoveryOrchestrator, RecoveryStatusReport, SharedHealthCheck, SharedRecoveryAction,
    health_check_fn, recovery_action_fn,
};

/// Millisecond-scale config so scenarios finish quickly.
pub fn fast_config() -> RecoveryConfig {
    RecoveryConfig {
        max_retry_attempts: 3,
        initial_retry_delay: Duration::from_millis(1),
        max_retry_delay: Duration::from_millis(5),
        exponential_backoff_factor: 2.0,
        health_check_interval: Duration::from_millis(20),
        recovery_timeout: Duration::from_millis(250),
        escalation_enabled: false,
        respect_dependencies: true,
    }
}

/// A health flag shared between a health check and the actions that fix it.
#[derive(Clone, Default)]
pub struct HealthFlag(Arc<AtomicBool>);

impl HealthFlag {
    pub fn new(healthy: bool) -> Self {
        Self(Arc::new(AtomicBool::new(healthy)))
    }

    pub fn set(&self, healthy: bool) {
        self.0.store(healthy, Ordering::SeqCst);
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> SharedHealthCheck {
        let flag = self.0.clone();
        health_check_fn(move || {
            let flag = flag.clone();
            async move { anyhow::Ok(flag.load(Ordering::SeqCst)) }
        })
    }
}

/// Ordered log of recovery method invocations.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn record(&self, entry: &str) {
        self.0.lock().unwrap().push(entry.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }
}

/// Action that logs its call and returns `result`.
pub fn reporting(log: &CallLog, name: &str, result: bool) -> SharedRecoveryAction {
    let log = log.clone();
    let name = name.to_string();
    recovery_action_fn(move |_| {
        let log = log.clone();
        let name = name.clone();
        async move {
            log.record(&name);
            anyhow::Ok(result)
        }
    })
}

/// Action that logs its call, then errors.
pub fn erroring(log: &CallLog, name: &str) -> SharedRecoveryAction {
    let log = log.clone();
    let name = name.to_string();
    recovery_action_fn(move |_| {
        let log = log.clone();
        let name = name.clone();
        async move {
            log.record(&name);
            Err::<bool, _>(anyhow::anyhow!("{name} exploded"))
        }
    })
}

/// Action that logs its call, marks the component healthy, and succeeds.
pub fn healing(log: &CallLog, name: &str, flag: &HealthFlag) -> SharedRecoveryAction {
    let log = log.clone();
    let name = name.to_string();
    let flag = flag.clone();
    recovery_action_fn(move |_| {
        let log = log.clone();
        let name = name.clone();
        let flag = flag.clone();
        async move {
            log.record(&name);
            flag.set(true);
            anyhow::Ok(true)
        }
    })
}

/// Action that logs its call and then sleeps for `delay` before succeeding.
pub fn slow(log: &CallLog, name: &str, delay: Duration) -> SharedRecoveryAction {
    let log = log.clone();
    let name = name.to_string();
    recovery_action_fn(move |_| {
        let log = log.clone();
        let name = name.clone();
        async move {
            log.record(&name);
            tokio::time::sleep(delay).await;
            anyhow::Ok(true)
        }
    })
}

/// Poll until the component has no active attempt and return its last attempt.
pub async fn wait_for_completion(
    orchestrator: &RecoveryOrchestrator,
    component_id: &str,
) -> RecoveryAttempt {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let RecoveryStatusReport::Completed(attempt) =
            orchestrator.get_recovery_status(component_id).await
        {
            return attempt;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "recovery of {component_id} did not complete in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Poll until `predicate` holds on the orchestrator.
pub async fn wait_until<F, Fut>(mut predicate: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !predicate().await {
        assert!(tokio::time::Instant::now() < deadline, "condition not met in time");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
