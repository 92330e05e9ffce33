//! Recovery orchestrator — registries, monitoring loop, attempt bookkeeping.
//!
//! `RecoveryOrchestrator` is a cheap, cloneable handle. Collaborators get
//! a clone passed to them explicitly; there is no global instance.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use revive_core::{
    ComponentId, ComponentType, RecoveryAttempt, RecoveryConfig, RecoveryError, RecoveryPlan,
    RecoveryResult, RecoveryStatus,
};

use crate::callback::{SharedHealthCheck, SharedRecoveryAction};
use crate::execution;
use crate::history::{AttemptHistory, STATUS_LOOKBACK};
use crate::registry::{ComponentRegistry, MethodRegistry};
use crate::report::{RecoveryStatusReport, ServiceStatus};
use crate::stats::RecoveryStats;

/// Handle to the background monitoring loop.
struct MonitorSlot {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

/// Mutable attempt bookkeeping. Only touched under `Inner::attempts`.
#[derive(Default)]
pub(crate) struct AttemptState {
    /// Component id → the attempt currently considered active for it.
    active: HashMap<ComponentId, RecoveryAttempt>,
    history: AttemptHistory,
    /// Highest attempt number handed out per component. Survives eviction.
    attempt_counters: HashMap<ComponentId, u32>,
    /// Attempts already recorded as abandoned by `cancel_recovery` whose
    /// tasks have not finished yet.
    cancelled: HashSet<(ComponentId, u32)>,
    stats: RecoveryStats,
}

struct Inner {
    config: RecoveryConfig,
    components: RwLock<ComponentRegistry>,
    methods: RwLock<MethodRegistry>,
    attempts: Mutex<AttemptState>,
    monitor: Mutex<Option<MonitorSlot>>,
}

/// Self-healing control loop over registered components.
#[derive(Clone)]
pub struct RecoveryOrchestrator {
    inner: Arc<Inner>,
}

impl RecoveryOrchestrator {
    /// Create an orchestrator with the given default config.
    pub fn new(config: RecoveryConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                components: RwLock::new(ComponentRegistry::new()),
                methods: RwLock::new(MethodRegistry::new()),
                attempts: Mutex::new(AttemptState::default()),
                monitor: Mutex::new(None),
            }),
        }
    }

    /// Default config, used for plans without an override.
    pub fn config(&self) -> &RecoveryConfig {
        &self.inner.config
    }

    // ── Registration ───────────────────────────────────────────────

    /// Register (or silently replace) a component.
    ///
    /// Without an explicit plan, one is synthesized from the type's
    /// default method list.
    pub async fn register_component(
        &self,
        component_id: &str,
        component_type: ComponentType,
        health_check: SharedHealthCheck,
        plan: Option<RecoveryPlan>,
    ) {
        let replaced = self.inner.components.write().await.register(
            component_id,
            component_type,
            health_check,
            plan,
        );
        info!(
            component = %component_id,
            component_type = %component_type,
            replaced,
            "component registered for recovery"
        );
    }

    /// Stop monitoring a component. Running attempts finish normally.
    pub async fn unregister_component(&self, component_id: &str) -> bool {
        let removed = self
            .inner
            .components
            .write()
            .await
            .unregister(component_id)
            .is_some();
        if removed {
            info!(component = %component_id, "component unregistered");
        }
        removed
    }

    /// Register a recovery action under `(component_type, name)`.
    pub async fn register_recovery_method(
        &self,
        component_type: ComponentType,
        name: &str,
        action: SharedRecoveryAction,
    ) {
        let replaced = self
            .inner
            .methods
            .write()
            .await
            .register(component_type, name, action);
        debug!(%component_type, method = %name, replaced, "recovery method registered");
    }

    /// Component ids in registration (monitoring) order.
    pub async fn registered_components(&self) -> Vec<ComponentId> {
        self.inner.components.read().await.ids()
    }

    /// Plan and escalation method names the component would skip because
    /// nothing is registered under them. Empty for unknown components.
    pub async fn missing_methods(&self, component_id: &str) -> Vec<String> {
        let Some(plan) = self.inner.components.read().await.plan(component_id) else {
            return Vec::new();
        };
        let escalation_enabled = plan
            .config
            .as_ref()
            .unwrap_or(&self.inner.config)
            .escalation_enabled;

        let methods = self.inner.methods.read().await;
        let escalation: &[&str] = if escalation_enabled {
            plan.component_type.escalation_methods()
        } else {
            &[]
        };
        plan.recovery_methods
            .iter()
            .map(String::as_str)
            .chain(escalation.iter().copied())
            .filter(|name| !methods.contains(plan.component_type, name))
            .map(str::to_string)
            .collect()
    }

    // ── Attempt lifecycle ──────────────────────────────────────────

    /// Start a recovery attempt for `component_id` unless one is active.
    ///
    /// Returns the new attempt number once its task is scheduled; it does
    /// not wait for the attempt to finish.
    pub async fn initiate_recovery(&self, component_id: &str) -> RecoveryResult<u32> {
        self.start_attempt(component_id, false).await
    }

    /// Start an attempt even if one is already active for the component.
    ///
    /// The earlier attempt keeps running concurrently; the new one becomes
    /// the active attempt reported by `get_recovery_status`.
    pub async fn force_recovery(&self, component_id: &str) -> RecoveryResult<u32> {
        self.start_attempt(component_id, true).await
    }

    async fn start_attempt(&self, component_id: &str, force: bool) -> RecoveryResult<u32> {
        let plan = self.inner.components.read().await.plan(component_id);

        let mut state = self.inner.attempts.lock().await;
        if !force && state.active.contains_key(component_id) {
            debug!(component = %component_id, "recovery already in progress");
            return Err(RecoveryError::AlreadyInProgress(component_id.to_string()));
        }

        let Some(plan) = plan else {
            error!(component = %component_id, "no recovery plan registered");
            return Err(RecoveryError::NoPlan(component_id.to_string()));
        };
        let config = plan
            .config
            .clone()
            .unwrap_or_else(|| self.inner.config.clone());

        if config.respect_dependencies {
            if let Some(dependency) = plan
                .dependencies
                .iter()
                .find(|dep| state.active.contains_key(dep.as_str()))
            {
                info!(
                    component = %component_id,
                    %dependency,
                    "dependency under recovery, not starting"
                );
                return Err(RecoveryError::DependencyRecovering {
                    id: component_id.to_string(),
                    dependency: dependency.clone(),
                });
            }
        }

        let counter = state
            .attempt_counters
            .entry(component_id.to_string())
            .or_insert(0);
        *counter += 1;
        let attempt_number = *counter;

        let mut attempt = RecoveryAttempt::new(component_id, plan.component_type, attempt_number);
        attempt.status = RecoveryStatus::InProgress;

        if let Some(previous) = state.active.insert(component_id.to_string(), attempt.clone()) {
            warn!(
                component = %component_id,
                previous = previous.attempt_number,
                attempt = attempt_number,
                "forced recovery runs alongside an active attempt"
            );
        }
        state.stats.total_attempts += 1;
        drop(state);

        info!(
            component = %component_id,
            attempt = attempt_number,
            methods = ?plan.recovery_methods,
            "starting recovery attempt"
        );
        tokio::spawn(execution::run_attempt(self.clone(), attempt, plan, config));

        Ok(attempt_number)
    }

    /// Mark the active attempt for `component_id` as abandoned.
    ///
    /// Bookkeeping only: the attempt's task is not interrupted and keeps
    /// invoking recovery methods until it finishes on its own. Returns
    /// `false` if nothing was active.
    pub async fn cancel_recovery(&self, component_id: &str) -> bool {
        let mut state = self.inner.attempts.lock().await;
        let Some(mut attempt) = state.active.remove(component_id) else {
            return false;
        };

        attempt.status = RecoveryStatus::Abandoned;
        attempt.error_message = Some("cancelled".to_string());
        attempt.finish();

        let attempt_number = attempt.attempt_number;
        state
            .cancelled
            .insert((component_id.to_string(), attempt_number));
        state.stats.abandoned_recoveries += 1;
        state.history.push(attempt);

        warn!(
            component = %component_id,
            attempt = attempt_number,
            "recovery cancelled; in-flight recovery methods keep running"
        );
        true
    }

    /// Copy the running attempt's progress into the active view, if it is
    /// still the active attempt for its component.
    pub(crate) async fn publish_progress(&self, attempt: &RecoveryAttempt) {
        let mut state = self.inner.attempts.lock().await;
        if let Some(active) = state.active.get_mut(&attempt.component_id) {
            if active.attempt_number == attempt.attempt_number {
                active.status = attempt.status;
                active.recovery_method = attempt.recovery_method.clone();
                active.error_message = attempt.error_message.clone();
            }
        }
    }

    /// Record a finished attempt: counters, history, and the active slot.
    pub(crate) async fn complete_attempt(&self, mut attempt: RecoveryAttempt, escalated: bool) {
        let component_id = attempt.component_id.clone();
        let attempt_number = attempt.attempt_number;

        if !attempt.status.is_terminal() {
            error!(
                component = %component_id,
                attempt = attempt_number,
                status = %attempt.status,
                "attempt finished without a final status"
            );
            let unfinished = attempt.status;
            attempt.status = RecoveryStatus::Failed;
            attempt.error_message = Some(
                RecoveryError::Internal(format!("attempt ended while {unfinished}")).to_string(),
            );
        }
        attempt.finish();

        let mut state = self.inner.attempts.lock().await;
        if state
            .cancelled
            .remove(&(component_id.clone(), attempt_number))
        {
            info!(
                component = %component_id,
                attempt = attempt_number,
                outcome = %attempt.status,
                "cancelled attempt finished; outcome discarded"
            );
            return;
        }

        if state
            .active
            .get(&component_id)
            .is_some_and(|active| active.attempt_number == attempt_number)
        {
            state.active.remove(&component_id);
        }

        if escalated {
            state.stats.escalations += 1;
        }
        match attempt.status {
            RecoveryStatus::Succeeded if escalated => state.stats.escalation_successes += 1,
            RecoveryStatus::Succeeded => state.stats.successful_recoveries += 1,
            RecoveryStatus::Abandoned => state.stats.abandoned_recoveries += 1,
            _ => state.stats.failed_recoveries += 1,
        }

        debug!(
            component = %component_id,
            attempt = attempt_number,
            status = %attempt.status,
            duration_ms = attempt.duration_ms.unwrap_or_default(),
            "attempt recorded"
        );
        state.history.push(attempt);
    }

    /// Look up a recovery action.
    pub(crate) async fn recovery_method(
        &self,
        component_type: ComponentType,
        name: &str,
    ) -> Option<SharedRecoveryAction> {
        self.inner.methods.read().await.get(component_type, name)
    }

    /// The component's health check, if it is still registered.
    pub(crate) async fn health_check(&self, component_id: &str) -> Option<SharedHealthCheck> {
        self.inner.components.read().await.health_check(component_id)
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Live snapshot if active, else the latest recent history entry.
    pub async fn get_recovery_status(&self, component_id: &str) -> RecoveryStatusReport {
        let state = self.inner.attempts.lock().await;
        if let Some(active) = state.active.get(component_id) {
            return RecoveryStatusReport::Active {
                component_id: active.component_id.clone(),
                attempt_number: active.attempt_number,
                status: active.status,
                elapsed_ms: active.elapsed_ms(),
                current_method: active.recovery_method.clone(),
            };
        }
        match state.history.latest_for(component_id, STATUS_LOOKBACK) {
            Some(attempt) => RecoveryStatusReport::Completed(attempt.clone()),
            None => RecoveryStatusReport::Unknown,
        }
    }

    /// Overall orchestrator state.
    pub async fn get_service_status(&self) -> ServiceStatus {
        let running = self.inner.monitor.lock().await.is_some();
        let registered_components = self.inner.components.read().await.len();
        let state = self.inner.attempts.lock().await;
        ServiceStatus {
            running,
            active_recoveries: state.active.len(),
            registered_components,
            statistics: state.stats.clone(),
            config: self.inner.config.clone(),
        }
    }

    /// Newest-first completed attempts, at most `limit`.
    pub async fn recent_attempts(&self, limit: usize) -> Vec<RecoveryAttempt> {
        let state = self.inner.attempts.lock().await;
        state.history.recent(limit).cloned().collect()
    }

    pub async fn statistics(&self) -> RecoveryStats {
        self.inner.attempts.lock().await.stats.clone()
    }

    pub async fn is_recovering(&self, component_id: &str) -> bool {
        self.inner
            .attempts
            .lock()
            .await
            .active
            .contains_key(component_id)
    }

    // ── Monitoring loop ────────────────────────────────────────────

    /// Start the monitoring loop. A second call is a no-op.
    pub async fn start(&self) {
        let mut monitor = self.inner.monitor.lock().await;
        if monitor.is_some() {
            debug!("recovery orchestrator already running");
            return;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let orchestrator = self.clone();
        let handle = tokio::spawn(async move {
            orchestrator.monitor_loop(shutdown_rx).await;
        });
        *monitor = Some(MonitorSlot {
            handle,
            shutdown_tx,
        });

        info!(
            interval = ?self.inner.config.health_check_interval,
            "recovery orchestrator started"
        );
    }

    /// Stop the monitoring loop and wait for it to exit.
    ///
    /// Attempts already scheduled keep running.
    pub async fn stop(&self) {
        let slot = self.inner.monitor.lock().await.take();
        let Some(slot) = slot else {
            return;
        };
        let _ = slot.shutdown_tx.send(true);
        if let Err(e) = slot.handle.await {
            warn!(error = %e, "monitoring loop ended abnormally");
        }
        info!("recovery orchestrator stopped");
    }

    async fn monitor_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let interval = self.inner.config.health_check_interval;
        debug!(?interval, "monitoring loop starting");

        loop {
            tokio::select! {
                initiated = self.run_health_pass() => {
                    if initiated > 0 {
                        debug!(initiated, "health pass started recoveries");
                    }
                }
                _ = shutdown.changed() => break,
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.changed() => break,
            }
        }

        debug!("monitoring loop shutting down");
    }

    /// Run one monitoring pass and return how many recoveries it started.
    ///
    /// Health checks run one at a time in registration order. Components
    /// with an active attempt are skipped.
    pub async fn run_health_pass(&self) -> usize {
        let ids = self.registered_components().await;
        let mut initiated = 0;

        for component_id in ids {
            if self.is_recovering(&component_id).await {
                debug!(component = %component_id, "skipping health check, recovery active");
                continue;
            }
            let Some(check) = self.health_check(&component_id).await else {
                continue;
            };

            if let Err(e) = execution::probe(&component_id, check).await {
                warn!(component = %component_id, error = %e, "component unhealthy");
                self.inner.attempts.lock().await.stats.health_check_failures += 1;

                match self.initiate_recovery(&component_id).await {
                    Ok(_) => initiated += 1,
                    Err(e) => debug!(component = %component_id, error = %e, "recovery not started"),
                }
            }
        }

        initiated
    }
}
