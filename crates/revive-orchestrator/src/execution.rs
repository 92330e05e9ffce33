//! Attempt execution — the recovery state machine.
//!
//! One task per attempt walks the plan's methods in order, backing off
//! between them, and re-runs the component's health check after every
//! method that reports success. If the plan is exhausted without a
//! verified recovery the attempt escalates (when enabled) or fails.
//!
//! Health checks and recovery actions each run in their own task so a
//! panicking collaborator counts as a failed check or method instead of
//! taking the attempt down with it.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use revive_core::{
    RecoveryAttempt, RecoveryConfig, RecoveryError, RecoveryPlan, RecoveryResult, RecoveryStatus,
};

use crate::callback::SharedHealthCheck;
use crate::orchestrator::RecoveryOrchestrator;

/// Entry point for a scheduled attempt. Always records the attempt.
pub(crate) async fn run_attempt(
    orchestrator: RecoveryOrchestrator,
    attempt: RecoveryAttempt,
    plan: RecoveryPlan,
    config: RecoveryConfig,
) {
    let fallback = attempt.clone();
    let worker = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            let mut attempt = attempt;
            let outcome = execute(&orchestrator, &mut attempt, &plan, &config).await;
            (attempt, outcome)
        })
    };

    let (attempt, escalated) = match worker.await {
        Ok((attempt, Ok(escalated))) => (attempt, escalated),
        Ok((mut attempt, Err(e))) => {
            error!(
                component = %attempt.component_id,
                attempt = attempt.attempt_number,
                error = %e,
                "recovery attempt could not run"
            );
            attempt.status = RecoveryStatus::Failed;
            attempt.error_message = Some(e.to_string());
            (attempt, false)
        }
        Err(e) => {
            let mut attempt = fallback;
            let failure = RecoveryError::Internal(format!("recovery task aborted: {e}"));
            error!(
                component = %attempt.component_id,
                attempt = attempt.attempt_number,
                error = %failure,
                "recovery attempt crashed"
            );
            attempt.status = RecoveryStatus::Failed;
            attempt.error_message = Some(failure.to_string());
            (attempt, false)
        }
    };

    orchestrator.complete_attempt(attempt, escalated).await;
}

/// Outcome of a single recovery method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MethodOutcome {
    /// Nothing registered under the name; no backoff is owed.
    Skipped,
    Failed,
    Recovered,
}

/// Walk the plan. Returns whether escalation ran.
///
/// Attempts over the retry limit are abandoned before any method runs,
/// even when the plan is empty.
async fn execute(
    orchestrator: &RecoveryOrchestrator,
    attempt: &mut RecoveryAttempt,
    plan: &RecoveryPlan,
    config: &RecoveryConfig,
) -> RecoveryResult<bool> {
    plan.validate()?;
    if plan.component_id != attempt.component_id || plan.component_type != attempt.component_type {
        return Err(RecoveryError::InvalidPlan(format!(
            "plan for {} ({}) cannot recover {} ({})",
            plan.component_id, plan.component_type, attempt.component_id, attempt.component_type
        )));
    }

    if attempt.attempt_number > config.max_retry_attempts {
        let exhausted = RecoveryError::Exhausted {
            attempt_number: attempt.attempt_number,
            max_attempts: config.max_retry_attempts,
        };
        warn!(
            component = %attempt.component_id,
            error = %exhausted,
            "abandoning recovery"
        );
        attempt.status = RecoveryStatus::Abandoned;
        attempt.error_message = Some(exhausted.to_string());
        return Ok(false);
    }

    let methods = &plan.recovery_methods;
    for (index, method) in methods.iter().enumerate() {
        match run_method(orchestrator, attempt, method, config.recovery_timeout).await {
            MethodOutcome::Recovered => {
                attempt.status = RecoveryStatus::Succeeded;
                info!(
                    component = %attempt.component_id,
                    attempt = attempt.attempt_number,
                    %method,
                    "component recovered"
                );
                break;
            }
            MethodOutcome::Skipped => continue,
            MethodOutcome::Failed => {}
        }

        if index + 1 < methods.len() {
            let delay = config.backoff_delay(attempt.attempt_number);
            debug!(component = %attempt.component_id, ?delay, "backing off before next method");
            tokio::time::sleep(delay).await;
        }
    }

    if attempt.status != RecoveryStatus::InProgress {
        return Ok(false);
    }

    if config.escalation_enabled {
        escalate(orchestrator, attempt, config.recovery_timeout).await;
        return Ok(true);
    }

    attempt.status = RecoveryStatus::Failed;
    if attempt.error_message.is_none() {
        attempt.error_message = Some(format!(
            "no recovery method restored {}",
            attempt.component_id
        ));
    }
    error!(
        component = %attempt.component_id,
        attempt = attempt.attempt_number,
        error = attempt.error_message.as_deref().unwrap_or_default(),
        "recovery failed"
    );
    Ok(false)
}

/// Try the type's escalation methods, first verified success wins.
async fn escalate(
    orchestrator: &RecoveryOrchestrator,
    attempt: &mut RecoveryAttempt,
    timeout: Duration,
) {
    let methods = attempt.component_type.escalation_methods();
    attempt.status = RecoveryStatus::Escalated;
    warn!(
        component = %attempt.component_id,
        attempt = attempt.attempt_number,
        ?methods,
        "recovery plan exhausted, escalating"
    );
    orchestrator.publish_progress(attempt).await;

    for method in methods {
        if run_method(orchestrator, attempt, method, timeout).await == MethodOutcome::Recovered {
            attempt.status = RecoveryStatus::Succeeded;
            info!(
                component = %attempt.component_id,
                attempt = attempt.attempt_number,
                %method,
                "component recovered by escalation"
            );
            return;
        }
    }

    let failure = RecoveryError::EscalationFailed(attempt.component_id.clone());
    error!(component = %attempt.component_id, error = %failure, "recovery failed");
    attempt.status = RecoveryStatus::Failed;
    attempt.error_message = Some(failure.to_string());
}

/// Run one method and verify the component afterwards.
///
/// `Recovered` only when the action reported success and the health
/// check then passed. Unregistered methods are `Skipped`.
async fn run_method(
    orchestrator: &RecoveryOrchestrator,
    attempt: &mut RecoveryAttempt,
    method: &str,
    timeout: Duration,
) -> MethodOutcome {
    let Some(action) = orchestrator
        .recovery_method(attempt.component_type, method)
        .await
    else {
        let skipped = RecoveryError::MethodMissing {
            component_type: attempt.component_type,
            method: method.to_string(),
        };
        warn!(component = %attempt.component_id, error = %skipped, "skipping recovery method");
        return MethodOutcome::Skipped;
    };

    attempt.recovery_method = Some(method.to_string());
    orchestrator.publish_progress(attempt).await;
    debug!(component = %attempt.component_id, %method, "running recovery method");

    let component_id = attempt.component_id.clone();
    let mut task = {
        let component_id = component_id.clone();
        tokio::spawn(async move { action.recover(&component_id).await })
    };

    let failure = match tokio::time::timeout(timeout, &mut task).await {
        Err(_) => {
            task.abort();
            RecoveryError::MethodTimeout {
                method: method.to_string(),
                timeout,
            }
        }
        Ok(Err(join)) => RecoveryError::MethodFailed {
            method: method.to_string(),
            message: format!("action panicked: {join}"),
        },
        Ok(Ok(Err(e))) => RecoveryError::MethodFailed {
            method: method.to_string(),
            message: format!("{e:#}"),
        },
        Ok(Ok(Ok(false))) => RecoveryError::MethodFailed {
            method: method.to_string(),
            message: "action reported failure".to_string(),
        },
        Ok(Ok(Ok(true))) => match verify(orchestrator, &component_id).await {
            Ok(()) => return MethodOutcome::Recovered,
            Err(e) => {
                info!(
                    component = %component_id,
                    %method,
                    "recovery method succeeded but component is still unhealthy"
                );
                e
            }
        },
    };

    warn!(
        component = %component_id,
        %method,
        error = %failure,
        "recovery method did not restore component"
    );
    attempt.error_message = Some(failure.to_string());
    orchestrator.publish_progress(attempt).await;
    MethodOutcome::Failed
}

/// Re-run the component's health check. Unregistered components count
/// as verified.
async fn verify(orchestrator: &RecoveryOrchestrator, component_id: &str) -> RecoveryResult<()> {
    match orchestrator.health_check(component_id).await {
        Some(check) => probe(component_id, check).await,
        None => Ok(()),
    }
}

/// Evaluate a health check. `false`, `Err`, and a panic are all failures.
pub(crate) async fn probe(component_id: &str, check: SharedHealthCheck) -> RecoveryResult<()> {
    let reason = match tokio::spawn(async move { check.check().await }).await {
        Ok(Ok(true)) => return Ok(()),
        Ok(Ok(false)) => "reported unhealthy".to_string(),
        Ok(Err(e)) => format!("{e:#}"),
        Err(e) => format!("health check panicked: {e}"),
    };
    Err(RecoveryError::HealthCheckFailed {
        component: component_id.to_string(),
        reason,
    })
}
