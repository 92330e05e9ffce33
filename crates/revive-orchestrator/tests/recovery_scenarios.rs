//! End-to-end attempt scenarios: plan walk, verification, escalation,
//! retry limits, forced and cancelled attempts.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use revive_core::{ComponentType, RecoveryConfig, RecoveryPlan, RecoveryStatus};
use revive_orchestrator::{RecoveryOrchestrator, RecoveryStatusReport, recovery_action_fn};
use tokio::sync::Notify;

use common::*;

#[tokio::test]
async fn stream_recovers_after_reset_plugin() {
    let orch = RecoveryOrchestrator::new(fast_config());
    let log = CallLog::default();
    let health = HealthFlag::new(false);

    orch.register_recovery_method(
        ComponentType::Stream,
        "restart_stream",
        reporting(&log, "restart_stream", true),
    )
    .await;
    orch.register_recovery_method(
        ComponentType::Stream,
        "reset_plugin",
        healing(&log, "reset_plugin", &health),
    )
    .await;

    let plan = RecoveryPlan::new("stream_7", ComponentType::Stream)
        .with_methods(["restart_stream", "reset_plugin"]);
    orch.register_component("stream_7", ComponentType::Stream, health.check(), Some(plan))
        .await;

    assert_eq!(orch.initiate_recovery("stream_7").await.unwrap(), 1);
    let attempt = wait_for_completion(&orch, "stream_7").await;

    assert_eq!(attempt.status, RecoveryStatus::Succeeded);
    assert_eq!(attempt.recovery_method.as_deref(), Some("reset_plugin"));
    assert!(attempt.completed_at.is_some());
    assert_eq!(log.entries(), vec!["restart_stream", "reset_plugin"]);
    // restart_stream reported success but the health check disagreed.
    assert!(attempt.error_message.unwrap().contains("health check failed"));

    let stats = orch.statistics().await;
    assert_eq!(stats.total_attempts, 1);
    assert_eq!(stats.successful_recoveries, 1);
    assert_eq!(stats.failed_recoveries, 0);
}

#[tokio::test]
async fn failing_method_does_not_abort_attempt() {
    let orch = RecoveryOrchestrator::new(fast_config());
    let log = CallLog::default();
    let health = HealthFlag::new(false);

    orch.register_recovery_method(ComponentType::Queue, "a", erroring(&log, "a"))
        .await;
    orch.register_recovery_method(ComponentType::Queue, "b", healing(&log, "b", &health))
        .await;
    let plan = RecoveryPlan::new("queue_ingest", ComponentType::Queue).with_methods(["a", "b"]);
    orch.register_component("queue_ingest", ComponentType::Queue, health.check(), Some(plan))
        .await;

    orch.initiate_recovery("queue_ingest").await.unwrap();
    let attempt = wait_for_completion(&orch, "queue_ingest").await;

    assert_eq!(attempt.status, RecoveryStatus::Succeeded);
    assert_eq!(attempt.recovery_method.as_deref(), Some("b"));
    assert_eq!(log.entries(), vec!["a", "b"]);
}

#[tokio::test]
async fn unregistered_method_is_skipped() {
    let orch = RecoveryOrchestrator::new(fast_config());
    let log = CallLog::default();
    let health = HealthFlag::new(false);

    orch.register_recovery_method(
        ComponentType::Plugin,
        "reload_plugin",
        healing(&log, "reload_plugin", &health),
    )
    .await;
    let plan = RecoveryPlan::new("plugin_geofence", ComponentType::Plugin)
        .with_methods(["does_not_exist", "reload_plugin"]);
    orch.register_component(
        "plugin_geofence",
        ComponentType::Plugin,
        health.check(),
        Some(plan),
    )
    .await;

    orch.initiate_recovery("plugin_geofence").await.unwrap();
    let attempt = wait_for_completion(&orch, "plugin_geofence").await;

    assert_eq!(attempt.status, RecoveryStatus::Succeeded);
    assert_eq!(attempt.recovery_method.as_deref(), Some("reload_plugin"));
    assert!(attempt.error_message.is_none());
}

#[tokio::test]
async fn skipped_method_does_not_back_off() {
    let orch = RecoveryOrchestrator::new(RecoveryConfig {
        initial_retry_delay: Duration::from_millis(500),
        max_retry_delay: Duration::from_secs(1),
        ..fast_config()
    });
    let log = CallLog::default();
    let health = HealthFlag::new(false);

    orch.register_recovery_method(ComponentType::Queue, "heal", healing(&log, "heal", &health))
        .await;
    let plan =
        RecoveryPlan::new("queue_ingest", ComponentType::Queue).with_methods(["missing", "heal"]);
    orch.register_component("queue_ingest", ComponentType::Queue, health.check(), Some(plan))
        .await;

    let started = Instant::now();
    orch.initiate_recovery("queue_ingest").await.unwrap();
    let attempt = wait_for_completion(&orch, "queue_ingest").await;

    assert_eq!(attempt.status, RecoveryStatus::Succeeded);
    assert_eq!(attempt.recovery_method.as_deref(), Some("heal"));
    assert!(
        started.elapsed() < Duration::from_millis(500),
        "skipped method waited {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn attempt_over_retry_limit_is_abandoned_without_running_methods() {
    let orch = RecoveryOrchestrator::new(RecoveryConfig {
        max_retry_attempts: 0,
        ..fast_config()
    });
    let log = CallLog::default();
    orch.register_recovery_method(
        ComponentType::Database,
        "reconnect_database",
        reporting(&log, "reconnect_database", true),
    )
    .await;
    orch.register_component(
        "database",
        ComponentType::Database,
        HealthFlag::new(false).check(),
        None,
    )
    .await;

    orch.initiate_recovery("database").await.unwrap();
    let attempt = wait_for_completion(&orch, "database").await;

    assert_eq!(attempt.status, RecoveryStatus::Abandoned);
    assert!(log.entries().is_empty());
    assert!(attempt.recovery_method.is_none());
    assert_eq!(orch.statistics().await.abandoned_recoveries, 1);
}

#[tokio::test]
async fn empty_plan_over_retry_limit_is_abandoned() {
    let orch = RecoveryOrchestrator::new(RecoveryConfig {
        max_retry_attempts: 0,
        escalation_enabled: true,
        ..fast_config()
    });
    let log = CallLog::default();
    orch.register_recovery_method(
        ComponentType::Queue,
        "restart_queue",
        reporting(&log, "restart_queue", true),
    )
    .await;
    let plan = RecoveryPlan::new("queue_ingest", ComponentType::Queue)
        .with_methods(Vec::<String>::new());
    orch.register_component(
        "queue_ingest",
        ComponentType::Queue,
        HealthFlag::new(false).check(),
        Some(plan),
    )
    .await;

    orch.initiate_recovery("queue_ingest").await.unwrap();
    let attempt = wait_for_completion(&orch, "queue_ingest").await;

    assert_eq!(attempt.status, RecoveryStatus::Abandoned);
    assert!(log.entries().is_empty());
    let stats = orch.statistics().await;
    assert_eq!(stats.abandoned_recoveries, 1);
    assert_eq!(stats.escalations, 0);
}

#[tokio::test]
async fn without_escalation_exhausted_plan_fails() {
    let orch = RecoveryOrchestrator::new(fast_config());
    let log = CallLog::default();
    let health = HealthFlag::new(false);

    orch.register_recovery_method(
        ComponentType::Stream,
        "restart_stream",
        reporting(&log, "restart_stream", true),
    )
    .await;
    orch.register_recovery_method(
        ComponentType::Stream,
        "reset_plugin",
        reporting(&log, "reset_plugin", true),
    )
    .await;
    orch.register_recovery_method(
        ComponentType::Stream,
        "force_restart",
        reporting(&log, "force_restart", true),
    )
    .await;
    let plan = RecoveryPlan::new("stream_7", ComponentType::Stream)
        .with_methods(["restart_stream", "reset_plugin"]);
    orch.register_component("stream_7", ComponentType::Stream, health.check(), Some(plan))
        .await;

    orch.initiate_recovery("stream_7").await.unwrap();
    let attempt = wait_for_completion(&orch, "stream_7").await;

    assert_eq!(attempt.status, RecoveryStatus::Failed);
    assert_eq!(log.entries(), vec!["restart_stream", "reset_plugin"]);
    let stats = orch.statistics().await;
    assert_eq!(stats.escalations, 0);
    assert_eq!(stats.failed_recoveries, 1);
    assert_eq!(stats.successful_recoveries, 0);
}

#[tokio::test]
async fn escalation_without_registered_methods_fails() {
    let orch = RecoveryOrchestrator::new(RecoveryConfig {
        escalation_enabled: true,
        ..fast_config()
    });
    let log = CallLog::default();
    orch.register_recovery_method(
        ComponentType::Stream,
        "restart_stream",
        reporting(&log, "restart_stream", true),
    )
    .await;
    orch.register_recovery_method(
        ComponentType::Stream,
        "reset_plugin",
        reporting(&log, "reset_plugin", true),
    )
    .await;
    let plan = RecoveryPlan::new("stream_7", ComponentType::Stream)
        .with_methods(["restart_stream", "reset_plugin"]);
    orch.register_component(
        "stream_7",
        ComponentType::Stream,
        HealthFlag::new(false).check(),
        Some(plan),
    )
    .await;

    orch.initiate_recovery("stream_7").await.unwrap();
    let attempt = wait_for_completion(&orch, "stream_7").await;

    assert_eq!(attempt.status, RecoveryStatus::Failed);
    assert!(attempt.error_message.unwrap().contains("escalation exhausted"));
    let stats = orch.statistics().await;
    assert_eq!(stats.escalations, 1);
    assert_eq!(stats.failed_recoveries, 1);
}

#[tokio::test]
async fn escalation_success_is_counted_separately() {
    let orch = RecoveryOrchestrator::new(RecoveryConfig {
        escalation_enabled: true,
        ..fast_config()
    });
    let log = CallLog::default();
    let health = HealthFlag::new(false);

    orch.register_recovery_method(
        ComponentType::Stream,
        "restart_stream",
        reporting(&log, "restart_stream", false),
    )
    .await;
    orch.register_recovery_method(
        ComponentType::Stream,
        "recreate_stream",
        healing(&log, "recreate_stream", &health),
    )
    .await;
    let plan =
        RecoveryPlan::new("stream_3", ComponentType::Stream).with_methods(["restart_stream"]);
    orch.register_component("stream_3", ComponentType::Stream, health.check(), Some(plan))
        .await;

    orch.initiate_recovery("stream_3").await.unwrap();
    let attempt = wait_for_completion(&orch, "stream_3").await;

    assert_eq!(attempt.status, RecoveryStatus::Succeeded);
    assert_eq!(attempt.recovery_method.as_deref(), Some("recreate_stream"));
    // force_restart is not registered, so escalation went straight to recreate_stream.
    assert_eq!(log.entries(), vec!["restart_stream", "recreate_stream"]);

    let stats = orch.statistics().await;
    assert_eq!(stats.escalations, 1);
    assert_eq!(stats.escalation_successes, 1);
    assert_eq!(stats.successful_recoveries, 0);
}

#[tokio::test]
async fn method_timeout_moves_to_next_method() {
    let orch = RecoveryOrchestrator::new(RecoveryConfig {
        recovery_timeout: Duration::from_millis(50),
        ..fast_config()
    });
    let log = CallLog::default();
    let health = HealthFlag::new(false);

    orch.register_recovery_method(
        ComponentType::RemoteServer,
        "reconnect_server",
        slow(&log, "reconnect_server", Duration::from_secs(30)),
    )
    .await;
    orch.register_recovery_method(
        ComponentType::RemoteServer,
        "reset_connection",
        healing(&log, "reset_connection", &health),
    )
    .await;
    orch.register_component(
        "remote_server_1",
        ComponentType::RemoteServer,
        health.check(),
        None,
    )
    .await;

    orch.initiate_recovery("remote_server_1").await.unwrap();
    let attempt = wait_for_completion(&orch, "remote_server_1").await;

    assert_eq!(attempt.status, RecoveryStatus::Succeeded);
    assert_eq!(attempt.recovery_method.as_deref(), Some("reset_connection"));
    assert!(attempt.error_message.unwrap().contains("timed out"));
}

#[tokio::test]
async fn panicking_method_counts_as_failure() {
    let orch = RecoveryOrchestrator::new(fast_config());
    let log = CallLog::default();
    let health = HealthFlag::new(false);

    orch.register_recovery_method(
        ComponentType::CircuitBreaker,
        "reset_breaker",
        recovery_action_fn(|id| async move {
            if id.starts_with("circuit_breaker") {
                panic!("breaker registry poisoned");
            }
            anyhow::Ok(true)
        }),
    )
    .await;
    orch.register_recovery_method(
        ComponentType::CircuitBreaker,
        "half_open_breaker",
        healing(&log, "half_open_breaker", &health),
    )
    .await;
    orch.register_component(
        "circuit_breaker_tak",
        ComponentType::CircuitBreaker,
        health.check(),
        None,
    )
    .await;

    orch.initiate_recovery("circuit_breaker_tak").await.unwrap();
    let attempt = wait_for_completion(&orch, "circuit_breaker_tak").await;

    assert_eq!(attempt.status, RecoveryStatus::Succeeded);
    assert_eq!(attempt.recovery_method.as_deref(), Some("half_open_breaker"));
}

#[tokio::test]
async fn mismatched_plan_fails_attempt() {
    let orch = RecoveryOrchestrator::new(fast_config());
    let log = CallLog::default();
    orch.register_recovery_method(
        ComponentType::Queue,
        "restart_queue",
        reporting(&log, "restart_queue", true),
    )
    .await;
    let foreign = RecoveryPlan::new("queue_other", ComponentType::Queue);
    orch.register_component(
        "queue_main",
        ComponentType::Queue,
        HealthFlag::new(false).check(),
        Some(foreign),
    )
    .await;

    orch.initiate_recovery("queue_main").await.unwrap();
    let attempt = wait_for_completion(&orch, "queue_main").await;

    assert_eq!(attempt.status, RecoveryStatus::Failed);
    assert!(attempt.error_message.unwrap().contains("invalid recovery plan"));
    assert!(log.entries().is_empty());
    assert!(!orch.is_recovering("queue_main").await);
}

#[tokio::test]
async fn attempt_numbers_increase_across_history() {
    let orch = RecoveryOrchestrator::new(RecoveryConfig {
        max_retry_attempts: 2,
        ..fast_config()
    });
    let log = CallLog::default();
    orch.register_recovery_method(
        ComponentType::Queue,
        "restart_queue",
        reporting(&log, "restart_queue", false),
    )
    .await;
    let plan = RecoveryPlan::new("queue_ingest", ComponentType::Queue).with_methods(["restart_queue"]);
    orch.register_component(
        "queue_ingest",
        ComponentType::Queue,
        HealthFlag::new(false).check(),
        Some(plan),
    )
    .await;

    let mut statuses = Vec::new();
    for expected in 1..=4 {
        assert_eq!(orch.initiate_recovery("queue_ingest").await.unwrap(), expected);
        statuses.push(wait_for_completion(&orch, "queue_ingest").await.status);
    }

    assert_eq!(
        statuses,
        vec![
            RecoveryStatus::Failed,
            RecoveryStatus::Failed,
            RecoveryStatus::Abandoned,
            RecoveryStatus::Abandoned,
        ]
    );
    let numbers: Vec<u32> = orch
        .recent_attempts(10)
        .await
        .iter()
        .map(|a| a.attempt_number)
        .collect();
    assert_eq!(numbers, vec![4, 3, 2, 1]);
    assert_eq!(log.count("restart_queue"), 2);
}

#[tokio::test]
async fn backoff_runs_between_methods_only() {
    let orch = RecoveryOrchestrator::new(RecoveryConfig {
        initial_retry_delay: Duration::from_millis(300),
        max_retry_delay: Duration::from_secs(1),
        ..fast_config()
    });
    let log = CallLog::default();
    orch.register_recovery_method(ComponentType::Plugin, "one", reporting(&log, "one", false))
        .await;
    orch.register_recovery_method(ComponentType::Plugin, "two", reporting(&log, "two", false))
        .await;

    let single = RecoveryPlan::new("plugin_a", ComponentType::Plugin).with_methods(["one"]);
    orch.register_component(
        "plugin_a",
        ComponentType::Plugin,
        HealthFlag::new(false).check(),
        Some(single),
    )
    .await;
    let double = RecoveryPlan::new("plugin_b", ComponentType::Plugin).with_methods(["one", "two"]);
    orch.register_component(
        "plugin_b",
        ComponentType::Plugin,
        HealthFlag::new(false).check(),
        Some(double),
    )
    .await;

    let started = Instant::now();
    orch.initiate_recovery("plugin_a").await.unwrap();
    wait_for_completion(&orch, "plugin_a").await;
    assert!(started.elapsed() < Duration::from_millis(300));

    let started = Instant::now();
    orch.initiate_recovery("plugin_b").await.unwrap();
    wait_for_completion(&orch, "plugin_b").await;
    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn forced_recovery_runs_alongside_active_attempt() {
    let orch = RecoveryOrchestrator::new(fast_config());
    let log = CallLog::default();
    orch.register_recovery_method(
        ComponentType::Database,
        "reconnect_database",
        slow(&log, "reconnect_database", Duration::from_millis(100)),
    )
    .await;
    let plan =
        RecoveryPlan::new("database", ComponentType::Database).with_methods(["reconnect_database"]);
    orch.register_component(
        "database",
        ComponentType::Database,
        HealthFlag::new(true).check(),
        Some(plan),
    )
    .await;

    assert_eq!(orch.initiate_recovery("database").await.unwrap(), 1);
    assert!(orch.initiate_recovery("database").await.is_err());
    assert_eq!(orch.force_recovery("database").await.unwrap(), 2);

    match orch.get_recovery_status("database").await {
        RecoveryStatusReport::Active { attempt_number, .. } => assert_eq!(attempt_number, 2),
        other => panic!("expected active attempt, got {other:?}"),
    }

    wait_until(|| {
        let orch = orch.clone();
        async move { orch.statistics().await.successful_recoveries == 2 }
    })
    .await;

    let numbers: Vec<u32> = orch
        .recent_attempts(10)
        .await
        .iter()
        .map(|a| a.attempt_number)
        .collect();
    assert_eq!(numbers.len(), 2);
    assert!(numbers.contains(&1) && numbers.contains(&2));
    assert_eq!(log.count("reconnect_database"), 2);
    assert_eq!(orch.get_service_status().await.active_recoveries, 0);
}

#[tokio::test]
async fn cancelled_attempt_keeps_running_but_is_recorded_once() {
    let orch = RecoveryOrchestrator::new(RecoveryConfig {
        recovery_timeout: Duration::from_secs(5),
        ..fast_config()
    });
    let log = CallLog::default();
    let release = Arc::new(Notify::new());
    let health = HealthFlag::new(false);

    let gate = release.clone();
    let action_log = log.clone();
    let action_health = health.clone();
    orch.register_recovery_method(
        ComponentType::Stream,
        "restart_stream",
        recovery_action_fn(move |_| {
            let gate = gate.clone();
            let log = action_log.clone();
            let health = action_health.clone();
            async move {
                log.record("restart_stream:start");
                gate.notified().await;
                health.set(true);
                log.record("restart_stream:done");
                anyhow::Ok(true)
            }
        }),
    )
    .await;
    let plan = RecoveryPlan::new("stream_9", ComponentType::Stream).with_methods(["restart_stream"]);
    orch.register_component("stream_9", ComponentType::Stream, health.check(), Some(plan))
        .await;

    orch.initiate_recovery("stream_9").await.unwrap();
    wait_until(|| {
        let log = log.clone();
        async move { log.count("restart_stream:start") == 1 }
    })
    .await;

    assert!(orch.cancel_recovery("stream_9").await);
    let cancelled = wait_for_completion(&orch, "stream_9").await;
    assert_eq!(cancelled.status, RecoveryStatus::Abandoned);

    // The in-flight action is not interrupted.
    release.notify_one();
    wait_until(|| {
        let log = log.clone();
        async move { log.count("restart_stream:done") == 1 }
    })
    .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let history = orch.recent_attempts(10).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, RecoveryStatus::Abandoned);

    let stats = orch.statistics().await;
    assert_eq!(stats.abandoned_recoveries, 1);
    assert_eq!(stats.successful_recoveries, 0);
}

#[tokio::test]
async fn history_is_bounded() {
    let orch = RecoveryOrchestrator::new(fast_config());
    let total = revive_orchestrator::HISTORY_CAPACITY + 20;

    for i in 0..total {
        let id = format!("queue_{i}");
        let plan = RecoveryPlan::new(&id, ComponentType::Queue).with_methods(Vec::<String>::new());
        orch.register_component(&id, ComponentType::Queue, HealthFlag::new(false).check(), Some(plan))
            .await;
        orch.initiate_recovery(&id).await.unwrap();
    }

    wait_until(|| {
        let orch = orch.clone();
        async move { orch.statistics().await.failed_recoveries == total as u64 }
    })
    .await;

    let history = orch.recent_attempts(usize::MAX).await;
    assert_eq!(history.len(), revive_orchestrator::HISTORY_CAPACITY);
    // The earliest components fell out of the history window.
    assert_eq!(
        orch.get_recovery_status("queue_0").await,
        RecoveryStatusReport::Unknown
    );
}
