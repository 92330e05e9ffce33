//! Daemon assembly: config → orchestrator → run until Ctrl-C.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use revive_adapters::{CommandAction, probe};
use revive_core::DaemonConfig;
use revive_orchestrator::RecoveryOrchestrator;

/// Read and validate the config file.
pub fn load_config(path: &Path) -> anyhow::Result<DaemonConfig> {
    let config = DaemonConfig::from_file(path)
        .with_context(|| format!("loading {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("validating {}", path.display()))?;
    Ok(config)
}

/// Build an orchestrator with every configured method and component.
pub async fn assemble(config: &DaemonConfig) -> anyhow::Result<RecoveryOrchestrator> {
    let orchestrator = RecoveryOrchestrator::new(config.recovery.clone());

    for method in &config.methods {
        let action = CommandAction::from_config(method)?;
        orchestrator
            .register_recovery_method(method.component_type, &method.name, Arc::new(action))
            .await;
    }

    for component in &config.components {
        orchestrator
            .register_component(
                &component.id,
                component.component_type,
                probe::from_config(&component.probe),
                Some(component.to_plan()),
            )
            .await;

        let missing = orchestrator.missing_methods(&component.id).await;
        if !missing.is_empty() {
            warn!(
                component = %component.id,
                ?missing,
                "no command configured for these recovery methods, they will be skipped"
            );
        }
    }

    info!(
        components = config.components.len(),
        methods = config.methods.len(),
        "orchestrator assembled"
    );
    Ok(orchestrator)
}

pub async fn run(config_path: &Path) -> anyhow::Result<()> {
    info!(config = %config_path.display(), "revive daemon starting");
    let config = load_config(config_path)?;
    let orchestrator = assemble(&config).await?;

    orchestrator.start().await;

    tokio::signal::ctrl_c()
        .await
        .context("installing Ctrl-C handler")?;
    info!("shutdown signal received");

    orchestrator.stop().await;

    let (status, success_rate) = final_status(&orchestrator).await?;
    info!(%status, success_rate, "revive daemon stopped");
    Ok(())
}

/// Service status as JSON plus the overall recovery success rate.
async fn final_status(orchestrator: &RecoveryOrchestrator) -> anyhow::Result<(String, f64)> {
    let status = orchestrator.get_service_status().await;
    let success_rate = status.statistics.success_rate();
    Ok((serde_json::to_string(&status)?, success_rate))
}

/// Human-readable overview printed by `revived check`.
pub fn summary(config: &DaemonConfig) -> String {
    let recovery = &config.recovery;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "recovery: max_retry_attempts={} backoff={}..{} x{} interval={} timeout={} escalation={} dependencies={}",
        recovery.max_retry_attempts,
        revive_core::format_duration(recovery.initial_retry_delay),
        revive_core::format_duration(recovery.max_retry_delay),
        recovery.exponential_backoff_factor,
        revive_core::format_duration(recovery.health_check_interval),
        revive_core::format_duration(recovery.recovery_timeout),
        recovery.escalation_enabled,
        recovery.respect_dependencies,
    );

    let _ = writeln!(out, "components ({}):", config.components.len());
    for component in &config.components {
        let plan = component.to_plan();
        let _ = write!(
            out,
            "  {} [{}] methods={}",
            component.id,
            component.component_type,
            plan.recovery_methods.join(",")
        );
        if !plan.dependencies.is_empty() {
            let deps: Vec<&str> = plan.dependencies.iter().map(String::as_str).collect();
            let _ = write!(out, " depends_on={}", deps.join(","));
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "methods ({}):", config.methods.len());
    for method in &config.methods {
        let _ = writeln!(
            out,
            "  {}/{}: {}",
            method.component_type,
            method.name,
            method.command.join(" ")
        );
    }
    out
}
