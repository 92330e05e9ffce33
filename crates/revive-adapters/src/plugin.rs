//! Plugin recovery methods (`plugin_<name>`).
//!
//! Restarting keeps the loaded artifact; reloading re-reads it from disk.
//! Reinstalling fetches a fresh copy and is only used on escalation.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use revive_core::ComponentType;
use revive_orchestrator::{RecoveryAction, RecoveryOrchestrator};

use crate::ids;

#[async_trait]
pub trait PluginManager: Send + Sync {
    async fn restart_plugin(&self, name: &str) -> anyhow::Result<bool>;
    async fn reload_plugin(&self, name: &str) -> anyhow::Result<bool>;
    async fn reinstall_plugin(&self, name: &str) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginMethod {
    RestartPlugin,
    ReloadPlugin,
    ReinstallPlugin,
}

impl PluginMethod {
    pub const ALL: [PluginMethod; 3] = [
        PluginMethod::RestartPlugin,
        PluginMethod::ReloadPlugin,
        PluginMethod::ReinstallPlugin,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PluginMethod::RestartPlugin => "restart_plugin",
            PluginMethod::ReloadPlugin => "reload_plugin",
            PluginMethod::ReinstallPlugin => "reinstall_plugin",
        }
    }
}

struct PluginRecovery {
    manager: Arc<dyn PluginManager>,
    method: PluginMethod,
}

#[async_trait]
impl RecoveryAction for PluginRecovery {
    async fn recover(&self, component_id: &str) -> anyhow::Result<bool> {
        let Some(name) = ids::plugin_name(component_id) else {
            return ids::unrecognized(component_id, self.method.name());
        };
        debug!(plugin = %name, method = self.method.name(), "recovering plugin");

        match self.method {
            PluginMethod::RestartPlugin => self.manager.restart_plugin(&name).await,
            PluginMethod::ReloadPlugin => self.manager.reload_plugin(&name).await,
            PluginMethod::ReinstallPlugin => self.manager.reinstall_plugin(&name).await,
        }
    }
}

pub async fn register_plugin_recovery(
    orchestrator: &RecoveryOrchestrator,
    manager: Arc<dyn PluginManager>,
) -> usize {
    for method in PluginMethod::ALL {
        let action = Arc::new(PluginRecovery {
            manager: manager.clone(),
            method,
        });
        orchestrator
            .register_recovery_method(ComponentType::Plugin, method.name(), action)
            .await;
    }
    info!(methods = PluginMethod::ALL.len(), "plugin recovery methods registered");
    PluginMethod::ALL.len()
}
