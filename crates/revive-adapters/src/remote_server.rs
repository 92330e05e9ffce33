//! Remote server recovery methods (`remote_server_<n>`).

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use revive_core::ComponentType;
use revive_orchestrator::{RecoveryAction, RecoveryOrchestrator};

use crate::ids;

/// Connection management for upstream servers.
#[async_trait]
pub trait RemoteServerManager: Send + Sync {
    async fn reconnect_server(&self, server_id: u32) -> anyhow::Result<bool>;
    /// Discard the pooled connection state and renegotiate.
    async fn reset_connection(&self, server_id: u32) -> anyhow::Result<bool>;
    /// Reconnect even if the current connection reports healthy.
    async fn force_reconnect(&self, server_id: u32) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteServerMethod {
    ReconnectServer,
    ResetConnection,
    ForceReconnect,
}

impl RemoteServerMethod {
    pub const ALL: [RemoteServerMethod; 3] = [
        RemoteServerMethod::ReconnectServer,
        RemoteServerMethod::ResetConnection,
        RemoteServerMethod::ForceReconnect,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RemoteServerMethod::ReconnectServer => "reconnect_server",
            RemoteServerMethod::ResetConnection => "reset_connection",
            RemoteServerMethod::ForceReconnect => "force_reconnect",
        }
    }
}

struct RemoteServerRecovery {
    manager: Arc<dyn RemoteServerManager>,
    method: RemoteServerMethod,
}

#[async_trait]
impl RecoveryAction for RemoteServerRecovery {
    async fn recover(&self, component_id: &str) -> anyhow::Result<bool> {
        let Some(server_id) = ids::remote_server_id(component_id) else {
            return ids::unrecognized(component_id, self.method.name());
        };
        debug!(server_id, method = self.method.name(), "recovering remote server");

        match self.method {
            RemoteServerMethod::ReconnectServer => self.manager.reconnect_server(server_id).await,
            RemoteServerMethod::ResetConnection => self.manager.reset_connection(server_id).await,
            RemoteServerMethod::ForceReconnect => self.manager.force_reconnect(server_id).await,
        }
    }
}

pub async fn register_remote_server_recovery(
    orchestrator: &RecoveryOrchestrator,
    manager: Arc<dyn RemoteServerManager>,
) -> usize {
    for method in RemoteServerMethod::ALL {
        let action = Arc::new(RemoteServerRecovery {
            manager: manager.clone(),
            method,
        });
        orchestrator
            .register_recovery_method(ComponentType::RemoteServer, method.name(), action)
            .await;
    }
    info!(
        methods = RemoteServerMethod::ALL.len(),
        "remote server recovery methods registered"
    );
    RemoteServerMethod::ALL.len()
}
