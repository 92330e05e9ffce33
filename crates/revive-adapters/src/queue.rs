//! Queue recovery methods (`queue_<name>`).

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use revive_core::ComponentType;
use revive_orchestrator::{RecoveryAction, RecoveryOrchestrator};

use crate::ids;

#[async_trait]
pub trait QueueManager: Send + Sync {
    async fn restart_queue(&self, name: &str) -> anyhow::Result<bool>;
    /// Deliver or dead-letter everything currently queued.
    async fn drain_queue(&self, name: &str) -> anyhow::Result<bool>;
    /// Drop queued messages. Loses data.
    async fn purge_queue(&self, name: &str) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMethod {
    RestartQueue,
    DrainQueue,
    PurgeQueue,
}

impl QueueMethod {
    pub const ALL: [QueueMethod; 3] = [
        QueueMethod::RestartQueue,
        QueueMethod::DrainQueue,
        QueueMethod::PurgeQueue,
    ];

    pub fn name(self) -> &'static str {
        match self {
            QueueMethod::RestartQueue => "restart_queue",
            QueueMethod::DrainQueue => "drain_queue",
            QueueMethod::PurgeQueue => "purge_queue",
        }
    }
}

struct QueueRecovery {
    manager: Arc<dyn QueueManager>,
    method: QueueMethod,
}

#[async_trait]
impl RecoveryAction for QueueRecovery {
    async fn recover(&self, component_id: &str) -> anyhow::Result<bool> {
        let Some(name) = ids::queue_name(component_id) else {
            return ids::unrecognized(component_id, self.method.name());
        };
        debug!(queue = %name, method = self.method.name(), "recovering queue");

        match self.method {
            QueueMethod::RestartQueue => self.manager.restart_queue(&name).await,
            QueueMethod::DrainQueue => self.manager.drain_queue(&name).await,
            QueueMethod::PurgeQueue => self.manager.purge_queue(&name).await,
        }
    }
}

pub async fn register_queue_recovery(
    orchestrator: &RecoveryOrchestrator,
    manager: Arc<dyn QueueManager>,
) -> usize {
    for method in QueueMethod::ALL {
        let action = Arc::new(QueueRecovery {
            manager: manager.clone(),
            method,
        });
        orchestrator
            .register_recovery_method(ComponentType::Queue, method.name(), action)
            .await;
    }
    info!(methods = QueueMethod::ALL.len(), "queue recovery methods registered");
    QueueMethod::ALL.len()
}
