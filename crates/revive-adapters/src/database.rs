//! Database recovery methods.
//!
//! There is a single managed database, registered under the id
//! `database`. Recovery works on its connection pool rather than on the
//! server itself.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use revive_core::ComponentType;
use revive_orchestrator::{RecoveryAction, RecoveryOrchestrator};

use crate::ids;

/// Pool-level control over the managed database.
#[async_trait]
pub trait DatabaseEngine: Send + Sync {
    /// Re-open the primary connection.
    async fn reconnect_database(&self) -> anyhow::Result<bool>;
    /// Close idle and broken pooled connections.
    async fn reset_pool(&self) -> anyhow::Result<bool>;
    /// Drop the pool entirely and build a new one.
    async fn recreate_pool(&self) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseMethod {
    ReconnectDatabase,
    ResetPool,
    RecreatePool,
}

impl DatabaseMethod {
    pub const ALL: [DatabaseMethod; 3] = [
        DatabaseMethod::ReconnectDatabase,
        DatabaseMethod::ResetPool,
        DatabaseMethod::RecreatePool,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DatabaseMethod::ReconnectDatabase => "reconnect_database",
            DatabaseMethod::ResetPool => "reset_pool",
            DatabaseMethod::RecreatePool => "recreate_pool",
        }
    }
}

struct DatabaseRecovery {
    engine: Arc<dyn DatabaseEngine>,
    method: DatabaseMethod,
}

#[async_trait]
impl RecoveryAction for DatabaseRecovery {
    async fn recover(&self, component_id: &str) -> anyhow::Result<bool> {
        if !ids::is_database(component_id) {
            return ids::unrecognized(component_id, self.method.name());
        }
        debug!(method = self.method.name(), "recovering database");

        match self.method {
            DatabaseMethod::ReconnectDatabase => self.engine.reconnect_database().await,
            DatabaseMethod::ResetPool => self.engine.reset_pool().await,
            DatabaseMethod::RecreatePool => self.engine.recreate_pool().await,
        }
    }
}

pub async fn register_database_recovery(
    orchestrator: &RecoveryOrchestrator,
    engine: Arc<dyn DatabaseEngine>,
) -> usize {
    for method in DatabaseMethod::ALL {
        let action = Arc::new(DatabaseRecovery {
            engine: engine.clone(),
            method,
        });
        orchestrator
            .register_recovery_method(ComponentType::Database, method.name(), action)
            .await;
    }
    info!(methods = DatabaseMethod::ALL.len(), "database recovery methods registered");
    DatabaseMethod::ALL.len()
}
