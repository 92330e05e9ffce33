//! Stream recovery methods.
//!
//! Streams are numbered (`stream_<n>`). The plan escalates from a plain
//! restart through resetting the stream's plugin and reconnecting its
//! remote source; `force_restart` and `recreate_stream` are the escalation
//! tier.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use revive_core::ComponentType;
use revive_orchestrator::{RecoveryAction, RecoveryOrchestrator};

use crate::ids;

/// The stream subsystem as seen by recovery.
///
/// Every call returns `Ok(true)` when the operation was carried out; the
/// orchestrator verifies health independently afterwards.
#[async_trait]
pub trait StreamManager: Send + Sync {
    async fn restart_stream(&self, stream_id: u32) -> anyhow::Result<bool>;

    /// Reset the processing plugin attached to the stream.
    async fn reset_plugin(&self, stream_id: u32) -> anyhow::Result<bool>;

    /// Drop and re-establish the stream's remote server connection.
    async fn reconnect_remote(&self, stream_id: u32) -> anyhow::Result<bool>;

    /// Restart without waiting for in-flight data to drain.
    async fn force_restart(&self, stream_id: u32) -> anyhow::Result<bool>;

    /// Tear the stream down and build it again from its definition.
    async fn recreate_stream(&self, stream_id: u32) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMethod {
    RestartStream,
    ResetPlugin,
    ReconnectRemote,
    ForceRestart,
    RecreateStream,
}

impl StreamMethod {
    pub const ALL: [StreamMethod; 5] = [
        StreamMethod::RestartStream,
        StreamMethod::ResetPlugin,
        StreamMethod::ReconnectRemote,
        StreamMethod::ForceRestart,
        StreamMethod::RecreateStream,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StreamMethod::RestartStream => "restart_stream",
            StreamMethod::ResetPlugin => "reset_plugin",
            StreamMethod::ReconnectRemote => "reconnect_remote",
            StreamMethod::ForceRestart => "force_restart",
            StreamMethod::RecreateStream => "recreate_stream",
        }
    }
}

struct StreamRecovery {
    manager: Arc<dyn StreamManager>,
    method: StreamMethod,
}

#[async_trait]
impl RecoveryAction for StreamRecovery {
    async fn recover(&self, component_id: &str) -> anyhow::Result<bool> {
        let Some(stream_id) = ids::stream_id(component_id) else {
            return ids::unrecognized(component_id, self.method.name());
        };
        debug!(stream_id, method = self.method.name(), "recovering stream");

        match self.method {
            StreamMethod::RestartStream => self.manager.restart_stream(stream_id).await,
            StreamMethod::ResetPlugin => self.manager.reset_plugin(stream_id).await,
            StreamMethod::ReconnectRemote => self.manager.reconnect_remote(stream_id).await,
            StreamMethod::ForceRestart => self.manager.force_restart(stream_id).await,
            StreamMethod::RecreateStream => self.manager.recreate_stream(stream_id).await,
        }
    }
}

/// Register every stream recovery method. Returns how many were registered.
pub async fn register_stream_recovery(
    orchestrator: &RecoveryOrchestrator,
    manager: Arc<dyn StreamManager>,
) -> usize {
    for method in StreamMethod::ALL {
        let action = Arc::new(StreamRecovery {
            manager: manager.clone(),
            method,
        });
        orchestrator
            .register_recovery_method(ComponentType::Stream, method.name(), action)
            .await;
    }
    info!(methods = StreamMethod::ALL.len(), "stream recovery methods registered");
    StreamMethod::ALL.len()
}
