//! Startup registration of known components.
//!
//! ```text
//! ComponentInventory (snapshot at startup)
//!   └── register_inventory()
//!         ├── HealthSource::health_check(component)
//!         ├── default RecoveryPlan (+ stream → remote server dependency)
//!         ├── RecoveryOrchestrator::register_component
//!         └── warn on plan methods nothing registered
//! ```
//!
//! The inventory is read once. Components created afterwards are not
//! monitored unless someone registers them explicitly.

use std::collections::BTreeMap;

use tracing::{info, warn};

use revive_core::RecoveryPlan;
use revive_orchestrator::{RecoveryOrchestrator, SharedHealthCheck};

use crate::ids::ComponentRef;

/// The components known to exist at startup.
#[derive(Debug, Clone, Default)]
pub struct ComponentInventory {
    pub streams: Vec<u32>,
    /// Stream id → the remote server it reads from.
    pub stream_sources: BTreeMap<u32, u32>,
    pub remote_servers: Vec<u32>,
    pub plugins: Vec<String>,
    /// Whether a managed database is present.
    pub database: bool,
    pub queues: Vec<String>,
    pub circuit_breakers: Vec<String>,
}

impl ComponentInventory {
    /// Every component, in registration order.
    ///
    /// Upstream components (remote servers, the database, plugins) come
    /// before the streams that use them, so monitoring passes notice the
    /// root cause first.
    pub fn components(&self) -> Vec<ComponentRef> {
        let mut out = Vec::new();
        out.extend(self.remote_servers.iter().copied().map(ComponentRef::RemoteServer));
        if self.database {
            out.push(ComponentRef::Database);
        }
        out.extend(self.plugins.iter().cloned().map(ComponentRef::Plugin));
        out.extend(self.streams.iter().copied().map(ComponentRef::Stream));
        out.extend(self.queues.iter().cloned().map(ComponentRef::Queue));
        out.extend(
            self.circuit_breakers
                .iter()
                .cloned()
                .map(ComponentRef::CircuitBreaker),
        );
        out
    }

    pub fn len(&self) -> usize {
        self.streams.len()
            + self.remote_servers.len()
            + self.plugins.len()
            + usize::from(self.database)
            + self.queues.len()
            + self.circuit_breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Supplies the health check for each inventoried component.
pub trait HealthSource: Send + Sync {
    fn health_check(&self, component: &ComponentRef) -> SharedHealthCheck;
}

impl<F> HealthSource for F
where
    F: Fn(&ComponentRef) -> SharedHealthCheck + Send + Sync,
{
    fn health_check(&self, component: &ComponentRef) -> SharedHealthCheck {
        self(component)
    }
}

/// Register every inventoried component with its default plan.
///
/// Returns the number of components registered.
pub async fn register_inventory(
    orchestrator: &RecoveryOrchestrator,
    inventory: &ComponentInventory,
    health: &dyn HealthSource,
) -> usize {
    let mut registered = 0;

    for component in inventory.components() {
        let id = component.to_string();
        let component_type = component.component_type();
        let mut plan = RecoveryPlan::new(&id, component_type);

        if let ComponentRef::Stream(stream_id) = component {
            if let Some(&server) = inventory.stream_sources.get(&stream_id) {
                let dependency = ComponentRef::RemoteServer(server).to_string();
                if inventory.remote_servers.contains(&server) {
                    plan = plan.with_dependency(&dependency);
                } else {
                    warn!(
                        component = %id,
                        %dependency,
                        "stream source is not in the inventory, ignoring dependency"
                    );
                }
            }
        }

        orchestrator
            .register_component(&id, component_type, health.health_check(&component), Some(plan))
            .await;
        registered += 1;

        let missing = orchestrator.missing_methods(&id).await;
        if !missing.is_empty() {
            warn!(
                component = %id,
                ?missing,
                "recovery methods not registered, they will be skipped"
            );
        }
    }

    info!(components = registered, "component inventory registered");
    registered
}
