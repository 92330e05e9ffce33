//! Component and recovery-method registries.
//!
//! Plain synchronous maps; the orchestrator wraps each in a lock.

use std::collections::HashMap;

use tracing::{debug, warn};

use revive_core::{ComponentId, ComponentType, RecoveryPlan};

use crate::callback::{SharedHealthCheck, SharedRecoveryAction};

/// A registered component: how to check it and how to fix it.
#[derive(Clone)]
pub struct ComponentEntry {
    pub health_check: SharedHealthCheck,
    pub plan: RecoveryPlan,
}

/// Component id → health check + recovery plan, in registration order.
#[derive(Default)]
pub struct ComponentRegistry {
    /// Ids in first-registration order. Monitoring passes follow this.
    order: Vec<ComponentId>,
    entries: HashMap<ComponentId, ComponentEntry>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component, synthesizing a default plan if none is given.
    ///
    /// Re-registering an id silently replaces its entry and keeps its
    /// position in the monitoring order. Returns `true` on replacement.
    pub fn register(
        &mut self,
        component_id: &str,
        component_type: ComponentType,
        health_check: SharedHealthCheck,
        plan: Option<RecoveryPlan>,
    ) -> bool {
        let plan = plan.unwrap_or_else(|| RecoveryPlan::new(component_id, component_type));
        if plan.component_id != component_id || plan.component_type != component_type {
            warn!(
                component = %component_id,
                plan_component = %plan.component_id,
                plan_type = %plan.component_type,
                "recovery plan does not match its component"
            );
        }

        let entry = ComponentEntry { health_check, plan };
        let replaced = self
            .entries
            .insert(component_id.to_string(), entry)
            .is_some();
        if replaced {
            debug!(component = %component_id, "component re-registered");
        } else {
            self.order.push(component_id.to_string());
        }
        replaced
    }

    /// Remove a component. Returns the removed entry.
    pub fn unregister(&mut self, component_id: &str) -> Option<ComponentEntry> {
        let entry = self.entries.remove(component_id)?;
        self.order.retain(|id| id != component_id);
        Some(entry)
    }

    pub fn plan(&self, component_id: &str) -> Option<RecoveryPlan> {
        self.entries.get(component_id).map(|e| e.plan.clone())
    }

    pub fn health_check(&self, component_id: &str) -> Option<SharedHealthCheck> {
        self.entries
            .get(component_id)
            .map(|e| e.health_check.clone())
    }

    /// Component ids in registration order.
    pub fn ids(&self) -> Vec<ComponentId> {
        self.order.clone()
    }

    pub fn contains(&self, component_id: &str) -> bool {
        self.entries.contains_key(component_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Two-level table: component type → method name → action.
#[derive(Default)]
pub struct MethodRegistry {
    methods: HashMap<ComponentType, HashMap<String, SharedRecoveryAction>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an action. Returns `true` if it replaced an existing one.
    pub fn register(
        &mut self,
        component_type: ComponentType,
        name: &str,
        action: SharedRecoveryAction,
    ) -> bool {
        self.methods
            .entry(component_type)
            .or_default()
            .insert(name.to_string(), action)
            .is_some()
    }

    pub fn get(&self, component_type: ComponentType, name: &str) -> Option<SharedRecoveryAction> {
        self.methods
            .get(&component_type)
            .and_then(|table| table.get(name))
            .cloned()
    }

    pub fn contains(&self, component_type: ComponentType, name: &str) -> bool {
        self.methods
            .get(&component_type)
            .is_some_and(|table| table.contains_key(name))
    }
}
