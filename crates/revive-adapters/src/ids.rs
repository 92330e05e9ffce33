//! Component id conventions.
//!
//! ```text
//! stream_<n>            → Stream(n)
//! remote_server_<n>     → RemoteServer(n)
//! plugin_<name>         → Plugin(name)
//! database              → Database
//! queue_<name>          → Queue(name)
//! circuit_breaker_<name> → CircuitBreaker(name)
//! ```

use std::fmt;

use tracing::warn;

use revive_core::ComponentType;

/// A component id decoded into the key its subsystem understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentRef {
    Stream(u32),
    RemoteServer(u32),
    Plugin(String),
    Database,
    Queue(String),
    CircuitBreaker(String),
}

impl ComponentRef {
    /// Decode a component id. Returns `None` for ids outside the conventions.
    pub fn parse(component_id: &str) -> Option<Self> {
        if component_id == "database" {
            return Some(ComponentRef::Database);
        }
        if let Some(rest) = component_id.strip_prefix("remote_server_") {
            return rest.parse().ok().map(ComponentRef::RemoteServer);
        }
        if let Some(rest) = component_id.strip_prefix("stream_") {
            return rest.parse().ok().map(ComponentRef::Stream);
        }
        if let Some(name) = component_id.strip_prefix("circuit_breaker_") {
            return non_empty(name).map(ComponentRef::CircuitBreaker);
        }
        if let Some(name) = component_id.strip_prefix("plugin_") {
            return non_empty(name).map(ComponentRef::Plugin);
        }
        if let Some(name) = component_id.strip_prefix("queue_") {
            return non_empty(name).map(ComponentRef::Queue);
        }
        None
    }

    pub fn component_type(&self) -> ComponentType {
        match self {
            ComponentRef::Stream(_) => ComponentType::Stream,
            ComponentRef::RemoteServer(_) => ComponentType::RemoteServer,
            ComponentRef::Plugin(_) => ComponentType::Plugin,
            ComponentRef::Database => ComponentType::Database,
            ComponentRef::Queue(_) => ComponentType::Queue,
            ComponentRef::CircuitBreaker(_) => ComponentType::CircuitBreaker,
        }
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentRef::Stream(n) => write!(f, "stream_{n}"),
            ComponentRef::RemoteServer(n) => write!(f, "remote_server_{n}"),
            ComponentRef::Plugin(name) => write!(f, "plugin_{name}"),
            ComponentRef::Database => f.write_str("database"),
            ComponentRef::Queue(name) => write!(f, "queue_{name}"),
            ComponentRef::CircuitBreaker(name) => write!(f, "circuit_breaker_{name}"),
        }
    }
}

fn non_empty(name: &str) -> Option<String> {
    (!name.is_empty()).then(|| name.to_string())
}

pub fn stream_id(component_id: &str) -> Option<u32> {
    match ComponentRef::parse(component_id)? {
        ComponentRef::Stream(n) => Some(n),
        _ => None,
    }
}

pub fn remote_server_id(component_id: &str) -> Option<u32> {
    match ComponentRef::parse(component_id)? {
        ComponentRef::RemoteServer(n) => Some(n),
        _ => None,
    }
}

pub fn plugin_name(component_id: &str) -> Option<String> {
    match ComponentRef::parse(component_id)? {
        ComponentRef::Plugin(name) => Some(name),
        _ => None,
    }
}

pub fn queue_name(component_id: &str) -> Option<String> {
    match ComponentRef::parse(component_id)? {
        ComponentRef::Queue(name) => Some(name),
        _ => None,
    }
}

pub fn circuit_breaker_name(component_id: &str) -> Option<String> {
    match ComponentRef::parse(component_id)? {
        ComponentRef::CircuitBreaker(name) => Some(name),
        _ => None,
    }
}

pub fn is_database(component_id: &str) -> bool {
    ComponentRef::parse(component_id) == Some(ComponentRef::Database)
}

/// Outcome for an action handed an id it cannot decode: not recovered.
pub(crate) fn unrecognized(component_id: &str, method: &str) -> anyhow::Result<bool> {
    warn!(
        component = %component_id,
        %method,
        "component id not recognized by recovery adapter"
    );
    Ok(false)
}
