//! Recovery tunables and the `revive.toml` daemon config.
//!
//! Durations are written as strings (`"500ms"`, `"5s"`, `"2m"`, `"1h"`);
//! a bare integer is read as seconds.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{ComponentType, RecoveryPlan};

/// Immutable tunables for the attempt state machine and monitoring loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Attempts numbered above this are abandoned before any method runs.
    pub max_retry_attempts: u32,
    #[serde(with = "duration_str")]
    pub initial_retry_delay: Duration,
    #[serde(with = "duration_str")]
    pub max_retry_delay: Duration,
    pub exponential_backoff_factor: f64,
    /// Pause between monitoring passes.
    #[serde(with = "duration_str")]
    pub health_check_interval: Duration,
    /// Hard timeout for a single recovery method call.
    #[serde(with = "duration_str")]
    pub recovery_timeout: Duration,
    pub escalation_enabled: bool,
    pub respect_dependencies: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retry_attempts: 3,
            initial_retry_delay: Duration::from_secs(5),
            max_retry_delay: Duration::from_secs(300),
            exponential_backoff_factor: 2.0,
            health_check_interval: Duration::from_secs(30),
            recovery_timeout: Duration::from_secs(60),
            escalation_enabled: true,
            respect_dependencies: true,
        }
    }
}

impl RecoveryConfig {
    /// Delay inserted between recovery methods for the given attempt:
    /// `min(initial * factor^(attempt - 1), max)`.
    pub fn backoff_delay(&self, attempt_number: u32) -> Duration {
        let exponent = attempt_number.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs =
            self.initial_retry_delay.as_secs_f64() * self.exponential_backoff_factor.powi(exponent);
        if !secs.is_finite() || secs < 0.0 {
            return self.max_retry_delay;
        }
        Duration::try_from_secs_f64(secs)
            .map(|d| d.min(self.max_retry_delay))
            .unwrap_or(self.max_retry_delay)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.exponential_backoff_factor >= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "exponential_backoff_factor must be >= 1.0, got {}",
                self.exponential_backoff_factor
            )));
        }
        if self.recovery_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "recovery_timeout must be non-zero".to_string(),
            ));
        }
        if self.health_check_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "health_check_interval must be non-zero".to_string(),
            ));
        }
        if self.initial_retry_delay > self.max_retry_delay {
            return Err(ConfigError::Invalid(format!(
                "initial_retry_delay ({:?}) exceeds max_retry_delay ({:?})",
                self.initial_retry_delay, self.max_retry_delay
            )));
        }
        Ok(())
    }
}

// ── Daemon config file ─────────────────────────────────────────────

/// Top-level `revive.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub recovery: RecoveryConfig,
    #[serde(default)]
    pub components: Vec<ComponentConfig>,
    #[serde(default)]
    pub methods: Vec<MethodConfig>,
}

/// A monitored component declared in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    pub probe: ProbeConfig,
    /// Ordered method names. Falls back to the type's defaults.
    pub methods: Option<Vec<String>>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub priority: Option<u32>,
    /// Per-component override of the `[recovery]` table.
    pub recovery: Option<RecoveryConfig>,
}

impl ComponentConfig {
    /// Build the recovery plan described by this entry.
    pub fn to_plan(&self) -> RecoveryPlan {
        let mut plan = RecoveryPlan::new(&self.id, self.component_type);
        if let Some(methods) = &self.methods {
            plan = plan.with_methods(methods.iter().cloned());
        }
        for dep in &self.dependencies {
            plan = plan.with_dependency(dep);
        }
        if let Some(priority) = self.priority {
            plan = plan.with_priority(priority);
        }
        if let Some(config) = &self.recovery {
            plan = plan.with_config(config.clone());
        }
        plan
    }
}

/// How the daemon decides whether a component is healthy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeConfig {
    /// HTTP GET expecting a 2xx response.
    Http {
        address: String,
        #[serde(default = "default_probe_path")]
        path: String,
        #[serde(default = "default_probe_timeout", with = "duration_str")]
        timeout: Duration,
    },
    /// TCP connect succeeds.
    Tcp {
        address: String,
        #[serde(default = "default_probe_timeout", with = "duration_str")]
        timeout: Duration,
    },
}

fn default_probe_path() -> String {
    "/healthz".to_string()
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(2)
}

/// A recovery method implemented by running an external command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodConfig {
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    pub name: String,
    /// Program and arguments.
    pub command: Vec<String>,
    pub working_dir: Option<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Check cross-entry consistency that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.recovery.validate()?;

        let mut ids = HashSet::new();
        for component in &self.components {
            if !ids.insert(component.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate component id: {}",
                    component.id
                )));
            }
        }

        for component in &self.components {
            for dep in &component.dependencies {
                if !ids.contains(dep.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "component {} depends on unknown component {dep}",
                        component.id
                    )));
                }
            }
            component
                .to_plan()
                .validate()
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }

        let mut methods = HashSet::new();
        for method in &self.methods {
            if method.command.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "method {}/{} has an empty command",
                    method.component_type, method.name
                )));
            }
            if !methods.insert((method.component_type, method.name.as_str())) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate method {}/{}",
                    method.component_type, method.name
                )));
            }
        }

        Ok(())
    }
}

/// Parse a duration string like "5s", "500ms", "2m", "1h".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else if let Some(hours) = s.strip_suffix('h') {
        hours.parse::<u64>().ok().map(|h| Duration::from_secs(h * 3600))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

/// Inverse of `parse_duration`: whole seconds as "Ns", anything else as "Nms".
pub fn format_duration(d: Duration) -> String {
    if d.subsec_nanos() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}

pub(crate) mod duration_str {
    use std::time::Duration;

    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Secs(u64),
    }

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        match Raw::deserialize(d)? {
            Raw::Text(text) => super::parse_duration(&text)
                .ok_or_else(|| D::Error::custom(format!("invalid duration: {text}"))),
            Raw::Secs(secs) => Ok(Duration::from_secs(secs)),
        }
    }
}
