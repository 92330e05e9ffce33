//! Recovery methods backed by external commands.
//!
//! The daemon has no in-process handle on the services it supervises, so
//! each configured method runs a program. Exit status 0 means the program
//! believes it fixed the component. The component id is exported as
//! `REVIVE_COMPONENT_ID`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, bail};
use async_trait::async_trait;
use tracing::{debug, warn};

use revive_core::MethodConfig;
use revive_orchestrator::RecoveryAction;

pub const COMPONENT_ID_ENV: &str = "REVIVE_COMPONENT_ID";

#[derive(Debug, Clone)]
pub struct CommandAction {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
}

impl CommandAction {
    /// Build from an argv. Fails if `argv` is empty.
    pub fn new(argv: &[String]) -> anyhow::Result<Self> {
        let Some((program, args)) = argv.split_first() else {
            bail!("recovery command is empty");
        };
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            working_dir: None,
            env: BTreeMap::new(),
        })
    }

    pub fn from_config(config: &MethodConfig) -> anyhow::Result<Self> {
        let mut action = Self::new(&config.command)
            .with_context(|| format!("method {}/{}", config.component_type, config.name))?;
        action.working_dir = config.working_dir.clone();
        action.env = config.env.clone();
        Ok(action)
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl RecoveryAction for CommandAction {
    async fn recover(&self, component_id: &str) -> anyhow::Result<bool> {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .envs(&self.env)
            .env(COMPONENT_ID_ENV, component_id)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A timed-out method drops this future; take the child with it.
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        debug!(component = %component_id, program = %self.program, "running recovery command");
        let output = cmd
            .output()
            .await
            .with_context(|| format!("spawning {}", self.program))?;

        if output.status.success() {
            return Ok(true);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(
            component = %component_id,
            program = %self.program,
            status = %output.status,
            stderr = %stderr.trim(),
            "recovery command failed"
        );
        Ok(false)
    }
}
