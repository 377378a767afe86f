// src/fleet/spawner.rs
//! Agent process spawning
//!
//! Builds the child `Command` for one agent. The default spawner
//! re-executes the current binary with the hidden `agent` subcommand
//! and hands the full agent config over as a single JSON argument.
//! The program is overridable so the supervisor can be exercised
//! against arbitrary executables.

use crate::agent::AgentConfig;
use crate::utils::errors::{FleetError, Result};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::debug;

/// Spawner for agent child processes
#[derive(Debug, Clone)]
pub struct AgentSpawner {
    program: PathBuf,
    base_args: Vec<String>,
    pass_agent_args: bool,
}

impl AgentSpawner {
    /// Spawner that re-executes the running binary in agent mode.
    pub fn current_exe() -> Result<Self> {
        let program = std::env::current_exe()
            .map_err(|e| FleetError::Process(format!("cannot resolve current executable: {e}")))?;
        Ok(Self {
            program,
            base_args: vec!["agent".to_string()],
            pass_agent_args: true,
        })
    }

    /// Spawner for an arbitrary external program. The agent identity and
    /// config are not passed; the fixed args are used verbatim.
    pub fn external(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            base_args: args,
            pass_agent_args: false,
        }
    }

    /// Spawn one agent process.
    pub fn spawn(&self, id: &str, variant: &str, config: &AgentConfig) -> Result<Child> {
        let mut command = Command::new(&self.program);
        command.args(&self.base_args);

        if self.pass_agent_args {
            let config_json = serde_json::to_string(config)?;
            command
                .arg("--id")
                .arg(id)
                .arg("--variant")
                .arg(variant)
                .arg("--config")
                .arg(config_json);
        }

        // Children log straight to the supervisor's stderr
        command
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = command
            .spawn()
            .map_err(|e| FleetError::Process(format!("failed to spawn agent '{id}': {e}")))?;

        debug!(agent = id, variant, pid = child.id(), "agent process spawned");
        Ok(child)
    }
}
