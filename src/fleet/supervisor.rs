// src/fleet/supervisor.rs
//! Fleet supervisor
//!
//! Keeps at most one live process handle per agent id. Stopping is
//! graceful: SIGTERM, a bounded grace period, then SIGKILL. Status is
//! derived from the child handle plus /proc introspection; a process
//! that is alive but unreadable reports Unknown, never Crashed.

use crate::agent::AgentConfig;
use crate::fleet::config::{FleetConfig, FleetEntry};
use crate::fleet::proc_stats;
use crate::fleet::spawner::AgentSpawner;
use crate::policy::PolicyRegistry;
use crate::utils::errors::{FleetError, Result};
use metrics::gauge;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::process::Child;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Live handle for one supervised agent process
struct AgentProcess {
    child: Child,
    variant: String,
    config: AgentConfig,
    started_at: Instant,
}

/// Observed lifecycle status of an agent id
#[derive(Debug, Clone, PartialEq)]
pub enum AgentStatus {
    NotRunning,
    Running {
        variant: String,
        pid: u32,
        cpu_percent: f64,
        memory_mb: f64,
        uptime: Duration,
    },
    Crashed {
        exit_code: Option<i32>,
    },
    /// Alive but introspection failed
    Unknown {
        variant: String,
        pid: Option<u32>,
    },
}

/// Supervisor over a fleet of agent child processes
pub struct FleetSupervisor {
    agents: RwLock<HashMap<String, AgentProcess>>,
    spawner: AgentSpawner,
    registry: PolicyRegistry,
    grace_period: Duration,
}

impl FleetSupervisor {
    pub fn new(spawner: AgentSpawner, grace_period: Duration) -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            spawner,
            registry: PolicyRegistry::builtin(),
            grace_period,
        }
    }

    /// Registered policy variant names, for the console and validation.
    pub fn variant_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Start an agent under the given id. Fails with `AlreadyRunning`
    /// (and no side effect) when a live process already holds the id; a
    /// crashed holder is reaped and replaced.
    pub async fn start(&self, id: &str, variant: &str, config: AgentConfig) -> Result<()> {
        if !self.registry.contains(variant) {
            return Err(FleetError::Config(format!(
                "unknown agent type '{variant}'"
            )));
        }

        let mut agents = self.agents.write().await;

        if let Some(existing) = agents.get_mut(id) {
            match existing.child.try_wait() {
                Ok(None) => return Err(FleetError::AlreadyRunning(id.to_string())),
                Ok(Some(status)) => {
                    info!(agent = id, ?status, "reaping crashed agent before restart");
                    agents.remove(id);
                }
                Err(e) => {
                    warn!(agent = id, error = %e, "cannot poll existing agent, keeping it");
                    return Err(FleetError::AlreadyRunning(id.to_string()));
                }
            }
        }

        let child = self.spawner.spawn(id, variant, &config)?;
        let pid = child.id();
        agents.insert(
            id.to_string(),
            AgentProcess {
                child,
                variant: variant.to_string(),
                config,
                started_at: Instant::now(),
            },
        );

        info!(agent = id, variant, pid, "agent started");
        gauge!("fleet_running_agents").set(agents.len() as f64);
        Ok(())
    }

    /// Stop an agent gracefully. Fails with `NotRunning` when the id
    /// holds no process; stopping an already-exited process succeeds.
    pub async fn stop(&self, id: &str) -> Result<()> {
        let process = {
            let mut agents = self.agents.write().await;
            let process = agents
                .remove(id)
                .ok_or_else(|| FleetError::NotRunning(id.to_string()))?;
            gauge!("fleet_running_agents").set(agents.len() as f64);
            process
        };

        self.terminate(id, process).await;
        Ok(())
    }

    /// Stop every running agent. Terminations run concurrently.
    pub async fn stop_all(&self) {
        let drained: Vec<(String, AgentProcess)> = {
            let mut agents = self.agents.write().await;
            let drained = agents.drain().collect();
            gauge!("fleet_running_agents").set(0.0);
            drained
        };

        if drained.is_empty() {
            return;
        }

        info!(count = drained.len(), "stopping all agents");
        futures::future::join_all(
            drained
                .into_iter()
                .map(|(id, process)| async move { self.terminate(&id, process).await }),
        )
        .await;
    }

    /// SIGTERM, wait out the grace period, then SIGKILL.
    async fn terminate(&self, id: &str, mut process: AgentProcess) {
        if let Ok(Some(status)) = process.child.try_wait() {
            debug!(agent = id, ?status, "agent already exited");
            return;
        }

        let Some(pid) = process.child.id() else {
            return;
        };

        debug!(agent = id, pid, "sending SIGTERM");
        if let Err(e) = signal_pid(pid, nix::sys::signal::Signal::SIGTERM) {
            warn!(agent = id, pid, error = %e, "SIGTERM failed");
        }

        match tokio::time::timeout(self.grace_period, process.child.wait()).await {
            Ok(Ok(status)) => {
                info!(agent = id, ?status, "agent stopped gracefully");
            }
            Ok(Err(e)) => {
                warn!(agent = id, error = %e, "wait on agent failed");
            }
            Err(_) => {
                warn!(agent = id, pid, "grace period elapsed, sending SIGKILL");
                if let Err(e) = signal_pid(pid, nix::sys::signal::Signal::SIGKILL) {
                    warn!(agent = id, pid, error = %e, "SIGKILL failed");
                }
                match process.child.wait().await {
                    Ok(status) => info!(agent = id, ?status, "agent force-killed"),
                    Err(e) => warn!(agent = id, error = %e, "wait after SIGKILL failed"),
                }
            }
        }
    }

    /// Status for one agent id.
    pub async fn status(&self, id: &str) -> AgentStatus {
        let (variant, pid, started_at) = {
            let mut agents = self.agents.write().await;
            let Some(process) = agents.get_mut(id) else {
                return AgentStatus::NotRunning;
            };

            match process.child.try_wait() {
                Ok(Some(status)) => {
                    return AgentStatus::Crashed {
                        exit_code: status.code(),
                    }
                }
                Ok(None) => (
                    process.variant.clone(),
                    process.child.id(),
                    process.started_at,
                ),
                Err(_) => {
                    return AgentStatus::Unknown {
                        variant: process.variant.clone(),
                        pid: process.child.id(),
                    }
                }
            }
        };

        // Sampled outside the lock; the 100ms CPU window must not stall
        // other supervisor calls.
        let Some(pid) = pid else {
            return AgentStatus::Unknown { variant, pid: None };
        };

        match proc_stats::sample(pid).await {
            Some(stats) => AgentStatus::Running {
                variant,
                pid,
                cpu_percent: stats.cpu_percent,
                memory_mb: stats.memory_mb,
                uptime: started_at.elapsed(),
            },
            None => AgentStatus::Unknown {
                variant,
                pid: Some(pid),
            },
        }
    }

    /// Ids of agents whose process is currently alive, sorted.
    pub async fn running_ids(&self) -> Vec<String> {
        let mut agents = self.agents.write().await;
        let mut ids: Vec<String> = agents
            .iter_mut()
            .filter_map(|(id, process)| {
                matches!(process.child.try_wait(), Ok(None)).then(|| id.clone())
            })
            .collect();
        ids.sort();
        ids
    }

    /// Start every well-formed entry of a declarative fleet config.
    /// Malformed or failing entries are logged and skipped; the return
    /// value is the number of agents actually started.
    pub async fn apply(&self, fleet: FleetConfig) -> usize {
        let mut started = 0;
        for entry in fleet.agents {
            let (Some(id), Some(variant)) = (entry.id.as_deref(), entry.variant.as_deref()) else {
                warn!("skipping fleet entry without id or type");
                continue;
            };

            match self.start(id, variant, entry.config).await {
                Ok(()) => started += 1,
                Err(e) => warn!(agent = id, error = %e, "fleet entry failed to start"),
            }
        }
        started
    }

    /// The running set's effective configuration, as a fleet config that
    /// `apply` would reproduce.
    pub async fn snapshot(&self) -> FleetConfig {
        let agents = self.agents.read().await;
        let mut entries: Vec<FleetEntry> = agents
            .iter()
            .map(|(id, process)| FleetEntry {
                id: Some(id.clone()),
                variant: Some(process.variant.clone()),
                config: process.config.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        FleetConfig { agents: entries }
    }
}

fn signal_pid(pid: u32, signal: nix::sys::signal::Signal) -> Result<()> {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), signal)
        .map_err(|e| FleetError::Process(format!("kill({pid}, {signal}) failed: {e}")))
}
