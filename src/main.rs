// src/main.rs
//! Botfleet supervisor binary
//!
//! Runs in two modes:
//! - supervisor (default): starts the fleet from an optional fleet file,
//!   optionally serves the broadcast listener and the operator console,
//!   and stops every agent exactly once on SIGINT/SIGTERM.
//! - `agent` (hidden subcommand): the child-process entry used by the
//!   spawner; runs one agent to completion and exits 0 only when the
//!   agent left through the Stopped state.

use botfleet::agent::{AgentConfig, AgentRuntime, AgentState};
use botfleet::broadcast::{BroadcastServer, FanoutManager};
use botfleet::fleet::{AgentSpawner, Console, FleetConfig, FleetSupervisor};
use botfleet::observability::{init_metrics, init_tracing};
use botfleet::policy::PolicyRegistry;
use botfleet::utils::config::EngineSettings;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Parser)]
#[command(name = "botfleet", version, about = "Social feed agent fleet simulator")]
struct Cli {
    /// Fleet file to apply on startup (.json or .yaml)
    #[arg(long)]
    fleet: Option<PathBuf>,

    /// Drop into the operator console after startup
    #[arg(long)]
    interactive: bool,

    /// Engine settings file
    #[arg(long, env = "BOTFLEET_SETTINGS")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Child-process entry; spawned by the supervisor
    #[command(hide = true)]
    Agent {
        #[arg(long)]
        id: String,

        #[arg(long)]
        variant: String,

        /// Full agent config as one JSON document
        #[arg(long)]
        config: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = init_tracing() {
        eprintln!("failed to initialize tracing: {e}");
        return ExitCode::FAILURE;
    }

    let cli = Cli::parse();
    match cli.command {
        Some(Command::Agent {
            id,
            variant,
            config,
        }) => run_agent(id, variant, config).await,
        None => match run_supervisor(cli).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = %e, "supervisor failed");
                ExitCode::FAILURE
            }
        },
    }
}

/// Child-process mode: one agent, driven until stopped or errored.
async fn run_agent(id: String, variant: String, config_json: String) -> ExitCode {
    let config: AgentConfig = match serde_json::from_str(&config_json) {
        Ok(config) => config,
        Err(e) => {
            error!(agent = %id, error = %e, "invalid agent config");
            return ExitCode::FAILURE;
        }
    };

    let registry = PolicyRegistry::builtin();
    let policy = match registry.create(&variant, &config) {
        Ok(policy) => policy,
        Err(e) => {
            error!(agent = %id, error = %e, "cannot construct policy");
            return ExitCode::FAILURE;
        }
    };

    let stop = CancellationToken::new();
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            stop.cancel();
        });
    }

    let mut runtime = match AgentRuntime::new(&id, config, policy, stop) {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(agent = %id, error = %e, "cannot construct agent runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.run().await {
        AgentState::Stopped => ExitCode::SUCCESS,
        other => {
            error!(agent = %id, state = %other, "agent exited abnormally");
            ExitCode::FAILURE
        }
    }
}

/// Supervisor mode: fleet file, optional broadcast listener, optional
/// console, single stop-all on shutdown.
async fn run_supervisor(cli: Cli) -> anyhow::Result<()> {
    let settings = EngineSettings::load(cli.settings.as_deref())?;
    init_metrics(&settings.metrics)?;
    info!(version = botfleet::VERSION, "starting botfleet supervisor");

    let spawner = AgentSpawner::current_exe()?;
    let supervisor = Arc::new(FleetSupervisor::new(
        spawner,
        Duration::from_secs(settings.supervisor.grace_period_secs),
    ));

    if settings.broadcast.enabled {
        let fanout = Arc::new(FanoutManager::new());
        let server = Arc::new(BroadcastServer::new(
            fanout,
            Duration::from_secs(settings.broadcast.idle_read_timeout_secs),
        ));
        let addr: SocketAddr =
            format!("{}:{}", settings.broadcast.host, settings.broadcast.port).parse()?;
        tokio::spawn(async move {
            if let Err(e) = server.serve(addr).await {
                error!(error = %e, "broadcast server failed");
            }
        });
    }

    if let Some(path) = cli.fleet.as_deref() {
        let fleet = FleetConfig::from_path(path)?;
        let total = fleet.agents.len();
        let started = supervisor.apply(fleet).await;
        info!(started, total, "fleet file applied");
    }

    // One stop-all regardless of how many signals arrive
    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            loop {
                wait_for_shutdown_signal().await;
                if shutdown.is_cancelled() {
                    debug!("already shutting down, ignoring signal");
                } else {
                    shutdown.cancel();
                }
            }
        });
    }

    if cli.interactive {
        let console = Console::new(Arc::clone(&supervisor), settings.api.base_url.clone());
        tokio::select! {
            result = console.run() => result?,
            _ = shutdown.cancelled() => {}
        }
    } else {
        shutdown.cancelled().await;
    }

    info!("shutting down, stopping fleet");
    supervisor.stop_all().await;
    Ok(())
}

async fn wait_for_shutdown_signal() {
    let mut term = signal(SignalKind::terminate()).ok();
    let terminated = async {
        match term.as_mut() {
            Some(stream) => {
                stream.recv().await;
            }
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminated => {}
    }
}
