// src/fleet/mod.rs
//! Fleet supervision
//!
//! Process-per-agent lifecycle management:
//! - Spawning agent child processes (spawner)
//! - Start/stop/status bookkeeping with graceful shutdown (supervisor)
//! - /proc-based CPU and memory introspection (proc_stats)
//! - Declarative fleet files in JSON or YAML (config)
//! - Interactive operator console (console)

pub mod config;
pub mod console;
pub mod proc_stats;
pub mod spawner;
pub mod supervisor;

pub use config::{FleetConfig, FleetEntry};
pub use console::Console;
pub use spawner::AgentSpawner;
pub use supervisor::{AgentStatus, FleetSupervisor};
