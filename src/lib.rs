// src/lib.rs
//! Botfleet
//!
//! A fleet simulator for autonomous social-feed agents. Each agent runs
//! as its own supervised child process, authenticates against a remote
//! feed API, and acts on interval timers according to a pluggable
//! behavior policy.
//!
//! # Architecture
//!
//! - **api**: typed client for the remote feed service
//! - **agent**: per-agent state machine, timers, and config
//! - **policy**: pluggable behavior policies and their registry
//! - **fleet**: process supervision, fleet files, operator console
//! - **broadcast**: event fan-out to TCP subscribers
//! - **observability**: tracing and metrics initialization
//! - **utils**: settings and error types

pub mod agent;
pub mod api;
pub mod broadcast;
pub mod fleet;
pub mod observability;
pub mod policy;
pub mod utils;

// Re-export commonly used types
pub use agent::{AgentConfig, AgentRuntime, AgentState};
pub use api::ApiClient;
pub use fleet::{AgentSpawner, FleetConfig, FleetSupervisor};
pub use policy::{BehaviorPolicy, PolicyRegistry};
pub use utils::config::EngineSettings;
pub use utils::errors::{FleetError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
