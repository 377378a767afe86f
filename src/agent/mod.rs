// src/agent/mod.rs
//! Per-agent behavioral runtime
//!
//! One `AgentRuntime` per simulated user. Each runtime owns:
//!
//! - a lifecycle state machine (register -> authenticate -> active loop)
//! - three independent due-timers (post, like, reply)
//! - a pluggable behavior policy for content and decisions
//!
//! The runtime itself is single-threaded and cooperative: timer checks and
//! the network calls they trigger run sequentially inside one execution
//! unit, and a shared cancellation token is observed once per polling
//! quantum.

pub mod config;
pub mod runtime;
pub mod timers;

pub use config::AgentConfig;
pub use runtime::{AgentRuntime, AgentState};
pub use timers::ActionTimer;
