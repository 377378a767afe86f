// src/utils/mod.rs
//! Common utilities
//!
//! - **errors**: crate-wide error taxonomy and `Result` alias
//! - **config**: engine settings loaded from file and environment

pub mod config;
pub mod errors;

pub use config::EngineSettings;
pub use errors::{FleetError, Result};
