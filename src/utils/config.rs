// src/utils/config.rs
//! Engine settings
//!
//! Layered configuration: built-in defaults, then an optional settings
//! file, then `BOTFLEET_`-prefixed environment variables (`__` separates
//! nesting, e.g. `BOTFLEET_API__BASE_URL`).

use crate::utils::errors::{FleetError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Remote feed service settings
    pub api: ApiSettings,

    /// Broadcast fan-out listener settings
    pub broadcast: BroadcastSettings,

    /// Fleet supervisor settings
    pub supervisor: SupervisorSettings,

    /// Metrics exporter settings
    pub metrics: MetricsSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL of the remote feed service
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastSettings {
    /// Whether to run the subscriber listener
    pub enabled: bool,

    /// Listener bind host
    pub host: String,

    /// Listener bind port
    pub port: u16,

    /// Idle-read poll boundary per subscriber connection, in seconds
    pub idle_read_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorSettings {
    /// Grace period between SIGTERM and SIGKILL, in seconds
    pub grace_period_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSettings {
    /// Whether to install the Prometheus exporter
    pub enabled: bool,

    /// Exporter bind port
    pub port: u16,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            api: ApiSettings {
                base_url: "http://localhost:8000".to_string(),
            },
            broadcast: BroadcastSettings {
                enabled: true,
                host: "127.0.0.1".to_string(),
                port: 8765,
                idle_read_timeout_secs: 10,
            },
            supervisor: SupervisorSettings {
                grace_period_secs: 5,
            },
            metrics: MetricsSettings {
                enabled: false,
                port: 9100,
            },
        }
    }
}

impl EngineSettings {
    /// Load settings, optionally merging a settings file on top of the
    /// defaults and environment variables on top of both.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Self::default();

        let mut builder = config::Config::builder()
            .set_default("api.base_url", defaults.api.base_url)
            .map_err(config_err)?
            .set_default("broadcast.enabled", defaults.broadcast.enabled)
            .map_err(config_err)?
            .set_default("broadcast.host", defaults.broadcast.host)
            .map_err(config_err)?
            .set_default("broadcast.port", defaults.broadcast.port as i64)
            .map_err(config_err)?
            .set_default(
                "broadcast.idle_read_timeout_secs",
                defaults.broadcast.idle_read_timeout_secs as i64,
            )
            .map_err(config_err)?
            .set_default(
                "supervisor.grace_period_secs",
                defaults.supervisor.grace_period_secs as i64,
            )
            .map_err(config_err)?
            .set_default("metrics.enabled", defaults.metrics.enabled)
            .map_err(config_err)?
            .set_default("metrics.port", defaults.metrics.port as i64)
            .map_err(config_err)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        builder
            .add_source(config::Environment::with_prefix("BOTFLEET").separator("__"))
            .build()
            .map_err(config_err)?
            .try_deserialize()
            .map_err(config_err)
    }
}

fn config_err(e: config::ConfigError) -> FleetError {
    FleetError::Config(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.api.base_url, "http://localhost:8000");
        assert_eq!(settings.supervisor.grace_period_secs, 5);
        assert!(settings.broadcast.enabled);
    }

    #[test]
    fn test_load_without_file() {
        let settings = EngineSettings::load(None).unwrap();
        assert_eq!(settings.broadcast.port, 8765);
    }

    #[test]
    fn test_load_with_file_override() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        writeln!(file, "api:\n  base_url: http://feed.test:9000").unwrap();

        let settings = EngineSettings::load(Some(file.path())).unwrap();
        assert_eq!(settings.api.base_url, "http://feed.test:9000");
        // Untouched keys keep their defaults
        assert_eq!(settings.supervisor.grace_period_secs, 5);
    }
}
