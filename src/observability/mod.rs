// src/observability/mod.rs
//! Tracing and metrics initialization
//!
//! Log filtering follows `RUST_LOG` with an `info` default; setting
//! `BOTFLEET_LOG_JSON=1` switches to line-delimited JSON output. The
//! Prometheus exporter is opt-in via the metrics settings and exposes
//! the gauges and counters maintained across the crate.

use crate::utils::config::MetricsSettings;
use crate::utils::errors::{FleetError, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var("BOTFLEET_LOG_JSON")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let result = if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    result.map_err(|e| FleetError::Config(format!("tracing init failed: {e}")))
}

/// Install the Prometheus exporter when metrics are enabled.
pub fn init_metrics(settings: &MetricsSettings) -> Result<()> {
    if !settings.enabled {
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], settings.port))
        .install()
        .map_err(|e| FleetError::Config(format!("metrics exporter install failed: {e}")))?;

    info!(port = settings.port, "prometheus exporter listening");
    Ok(())
}
