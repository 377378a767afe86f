// src/fleet/config.rs
//! Declarative fleet configuration
//!
//! A fleet file is `{agents: [{id, type, config}]}` in JSON or YAML,
//! picked by file extension. Entries are deliberately lenient: id and
//! type are optional at parse time so one malformed entry can be
//! skipped at apply time instead of aborting the whole batch.

use crate::agent::AgentConfig;
use crate::utils::errors::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One agent entry in a fleet file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,

    #[serde(default)]
    pub config: AgentConfig,
}

/// A declarative description of a whole fleet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetConfig {
    #[serde(default)]
    pub agents: Vec<FleetEntry>,
}

impl FleetConfig {
    /// Load a fleet file, dispatching on the `.yaml`/`.yml` extension
    /// and defaulting to JSON otherwise.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        if is_yaml(path) {
            Ok(serde_yaml::from_str(&raw)?)
        } else {
            Ok(serde_json::from_str(&raw)?)
        }
    }

    /// Write the fleet file in the format the extension implies.
    pub fn to_path(&self, path: &Path) -> Result<()> {
        let raw = if is_yaml(path) {
            serde_yaml::to_string(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };
        std::fs::write(path, raw)?;
        Ok(())
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const FLEET_JSON: &str = r#"{
        "agents": [
            {"id": "a1", "type": "random", "config": {"post_interval": 10}},
            {"type": "random"},
            {"id": "a2", "type": "topical", "config": {"keywords": ["rust"]}}
        ]
    }"#;

    #[test]
    fn test_json_fleet_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fleet.json");
        std::fs::write(&path, FLEET_JSON).unwrap();

        let fleet = FleetConfig::from_path(&path).unwrap();
        assert_eq!(fleet.agents.len(), 3);
        assert_eq!(fleet.agents[0].id.as_deref(), Some("a1"));
        assert_eq!(fleet.agents[0].config.post_interval, 10);
        // Malformed entries still parse; apply() decides what to skip
        assert!(fleet.agents[1].id.is_none());
    }

    #[test]
    fn test_yaml_fleet_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fleet.yaml");
        std::fs::write(
            &path,
            "agents:\n  - id: a1\n    type: generator\n    config:\n      model_name: llama3.2:latest\n",
        )
        .unwrap();

        let fleet = FleetConfig::from_path(&path).unwrap();
        assert_eq!(fleet.agents[0].variant.as_deref(), Some("generator"));
        assert_eq!(
            fleet.agents[0].config.extra_str("model_name").as_deref(),
            Some("llama3.2:latest")
        );
    }

    #[test]
    fn test_roundtrip_preserves_entries() {
        let dir = tempdir().unwrap();
        let fleet: FleetConfig = serde_json::from_str(FLEET_JSON).unwrap();

        for name in ["fleet.json", "fleet.yml"] {
            let path = dir.path().join(name);
            fleet.to_path(&path).unwrap();
            let loaded = FleetConfig::from_path(&path).unwrap();
            assert_eq!(loaded.agents.len(), fleet.agents.len());
            assert_eq!(loaded.agents[2].id, fleet.agents[2].id);
            assert_eq!(
                loaded.agents[2].config.extra_string_list("keywords"),
                fleet.agents[2].config.extra_string_list("keywords")
            );
        }
    }
}
