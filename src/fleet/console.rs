// src/fleet/console.rs
//! Interactive operator console
//!
//! Line-oriented commands against the supervisor:
//!
//! ```text
//! list | start <id> <type> [key=value ...] | stop <id> | stopall
//! status <id> | load <path> | save <path> | types | help | exit
//! ```
//!
//! `key=value` overrides are coerced bool, then integer, then float,
//! then string, and merged into the agent config before starting.

use crate::agent::AgentConfig;
use crate::fleet::config::FleetConfig;
use crate::fleet::supervisor::{AgentStatus, FleetSupervisor};
use crate::utils::errors::{FleetError, Result};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;

const HELP: &str = "\
commands:
  list                              running agents and their status
  start <id> <type> [key=value ..]  start one agent
  stop <id>                         stop one agent gracefully
  stopall                           stop every agent
  status <id>                       detailed status for one agent
  load <path>                       start agents from a fleet file (.json/.yaml)
  save <path>                       write the running fleet to a file
  types                             registered agent types
  help                              this text
  exit                              stop all agents and quit";

/// Result of executing one console line
enum Outcome {
    Message(String),
    Exit,
}

/// Operator console bound to one supervisor
pub struct Console {
    supervisor: Arc<FleetSupervisor>,
    api_url: String,
}

impl Console {
    pub fn new(supervisor: Arc<FleetSupervisor>, api_url: String) -> Self {
        Self {
            supervisor,
            api_url,
        }
    }

    /// Read commands from stdin until `exit` or EOF.
    pub async fn run(&self) -> Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();

        println!("botfleet console; type 'help' for commands");
        while let Some(line) = lines.next_line().await? {
            match self.execute(&line).await {
                Outcome::Message(text) => {
                    if !text.is_empty() {
                        println!("{text}");
                    }
                }
                Outcome::Exit => break,
            }
        }

        self.supervisor.stop_all().await;
        Ok(())
    }

    async fn execute(&self, line: &str) -> Outcome {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let result = match parts.as_slice() {
            [] => Ok(String::new()),
            ["help"] => Ok(HELP.to_string()),
            ["exit" | "quit"] => return Outcome::Exit,
            ["types"] => Ok(self.supervisor.variant_names().join(", ")),
            ["list"] => self.list().await,
            ["start", id, variant, overrides @ ..] => self.start(id, variant, overrides).await,
            ["stop", id] => self.stop(id).await,
            ["stopall"] => {
                self.supervisor.stop_all().await;
                Ok("all agents stopped".to_string())
            }
            ["status", id] => {
                let status = self.supervisor.status(id).await;
                Ok(format_status(id, &status))
            }
            ["load", path] => self.load(Path::new(path)).await,
            ["save", path] => self.save(Path::new(path)).await,
            _ => Err(FleetError::Config(format!(
                "unrecognized command '{line}'; type 'help'"
            ))),
        };

        match result {
            Ok(text) => Outcome::Message(text),
            Err(e) => Outcome::Message(format!("error: {e}")),
        }
    }

    async fn list(&self) -> Result<String> {
        let fleet = self.supervisor.snapshot().await;
        if fleet.agents.is_empty() {
            return Ok("no agents".to_string());
        }

        let mut out = Vec::with_capacity(fleet.agents.len());
        for entry in &fleet.agents {
            if let Some(id) = entry.id.as_deref() {
                let status = self.supervisor.status(id).await;
                out.push(format_status(id, &status));
            }
        }
        Ok(out.join("\n"))
    }

    async fn start(&self, id: &str, variant: &str, overrides: &[&str]) -> Result<String> {
        let config = self.build_config(overrides)?;
        self.supervisor.start(id, variant, config).await?;
        Ok(format!("started {id} ({variant})"))
    }

    async fn stop(&self, id: &str) -> Result<String> {
        self.supervisor.stop(id).await?;
        Ok(format!("stopped {id}"))
    }

    async fn load(&self, path: &Path) -> Result<String> {
        let fleet = FleetConfig::from_path(path)?;
        let total = fleet.agents.len();
        let started = self.supervisor.apply(fleet).await;
        Ok(format!("started {started} of {total} agent(s)"))
    }

    async fn save(&self, path: &Path) -> Result<String> {
        let fleet = self.supervisor.snapshot().await;
        fleet.to_path(path)?;
        Ok(format!("saved {} agent(s) to {}", fleet.agents.len(), path.display()))
    }

    /// Merge `key=value` overrides over a default config pointed at the
    /// configured API.
    fn build_config(&self, overrides: &[&str]) -> Result<AgentConfig> {
        let mut map = serde_json::Map::new();
        map.insert("api_url".to_string(), Value::String(self.api_url.clone()));

        for pair in overrides {
            let Some((key, value)) = pair.split_once('=') else {
                return Err(FleetError::Config(format!(
                    "expected key=value, got '{pair}'"
                )));
            };
            map.insert(key.to_string(), coerce(value));
        }

        Ok(serde_json::from_value(Value::Object(map))?)
    }
}

/// Coerce a raw console value: bool, then integer, then float, then
/// falls back to the literal string.
fn coerce(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(f) = raw.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(raw.to_string())
}

fn format_status(id: &str, status: &AgentStatus) -> String {
    match status {
        AgentStatus::NotRunning => format!("{id}: not running"),
        AgentStatus::Running {
            variant,
            pid,
            cpu_percent,
            memory_mb,
            uptime,
        } => format!(
            "{id}: running ({variant}) pid={pid} cpu={cpu_percent:.1}% mem={memory_mb:.1}MB up={}s",
            uptime.as_secs()
        ),
        AgentStatus::Crashed { exit_code } => match exit_code {
            Some(code) => format!("{id}: crashed (exit code {code})"),
            None => format!("{id}: crashed (killed by signal)"),
        },
        AgentStatus::Unknown { variant, .. } => format!("{id}: unknown ({variant})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::spawner::AgentSpawner;
    use std::time::Duration;

    fn console() -> Console {
        let supervisor = Arc::new(FleetSupervisor::new(
            AgentSpawner::external("sleep", vec!["60".to_string()]),
            Duration::from_secs(2),
        ));
        Console::new(supervisor, "http://localhost:8000".to_string())
    }

    #[test]
    fn test_value_coercion_order() {
        assert_eq!(coerce("true"), Value::Bool(true));
        assert_eq!(coerce("false"), Value::Bool(false));
        assert_eq!(coerce("42"), Value::Number(42.into()));
        assert_eq!(coerce("0.5"), serde_json::json!(0.5));
        assert_eq!(coerce("llama3.2:latest"), Value::String("llama3.2:latest".into()));
    }

    #[test]
    fn test_build_config_merges_overrides() {
        let console = console();
        let config = console
            .build_config(&["post_interval=15", "like_probability=0.9", "keywords=news"])
            .unwrap();

        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.post_interval, 15);
        assert_eq!(config.like_probability, 0.9);
        assert_eq!(config.extra_str("keywords").as_deref(), Some("news"));
    }

    #[test]
    fn test_build_config_rejects_bare_tokens() {
        let console = console();
        assert!(console.build_config(&["post_interval"]).is_err());
    }

    #[tokio::test]
    async fn test_start_list_stop_session() {
        let console = console();

        let Outcome::Message(out) = console.execute("start a1 random post_interval=5").await
        else {
            panic!("start must not exit")
        };
        assert_eq!(out, "started a1 (random)");

        let Outcome::Message(out) = console.execute("list").await else {
            panic!("list must not exit")
        };
        assert!(out.contains("a1"));

        let Outcome::Message(out) = console.execute("stop a1").await else {
            panic!("stop must not exit")
        };
        assert_eq!(out, "stopped a1");

        let Outcome::Message(out) = console.execute("stop a1").await else {
            panic!("stop must not exit")
        };
        assert!(out.starts_with("error:"));
    }

    #[tokio::test]
    async fn test_types_and_unknown_command() {
        let console = console();

        let Outcome::Message(out) = console.execute("types").await else {
            panic!("types must not exit")
        };
        assert_eq!(out, "generator, random, topical");

        let Outcome::Message(out) = console.execute("frobnicate").await else {
            panic!("unknown command must not exit")
        };
        assert!(out.contains("unrecognized command"));

        assert!(matches!(console.execute("exit").await, Outcome::Exit));
    }
}
