// src/agent/config.rs
//! Agent configuration
//!
//! The generic keys every agent understands, plus a flattened map of
//! variant-specific extensions (generator model names, prompt templates,
//! keyword sets, ...). The config is frozen once the agent starts; only
//! derived runtime state (token, own user id, last-fire times) changes
//! afterwards, and none of that is serialized back out.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for a single agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    /// Base URL of the remote feed service
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Account name; a random `bot_NNNN` name is derived when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Account email; derived from the username when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default = "default_password")]
    pub password: String,

    /// Seconds between posts
    #[serde(default = "default_post_interval")]
    pub post_interval: u64,

    /// Seconds between like cycles
    #[serde(default = "default_like_interval")]
    pub like_interval: u64,

    /// Seconds between reply cycles
    #[serde(default = "default_reply_interval")]
    pub reply_interval: u64,

    /// Base probability of liking a candidate item
    #[serde(default = "default_like_probability")]
    pub like_probability: f64,

    /// Base probability of replying to a candidate item
    #[serde(default = "default_reply_probability")]
    pub reply_probability: f64,

    /// Feed window size for like/reply cycles
    #[serde(default = "default_max_messages_to_fetch")]
    pub max_messages_to_fetch: usize,

    /// Optional RNG seed; fixes shuffle order and decision draws
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Variant-specific options, passed through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_password() -> String {
    "password123".to_string()
}

fn default_post_interval() -> u64 {
    60
}

fn default_like_interval() -> u64 {
    30
}

fn default_reply_interval() -> u64 {
    45
}

fn default_like_probability() -> f64 {
    0.5
}

fn default_reply_probability() -> f64 {
    0.3
}

fn default_max_messages_to_fetch() -> usize {
    20
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            username: None,
            email: None,
            password: default_password(),
            post_interval: default_post_interval(),
            like_interval: default_like_interval(),
            reply_interval: default_reply_interval(),
            like_probability: default_like_probability(),
            reply_probability: default_reply_probability(),
            max_messages_to_fetch: default_max_messages_to_fetch(),
            seed: None,
            extra: BTreeMap::new(),
        }
    }
}

impl AgentConfig {
    /// Resolve the account credentials, deriving a random username and a
    /// matching email where the config left them out.
    pub fn effective_credentials(&self) -> (String, String) {
        let username = self
            .username
            .clone()
            .unwrap_or_else(|| format!("bot_{}", rand::thread_rng().gen_range(1000..10000)));
        let email = self
            .email
            .clone()
            .unwrap_or_else(|| format!("{username}@example.com"));
        (username, email)
    }

    /// Variant-specific string option.
    pub fn extra_str(&self, key: &str) -> Option<String> {
        self.extra
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    /// Variant-specific integer option.
    pub fn extra_u64(&self, key: &str) -> Option<u64> {
        self.extra.get(key).and_then(|v| v.as_u64())
    }

    /// Variant-specific float option.
    pub fn extra_f64(&self, key: &str) -> Option<f64> {
        self.extra.get(key).and_then(|v| v.as_f64())
    }

    /// Variant-specific list-of-strings option.
    pub fn extra_string_list(&self, key: &str) -> Option<Vec<String>> {
        let values = self.extra.get(key)?.as_array()?;
        Some(
            values
                .iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect(),
        )
    }
}
