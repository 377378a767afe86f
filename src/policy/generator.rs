// src/policy/generator.rs
//! External-generator behavior policy
//!
//! Content generation delegates to an Ollama-style text-generation
//! endpoint, wrapped in a bounded fixed-delay retry that only covers
//! transient transport failures. When retries are exhausted the policy
//! returns canned fallback content instead of propagating the failure,
//! so a dead generator never stalls an agent's post cycle.
//!
//! Variant-specific config keys: `generator_url`, `model_name`,
//! `system_prompt`, `post_topics`, `post_prompt_template`,
//! `reply_prompt_template`, `max_retries`, `retry_delay` (seconds).

use crate::agent::AgentConfig;
use crate::api::FeedItem;
use crate::policy::BehaviorPolicy;
use crate::utils::errors::{FleetError, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_GENERATOR_URL: &str = "http://localhost:11434/api/generate";
const DEFAULT_MODEL: &str = "llama3.2:latest";
const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a friendly and helpful social media user who posts about technology and science.";
const DEFAULT_POST_PROMPT: &str = "Write a short social media post (max 280 characters) about \
     {topic}. Include 2-3 relevant hashtags at the end.";
const DEFAULT_REPLY_PROMPT: &str = "Write a short reply (max 280 characters) to this social \
     media post: \"{content}\". Be engaging and relevant. Include 1-2 hashtags at the end.";
const DEFAULT_TOPICS: [&str; 5] = ["technology", "science", "programming", "AI", "data science"];
const DEFAULT_MAX_RETRIES: u64 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
const GENERATION_TIMEOUT: Duration = Duration::from_secs(30);

static HASHTAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\w+)").expect("valid regex"));
static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\w{4,})\b").expect("valid regex"));

const COMMON_WORDS: [&str; 9] = [
    "this", "that", "with", "from", "have", "about", "would", "could", "should",
];

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Policy backed by an external text-generation service
pub struct GeneratorPolicy {
    like_probability: f64,
    reply_probability: f64,
    generator_url: String,
    model_name: String,
    system_prompt: String,
    post_topics: Vec<String>,
    post_prompt_template: String,
    reply_prompt_template: String,
    max_retries: u64,
    retry_delay: Duration,
    http: reqwest::Client,
    rng: StdRng,
}

impl GeneratorPolicy {
    pub fn new(config: &AgentConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            like_probability: config.like_probability.clamp(0.0, 1.0),
            reply_probability: config.reply_probability.clamp(0.0, 1.0),
            generator_url: config
                .extra_str("generator_url")
                .unwrap_or_else(|| DEFAULT_GENERATOR_URL.to_string()),
            model_name: config
                .extra_str("model_name")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            system_prompt: config
                .extra_str("system_prompt")
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            post_topics: config
                .extra_string_list("post_topics")
                .unwrap_or_else(|| DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect()),
            post_prompt_template: config
                .extra_str("post_prompt_template")
                .unwrap_or_else(|| DEFAULT_POST_PROMPT.to_string()),
            reply_prompt_template: config
                .extra_str("reply_prompt_template")
                .unwrap_or_else(|| DEFAULT_REPLY_PROMPT.to_string()),
            max_retries: config.extra_u64("max_retries").unwrap_or(DEFAULT_MAX_RETRIES),
            retry_delay: config
                .extra_u64("retry_delay")
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_RETRY_DELAY),
            http: reqwest::Client::new(),
            rng,
        }
    }

    /// One generation attempt against the external service.
    async fn attempt(&self, prompt: &str) -> Result<String> {
        let response = self
            .http
            .post(&self.generator_url)
            .timeout(GENERATION_TIMEOUT)
            .json(&GenerateRequest {
                model: &self.model_name,
                system: &self.system_prompt,
                prompt,
                stream: false,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(FleetError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        let body: GenerateResponse = response.json().await?;
        if let Some(error) = body.error {
            return Err(FleetError::Generation(error));
        }
        body.response
            .map(|text| text.trim().to_string())
            .ok_or_else(|| FleetError::Generation("missing response field".to_string()))
    }

    /// Bounded fixed-delay retry around [`attempt`], restricted to
    /// transient failures. Non-transient errors abort immediately.
    async fn complete(&self, prompt: &str) -> Result<String> {
        let mut last_err = FleetError::Generation("no attempts made".to_string());

        for attempt in 1..=self.max_retries.max(1) {
            match self.attempt(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() => {
                    warn!(attempt, error = %e, "generation attempt failed");
                    last_err = e;
                    if attempt < self.max_retries.max(1) {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err)
    }

    /// Hashtag-like tokens from generated text; when none are present,
    /// the longest non-common words stand in as tags.
    fn extract_tags(text: &str) -> Vec<String> {
        let hashtags: Vec<String> = HASHTAG_RE
            .captures_iter(text)
            .map(|c| c[1].to_lowercase())
            .collect();
        if !hashtags.is_empty() {
            return hashtags;
        }

        let mut words: Vec<String> = WORD_RE
            .captures_iter(&text.to_lowercase())
            .map(|c| c[1].to_string())
            .filter(|w| !COMMON_WORDS.contains(&w.as_str()))
            .collect();
        words.sort_by_key(|w| std::cmp::Reverse(w.len()));
        words.dedup();
        words.truncate(3);
        words
    }

    fn random_topic(&mut self) -> String {
        self.post_topics
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_else(|| "technology".to_string())
    }
}

#[async_trait]
impl BehaviorPolicy for GeneratorPolicy {
    fn name(&self) -> &'static str {
        "generator"
    }

    async fn generate_post(&mut self) -> (String, Vec<String>) {
        let topic = self.random_topic();
        let prompt = self.post_prompt_template.replace("{topic}", &topic);

        match self.complete(&prompt).await {
            Ok(content) => {
                let tags = Self::extract_tags(&content);
                (content, tags)
            }
            Err(e) => {
                warn!(error = %e, "generation exhausted, using fallback post");
                (
                    format!("Interesting thoughts about {topic}..."),
                    vec!["fallback".to_string()],
                )
            }
        }
    }

    async fn generate_reply(&mut self, item: &FeedItem) -> (String, Vec<String>) {
        let prompt = self.reply_prompt_template.replace("{content}", &item.content);

        match self.complete(&prompt).await {
            Ok(content) => {
                debug!(item = item.id, "generated reply");
                let tags = Self::extract_tags(&content);
                (content, tags)
            }
            Err(e) => {
                warn!(error = %e, "generation exhausted, using fallback reply");
                (
                    "Interesting point! Thanks for sharing.".to_string(),
                    vec!["fallback".to_string()],
                )
            }
        }
    }

    fn should_like(&mut self, _item: &FeedItem) -> bool {
        // Probability draw rather than a generator round-trip per candidate
        self.rng.gen_bool(self.like_probability)
    }

    fn should_reply(&mut self, _item: &FeedItem) -> bool {
        self.rng.gen_bool(self.reply_probability)
    }
}
