// src/policy/topical.rs
//! Content-aware behavior policy
//!
//! Decisions are boosted by a fixed 1.5x multiplier when a candidate's
//! tags or text match the configured keyword set. Post content is drawn
//! from a cached, time-windowed external headline source and falls back
//! to a static message when the source is empty.
//!
//! Variant-specific config keys: `keywords`, `source_url`,
//! `refresh_interval` (seconds), `fallback_message`.

use crate::agent::AgentConfig;
use crate::api::FeedItem;
use crate::policy::BehaviorPolicy;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Probability multiplier applied to keyword-relevant candidates
const RELEVANCE_BOOST: f64 = 1.5;

const DEFAULT_KEYWORDS: [&str; 4] = ["news", "technology", "world", "politics"];
const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(300);
const DEFAULT_FALLBACK: &str = "No interesting news today. #news";
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Short filler words excluded from title-derived tags
const STOP_WORDS: [&str; 4] = ["this", "that", "with", "from"];

/// One entry from the external headline source
#[derive(Debug, Clone, Deserialize)]
pub struct SourceItem {
    pub title: String,
    pub url: String,
    #[serde(default = "default_source_name")]
    pub source: String,
}

fn default_source_name() -> String {
    "news".to_string()
}

/// Policy that favors candidates matching a topical keyword set
pub struct TopicalPolicy {
    like_probability: f64,
    reply_probability: f64,
    keywords: Vec<String>,
    source_url: Option<String>,
    refresh_interval: Duration,
    fallback_message: String,
    cached: Vec<SourceItem>,
    last_fetch: Option<Instant>,
    http: reqwest::Client,
    rng: StdRng,
}

impl TopicalPolicy {
    pub fn new(config: &AgentConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let keywords = config
            .extra_string_list("keywords")
            .unwrap_or_else(|| DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect())
            .into_iter()
            .map(|k| k.to_lowercase())
            .collect();

        Self {
            like_probability: config.like_probability.clamp(0.0, 1.0),
            reply_probability: config.reply_probability.clamp(0.0, 1.0),
            keywords,
            source_url: config.extra_str("source_url"),
            refresh_interval: config
                .extra_u64("refresh_interval")
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REFRESH_INTERVAL),
            fallback_message: config
                .extra_str("fallback_message")
                .unwrap_or_else(|| DEFAULT_FALLBACK.to_string()),
            cached: Vec::new(),
            last_fetch: None,
            http: reqwest::Client::new(),
            rng,
        }
    }

    /// Whether the candidate's tags or text match the keyword set.
    fn is_relevant(&self, item: &FeedItem) -> bool {
        let content = item.content.to_lowercase();
        item.tag_names()
            .any(|tag| self.keywords.iter().any(|k| tag.eq_ignore_ascii_case(k)))
            || self.keywords.iter().any(|k| content.contains(k.as_str()))
    }

    fn boosted(&self, base: f64, relevant: bool) -> f64 {
        if relevant {
            (base * RELEVANCE_BOOST).min(1.0)
        } else {
            base
        }
    }

    /// Refresh the headline cache when it is empty or the refresh window
    /// has elapsed. Fetch failures keep whatever was cached before.
    async fn refresh_cache(&mut self) {
        let Some(url) = self.source_url.clone() else {
            return;
        };

        let stale = match self.last_fetch {
            None => true,
            Some(at) => at.elapsed() >= self.refresh_interval,
        };
        if !self.cached.is_empty() && !stale {
            return;
        }

        debug!(url = %url, "refreshing headline cache");
        let fetched = self
            .http
            .get(&url)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match fetched {
            Ok(response) => match response.json::<Vec<SourceItem>>().await {
                Ok(items) => {
                    debug!(count = items.len(), "headline cache refreshed");
                    self.cached = items;
                    self.last_fetch = Some(Instant::now());
                }
                Err(e) => warn!(error = %e, "headline source returned malformed payload"),
            },
            Err(e) => warn!(error = %e, "headline fetch failed, keeping stale cache"),
        }
    }

    /// Up to three tag candidates pulled from a headline title.
    fn title_tags(&mut self, title: &str) -> Vec<String> {
        let words: Vec<String> = title
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() >= 4 && !STOP_WORDS.contains(w))
            .map(|w| w.to_string())
            .collect();

        words
            .choose_multiple(&mut self.rng, 3)
            .cloned()
            .collect()
    }

    /// A cached headline whose title mentions one of the item's tags.
    fn related_headline(&self, item: &FeedItem) -> Option<&SourceItem> {
        let tags: Vec<String> = item.tag_names().map(|t| t.to_lowercase()).collect();
        self.cached.iter().find(|headline| {
            let title = headline.title.to_lowercase();
            tags.iter().any(|tag| title.contains(tag.as_str()))
        })
    }
}

#[async_trait]
impl BehaviorPolicy for TopicalPolicy {
    fn name(&self) -> &'static str {
        "topical"
    }

    async fn generate_post(&mut self) -> (String, Vec<String>) {
        self.refresh_cache().await;

        if self.cached.is_empty() {
            return (self.fallback_message.clone(), vec!["news".to_string()]);
        }

        // Non-empty cache, so choose always yields an item
        let Some(headline) = self.cached.choose(&mut self.rng).cloned() else {
            return (self.fallback_message.clone(), vec!["news".to_string()]);
        };

        let content = format!(
            "{} {} #news #{}",
            headline.title, headline.url, headline.source
        );
        let mut tags = vec!["news".to_string(), headline.source.clone()];
        tags.extend(self.title_tags(&headline.title));
        (content, tags)
    }

    async fn generate_reply(&mut self, item: &FeedItem) -> (String, Vec<String>) {
        self.refresh_cache().await;

        if self.cached.is_empty() {
            return (
                "Interesting point! Thanks for sharing.".to_string(),
                vec!["news".to_string()],
            );
        }

        if let Some(related) = self.related_headline(item).cloned() {
            let content = format!("That reminds me of this: {} {}", related.title, related.url);
            return (content, vec!["news".to_string(), related.source]);
        }

        let Some(headline) = self.cached.choose(&mut self.rng).cloned() else {
            return (
                "Interesting point! Thanks for sharing.".to_string(),
                vec!["news".to_string()],
            );
        };
        let content = format!(
            "Have you seen this related news? {} {}",
            headline.title, headline.url
        );
        (content, vec!["news".to_string(), headline.source])
    }

    fn should_like(&mut self, item: &FeedItem) -> bool {
        let p = self.boosted(self.like_probability, self.is_relevant(item));
        self.rng.gen_bool(p)
    }

    fn should_reply(&mut self, item: &FeedItem) -> bool {
        let p = self.boosted(self.reply_probability, self.is_relevant(item));
        self.rng.gen_bool(p)
    }
}
