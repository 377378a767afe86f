// src/policy/random.rs
//! Deterministic-random behavior policy
//!
//! Draws content from fixed topic/adjective/verb vocabularies and makes
//! like/reply decisions as independent Bernoulli draws at the configured
//! probabilities. With a fixed `seed` the full decision sequence is
//! reproducible.

use crate::agent::AgentConfig;
use crate::api::FeedItem;
use crate::policy::BehaviorPolicy;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const TOPICS: [&str; 8] = [
    "technology",
    "sports",
    "food",
    "travel",
    "movies",
    "music",
    "books",
    "gaming",
];

const ADJECTIVES: [&str; 8] = [
    "amazing",
    "awesome",
    "great",
    "interesting",
    "cool",
    "fantastic",
    "wonderful",
    "excellent",
];

const VERBS: [&str; 8] = [
    "love",
    "enjoy",
    "like",
    "appreciate",
    "admire",
    "recommend",
    "suggest",
    "prefer",
];

/// Policy that posts and reacts at random
pub struct RandomPolicy {
    like_probability: f64,
    reply_probability: f64,
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(config: &AgentConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            like_probability: config.like_probability.clamp(0.0, 1.0),
            reply_probability: config.reply_probability.clamp(0.0, 1.0),
            rng,
        }
    }

    fn pick(&mut self) -> (&'static str, &'static str, &'static str) {
        // The vocabularies are non-empty, so choose never returns None
        let topic = TOPICS.choose(&mut self.rng).copied().unwrap_or(TOPICS[0]);
        let adjective = ADJECTIVES
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(ADJECTIVES[0]);
        let verb = VERBS.choose(&mut self.rng).copied().unwrap_or(VERBS[0]);
        (topic, adjective, verb)
    }
}

#[async_trait]
impl BehaviorPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "random"
    }

    async fn generate_post(&mut self) -> (String, Vec<String>) {
        let (topic, adjective, verb) = self.pick();
        let content = format!("I {verb} this {adjective} {topic}! #{topic} #{adjective}");
        (content, vec![topic.to_string(), adjective.to_string()])
    }

    async fn generate_reply(&mut self, _item: &FeedItem) -> (String, Vec<String>) {
        let (topic, adjective, verb) = self.pick();
        let content = format!("I also {verb} {topic}! It's really {adjective}.");
        (content, vec![topic.to_string(), adjective.to_string()])
    }

    fn should_like(&mut self, _item: &FeedItem) -> bool {
        self.rng.gen_bool(self.like_probability)
    }

    fn should_reply(&mut self, _item: &FeedItem) -> bool {
        self.rng.gen_bool(self.reply_probability)
    }
}
