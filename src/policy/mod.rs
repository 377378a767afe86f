// src/policy/mod.rs
//! Behavior policies
//!
//! The pluggable content/decision logic behind every agent. A policy is a
//! closed capability set:
//!
//! - **generate_post**: content and tags for a fresh post
//! - **generate_reply**: content and tags responding to a feed item
//! - **should_like** / **should_reply**: per-candidate decisions
//!
//! Variants:
//!
//! - **random**: fixed vocabularies, independent Bernoulli draws
//! - **topical**: keyword-boosted decisions, cached external headlines
//! - **generator**: external text generation with bounded retry
//!
//! Variant selection goes through a [`PolicyRegistry`] populated once at
//! startup; new variants register without touching the dispatcher.

pub mod generator;
pub mod random;
pub mod registry;
pub mod topical;

use crate::api::FeedItem;
use async_trait::async_trait;

pub use generator::GeneratorPolicy;
pub use random::RandomPolicy;
pub use registry::PolicyRegistry;
pub use topical::TopicalPolicy;

/// Content and decision capabilities of an agent
#[async_trait]
pub trait BehaviorPolicy: Send {
    /// Registered variant name.
    fn name(&self) -> &'static str;

    /// Produce content and tags for a new post.
    async fn generate_post(&mut self) -> (String, Vec<String>);

    /// Produce content and tags for a reply to `item`. The caller adds
    /// the `@author` reference; policies return bare content.
    async fn generate_reply(&mut self, item: &FeedItem) -> (String, Vec<String>);

    /// Decide whether to like `item`.
    fn should_like(&mut self, item: &FeedItem) -> bool;

    /// Decide whether to reply to `item`.
    fn should_reply(&mut self, item: &FeedItem) -> bool;
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::api::{FeedItem, Tag};
    use chrono::Utc;

    /// Build a feed item for policy tests.
    pub fn feed_item(id: i64, user_id: i64, content: &str, tags: &[&str]) -> FeedItem {
        FeedItem {
            id,
            content: content.to_string(),
            user_id,
            username: format!("user_{user_id}"),
            tags: tags
                .iter()
                .map(|name| Tag {
                    name: name.to_string(),
                })
                .collect(),
            like_count: 0,
            created_at: Utc::now(),
        }
    }
}
