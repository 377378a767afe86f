// src/api/types.rs
//! Wire types for the remote feed service
//!
//! Read-only views over the service's JSON schemas. `FeedItem` mirrors the
//! service's message-with-author shape; nothing in this crate ever mutates
//! fetched items.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A tag attached to a feed item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    /// Tag name, without any `#` prefix
    pub name: String,
}

/// A single item in the remote feed (read-only view)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: i64,

    pub content: String,

    /// Author's user id
    pub user_id: i64,

    /// Author's display name
    pub username: String,

    #[serde(default)]
    pub tags: Vec<Tag>,

    #[serde(default)]
    pub like_count: u32,

    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl FeedItem {
    /// Iterate the item's tag names.
    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| t.name.as_str())
    }
}

/// Outcome of an account-creation call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// The account was created
    Created,

    /// The account already existed; callers treat this as success
    AlreadyRegistered,
}

/// Outcome of a like call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    /// The like was recorded
    Liked,

    /// This user already liked the item; callers treat this as success
    AlreadyLiked,
}

/// Authenticated user identity
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
}

/// Token exchange response
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
}

/// Body for creating a post
#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewPost<'a> {
    pub content: &'a str,
    pub tags: &'a [String],
}

/// Error body shape used by the remote service
#[derive(Debug, Deserialize)]
pub(crate) struct ApiDetail {
    pub detail: String,
}

/// The service emits naive ISO-8601 timestamps in some responses and
/// offset-bearing ones in others; accept both and normalize to UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;

    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_item_naive_timestamp() {
        let json = r#"{
            "id": 1,
            "content": "hello world #rust",
            "user_id": 7,
            "username": "bot_1234",
            "tags": [{"name": "rust"}],
            "like_count": 3,
            "created_at": "2024-05-01T12:00:00"
        }"#;

        let item: FeedItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, 1);
        assert_eq!(item.tag_names().collect::<Vec<_>>(), vec!["rust"]);
        assert_eq!(item.like_count, 3);
    }

    #[test]
    fn test_feed_item_rfc3339_timestamp() {
        let json = r#"{
            "id": 2,
            "content": "offset timestamps too",
            "user_id": 8,
            "username": "bot_5678",
            "created_at": "2024-05-01T12:00:00+02:00"
        }"#;

        let item: FeedItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.created_at.to_rfc3339(), "2024-05-01T10:00:00+00:00");
        assert!(item.tags.is_empty());
        assert_eq!(item.like_count, 0);
    }
}
