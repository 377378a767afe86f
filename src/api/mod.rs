// src/api/mod.rs
//! Remote feed service client
//!
//! Thin contract against the external REST service: account creation,
//! token exchange, feed listing, posting, and liking. The service itself
//! (endpoints, schema, password hashing, JWT issuance) is an external
//! collaborator and is never reimplemented here.

pub mod client;
pub mod types;

pub use client::ApiClient;
pub use types::{FeedItem, LikeOutcome, RegisterOutcome, Tag, UserProfile};
