// src/api/client.rs
//! HTTP client for the remote feed service
//!
//! Every authenticated call carries a bearer token. Any 2xx response is
//! success; the documented "already registered" and "already liked"
//! conflicts are also success from the caller's point of view.

use crate::api::types::{
    ApiDetail, FeedItem, LikeOutcome, NewPost, RegisterOutcome, TokenResponse, UserProfile,
};
use crate::utils::errors::{FleetError, Result};
use reqwest::{Response, StatusCode};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the remote feed service
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a new account. An "already registered" conflict is reported
    /// as `RegisterOutcome::AlreadyRegistered`, not as an error.
    pub async fn create_account(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<RegisterOutcome> {
        let url = format!("{}/users/", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "username": username,
                "email": email,
                "password": password,
            }))
            .send()
            .await?;

        if response.status().is_success() {
            debug!(username, "account created");
            return Ok(RegisterOutcome::Created);
        }

        let (status, detail) = error_detail(response).await;
        if status == StatusCode::BAD_REQUEST.as_u16() && detail.contains("already registered") {
            debug!(username, "account already registered");
            return Ok(RegisterOutcome::AlreadyRegistered);
        }

        Err(FleetError::Api { status, detail })
    }

    /// Exchange credentials for a bearer token.
    pub async fn obtain_token(&self, username: &str, password: &str) -> Result<String> {
        let url = format!("{}/token", self.base_url);
        let response = self
            .http
            .post(&url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, detail) = error_detail(response).await;
            return Err(FleetError::Auth(format!("{status}: {detail}")));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// Fetch the identity behind a token.
    pub async fn current_user(&self, token: &str) -> Result<UserProfile> {
        let url = format!("{}/users/me", self.base_url);
        let response = self.http.get(&url).bearer_auth(token).send().await?;

        if !response.status().is_success() {
            let (status, detail) = error_detail(response).await;
            return Err(FleetError::Auth(format!("{status}: {detail}")));
        }

        Ok(response.json().await?)
    }

    /// List a bounded window of recent feed items, optionally filtered
    /// by tag.
    pub async fn list_feed(
        &self,
        token: &str,
        limit: usize,
        tag: Option<&str>,
    ) -> Result<Vec<FeedItem>> {
        let url = format!("{}/messages/", self.base_url);
        let mut request = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[("limit", limit.to_string())]);

        if let Some(tag) = tag {
            request = request.query(&[("tag", tag)]);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let (status, detail) = error_detail(response).await;
            return Err(FleetError::Api { status, detail });
        }

        Ok(response.json().await?)
    }

    /// Submit a new post.
    pub async fn create_post(
        &self,
        token: &str,
        content: &str,
        tags: &[String],
    ) -> Result<FeedItem> {
        let url = format!("{}/messages/", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&NewPost { content, tags })
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, detail) = error_detail(response).await;
            return Err(FleetError::Api { status, detail });
        }

        Ok(response.json().await?)
    }

    /// Like a feed item. The "already liked" conflict is success; any
    /// other 2xx status counts as a recorded like.
    pub async fn like_post(&self, token: &str, item_id: i64) -> Result<LikeOutcome> {
        let url = format!("{}/messages/{}/like", self.base_url, item_id);
        let response = self.http.post(&url).bearer_auth(token).send().await?;

        if response.status().is_success() {
            return Ok(LikeOutcome::Liked);
        }

        let (status, detail) = error_detail(response).await;
        if status == StatusCode::BAD_REQUEST.as_u16() && detail.contains("already liked") {
            return Ok(LikeOutcome::AlreadyLiked);
        }

        Err(FleetError::Api { status, detail })
    }
}

/// Pull the status and `detail` field out of an error response, falling
/// back to the raw body when it is not the usual JSON shape.
async fn error_detail(response: Response) -> (u16, String) {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    let detail = serde_json::from_str::<ApiDetail>(&body)
        .map(|d| d.detail)
        .unwrap_or(body);

    (status, detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_create_account_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 1, "username": "bot_1", "email": "bot_1@example.com"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let outcome = client
            .create_account("bot_1", "bot_1@example.com", "password123")
            .await
            .unwrap();
        assert_eq!(outcome, RegisterOutcome::Created);
    }

    #[tokio::test]
    async fn test_create_account_conflict_is_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"detail": "Email already registered"})),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let outcome = client
            .create_account("bot_1", "bot_1@example.com", "password123")
            .await
            .unwrap();
        assert_eq!(outcome, RegisterOutcome::AlreadyRegistered);
    }

    #[tokio::test]
    async fn test_obtain_token_failure_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"detail": "Incorrect username or password"})),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let err = client.obtain_token("bot_1", "wrong").await.unwrap_err();
        assert!(matches!(err, FleetError::Auth(_)));
    }

    #[tokio::test]
    async fn test_obtain_token_and_current_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("username=bot_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok-abc", "token_type": "bearer"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 42, "username": "bot_1", "email": "bot_1@example.com",
                "created_at": "2024-05-01T12:00:00"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let token = client.obtain_token("bot_1", "password123").await.unwrap();
        assert_eq!(token, "tok-abc");

        let me = client.current_user(&token).await.unwrap();
        assert_eq!(me.id, 42);
    }

    #[tokio::test]
    async fn test_list_feed_with_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/messages/"))
            .and(query_param("limit", "20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": 9, "content": "hi", "user_id": 3, "username": "other",
                "tags": [], "like_count": 0, "created_at": "2024-05-01T12:00:00"
            }])))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let items = client.list_feed("tok", 20, None).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].username, "other");
    }

    #[tokio::test]
    async fn test_like_conflict_is_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages/9/like"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"detail": "You have already liked this message"})),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let outcome = client.like_post("tok", 9).await.unwrap();
        assert_eq!(outcome, LikeOutcome::AlreadyLiked);
    }

    #[tokio::test]
    async fn test_like_missing_item_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages/404/like"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"detail": "Message not found"})),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let err = client.like_post("tok", 404).await.unwrap_err();
        assert!(matches!(err, FleetError::Api { status: 404, .. }));
    }
}
