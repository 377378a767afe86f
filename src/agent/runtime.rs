// src/agent/runtime.rs
//! Agent lifecycle runtime
//!
//! State machine: Unregistered -> Registering -> Authenticating -> Active
//! -> {Stopped, Errored}. Registration is idempotent (an existing account
//! is success), a failed authentication parks the agent in Errored, and
//! once Active the loop only ever leaves through the external stop
//! signal. Transport failures inside a cycle are logged and swallowed;
//! they never terminate the loop.

use crate::agent::config::AgentConfig;
use crate::agent::timers::ActionTimer;
use crate::api::{ApiClient, FeedItem, RegisterOutcome};
use crate::policy::BehaviorPolicy;
use crate::utils::errors::Result;
use metrics::counter;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fmt;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Fixed polling quantum of the active loop. The stop signal and every
/// due-timer are checked once per quantum.
pub const POLL_QUANTUM: Duration = Duration::from_secs(5);

/// Lifecycle states of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Unregistered,
    Registering,
    Authenticating,
    Active,
    Stopped,
    Errored,
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentState::Unregistered => "unregistered",
            AgentState::Registering => "registering",
            AgentState::Authenticating => "authenticating",
            AgentState::Active => "active",
            AgentState::Stopped => "stopped",
            AgentState::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Credential and identity established during authentication
struct Session {
    token: String,
    user_id: i64,
}

/// Behavioral runtime for a single agent
pub struct AgentRuntime {
    id: String,
    config: AgentConfig,
    policy: Box<dyn BehaviorPolicy>,
    client: ApiClient,
    state: AgentState,
    username: String,
    email: String,
    post_timer: ActionTimer,
    like_timer: ActionTimer,
    reply_timer: ActionTimer,
    quantum: Duration,
    stop: CancellationToken,
    rng: StdRng,
}

impl AgentRuntime {
    pub fn new(
        id: impl Into<String>,
        config: AgentConfig,
        policy: Box<dyn BehaviorPolicy>,
        stop: CancellationToken,
    ) -> Result<Self> {
        let client = ApiClient::new(config.api_url.clone())?;
        let (username, email) = config.effective_credentials();

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            id: id.into(),
            post_timer: ActionTimer::new(Duration::from_secs(config.post_interval)),
            like_timer: ActionTimer::new(Duration::from_secs(config.like_interval)),
            reply_timer: ActionTimer::new(Duration::from_secs(config.reply_interval)),
            config,
            policy,
            client,
            state: AgentState::Unregistered,
            username,
            email,
            quantum: POLL_QUANTUM,
            stop,
            rng,
        })
    }

    /// Override the polling quantum (shortened in tests).
    pub fn with_quantum(mut self, quantum: Duration) -> Self {
        self.quantum = quantum;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Drive the agent to completion: register, authenticate, then run
    /// the active loop until the stop signal fires.
    pub async fn run(&mut self) -> AgentState {
        info!(
            agent = %self.id,
            username = %self.username,
            policy = self.policy.name(),
            "starting agent"
        );

        let session = match self.establish_session().await {
            Ok(session) => session,
            Err(e) => {
                error!(agent = %self.id, error = %e, "agent failed to become active");
                self.state = AgentState::Errored;
                return self.state;
            }
        };

        self.state = AgentState::Active;
        info!(agent = %self.id, user_id = session.user_id, "agent active");

        loop {
            if self.stop.is_cancelled() {
                break;
            }

            let now = Instant::now();
            if self.post_timer.is_due(now) {
                self.post_cycle(&session).await;
            }
            if self.like_timer.is_due(now) {
                self.like_cycle(&session).await;
            }
            if self.reply_timer.is_due(now) {
                self.reply_cycle(&session).await;
            }

            tokio::select! {
                _ = self.stop.cancelled() => break,
                _ = tokio::time::sleep(self.quantum) => {}
            }
        }

        info!(agent = %self.id, "agent stopped");
        self.state = AgentState::Stopped;
        self.state
    }

    /// Register (idempotently) and authenticate, producing the session
    /// used by every subsequent feed call.
    async fn establish_session(&mut self) -> Result<Session> {
        self.state = AgentState::Registering;
        match self
            .client
            .create_account(&self.username, &self.email, &self.config.password)
            .await?
        {
            RegisterOutcome::Created => info!(agent = %self.id, "registered new account"),
            RegisterOutcome::AlreadyRegistered => {
                info!(agent = %self.id, "account already registered")
            }
        }

        self.state = AgentState::Authenticating;
        let token = self
            .client
            .obtain_token(&self.username, &self.config.password)
            .await?;
        let profile = self.client.current_user(&token).await?;

        Ok(Session {
            token,
            user_id: profile.id,
        })
    }

    /// Generate and submit one post. The timer resets only on success;
    /// a transport failure leaves it due for the next quantum.
    async fn post_cycle(&mut self, session: &Session) {
        let (content, tags) = self.policy.generate_post().await;

        match self
            .client
            .create_post(&session.token, &content, &tags)
            .await
        {
            Ok(item) => {
                info!(agent = %self.id, item = item.id, "posted message");
                counter!("agent_posts_total").increment(1);
                self.post_timer.mark_fired(Instant::now());
            }
            Err(e) => {
                warn!(agent = %self.id, error = %e, "post failed, retrying next quantum");
            }
        }
    }

    /// Fetch a shuffled window of candidates, excluding self-authored
    /// items. `None` means nothing to act on this cycle.
    async fn fetch_candidates(&mut self, session: &Session) -> Option<Vec<FeedItem>> {
        let items = match self
            .client
            .list_feed(&session.token, self.config.max_messages_to_fetch, None)
            .await
        {
            Ok(items) => items,
            Err(e) => {
                warn!(agent = %self.id, error = %e, "feed fetch failed, skipping cycle");
                return None;
            }
        };

        let mut candidates: Vec<FeedItem> = items
            .into_iter()
            .filter(|item| item.user_id != session.user_id)
            .collect();

        if candidates.is_empty() {
            debug!(agent = %self.id, "no eligible candidates in feed window");
            return None;
        }

        candidates.shuffle(&mut self.rng);
        Some(candidates)
    }

    /// Scan candidates and like at most one item, stopping at the first
    /// success. The "already liked" conflict counts as success.
    async fn like_cycle(&mut self, session: &Session) {
        let Some(candidates) = self.fetch_candidates(session).await else {
            return;
        };

        for item in &candidates {
            if !self.policy.should_like(item) {
                continue;
            }

            match self.client.like_post(&session.token, item.id).await {
                Ok(outcome) => {
                    info!(agent = %self.id, item = item.id, ?outcome, "liked message");
                    counter!("agent_likes_total").increment(1);
                    self.like_timer.mark_fired(Instant::now());
                    return;
                }
                Err(e) => {
                    warn!(agent = %self.id, item = item.id, error = %e, "like failed");
                }
            }
        }
    }

    /// Scan a freshly shuffled window and reply to at most one item,
    /// referencing the original author.
    async fn reply_cycle(&mut self, session: &Session) {
        let Some(candidates) = self.fetch_candidates(session).await else {
            return;
        };

        for item in &candidates {
            if !self.policy.should_reply(item) {
                continue;
            }

            let (content, tags) = self.policy.generate_reply(item).await;
            let content = format!("@{} {}", item.username, content);

            match self
                .client
                .create_post(&session.token, &content, &tags)
                .await
            {
                Ok(posted) => {
                    info!(
                        agent = %self.id,
                        replied_to = item.id,
                        item = posted.id,
                        "replied to message"
                    );
                    counter!("agent_replies_total").increment(1);
                    self.reply_timer.mark_fired(Instant::now());
                    return;
                }
                Err(e) => {
                    warn!(agent = %self.id, item = item.id, error = %e, "reply failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyRegistry;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_QUANTUM: Duration = Duration::from_millis(20);

    fn agent_config(api_url: String, overrides: serde_json::Value) -> AgentConfig {
        let mut config: AgentConfig = serde_json::from_value(overrides).unwrap();
        config.api_url = api_url;
        config.username = Some("bot_test".to_string());
        config.seed = Some(99);
        config
    }

    fn runtime(config: AgentConfig, stop: CancellationToken) -> AgentRuntime {
        let registry = PolicyRegistry::builtin();
        let policy = registry.create("random", &config).unwrap();
        AgentRuntime::new("agent-1", config, policy, stop)
            .unwrap()
            .with_quantum(TEST_QUANTUM)
    }

    async fn mount_happy_auth(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/users/"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 1, "username": "bot_test", "email": "bot_test@example.com"
            })))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok", "token_type": "bearer"
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1, "username": "bot_test"
            })))
            .mount(server)
            .await;
    }

    fn posted_item(id: i64) -> serde_json::Value {
        json!({
            "id": id, "content": "ok", "user_id": 1, "username": "bot_test",
            "tags": [], "like_count": 0, "created_at": "2024-05-01T12:00:00"
        })
    }

    #[tokio::test]
    async fn test_auth_failure_parks_agent_in_errored() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"detail": "bad credentials"})),
            )
            .mount(&server)
            .await;

        let mut rt = runtime(
            agent_config(server.uri(), json!({})),
            CancellationToken::new(),
        );
        let state = rt.run().await;
        assert_eq!(state, AgentState::Errored);
    }

    #[tokio::test]
    async fn test_register_conflict_is_tolerated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"detail": "Email already registered"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok", "token_type": "bearer"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/me"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": 1, "username": "bot_test"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/messages/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/messages/"))
            .respond_with(ResponseTemplate::new(201).set_body_json(posted_item(10)))
            .mount(&server)
            .await;

        let stop = CancellationToken::new();
        let mut rt = runtime(agent_config(server.uri(), json!({})), stop.clone());

        let handle = tokio::spawn(async move { rt.run().await });
        tokio::time::sleep(Duration::from_millis(80)).await;
        stop.cancel();

        let state = handle.await.unwrap();
        assert_eq!(state, AgentState::Stopped);
    }

    #[tokio::test]
    async fn test_stop_observed_within_one_quantum() {
        let server = MockServer::start().await;
        mount_happy_auth(&server).await;
        Mock::given(method("GET"))
            .and(path("/messages/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/messages/"))
            .respond_with(ResponseTemplate::new(201).set_body_json(posted_item(10)))
            .mount(&server)
            .await;

        let stop = CancellationToken::new();
        let mut rt = runtime(agent_config(server.uri(), json!({})), stop.clone());
        let handle = tokio::spawn(async move { rt.run().await });

        tokio::time::sleep(Duration::from_millis(60)).await;
        stop.cancel();

        let state = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop must observe stop within a quantum")
            .unwrap();
        assert_eq!(state, AgentState::Stopped);
    }

    #[tokio::test]
    async fn test_single_post_within_interval() {
        let server = MockServer::start().await;
        mount_happy_auth(&server).await;
        Mock::given(method("GET"))
            .and(path("/messages/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        // Exactly one post despite many elapsed quanta
        Mock::given(method("POST"))
            .and(path("/messages/"))
            .respond_with(ResponseTemplate::new(201).set_body_json(posted_item(10)))
            .expect(1)
            .mount(&server)
            .await;

        let stop = CancellationToken::new();
        let config = agent_config(server.uri(), json!({"post_interval": 3600}));
        let mut rt = runtime(config, stop.clone());
        let handle = tokio::spawn(async move { rt.run().await });

        tokio::time::sleep(Duration::from_millis(200)).await;
        stop.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_reply_references_original_author() {
        let server = MockServer::start().await;
        mount_happy_auth(&server).await;
        Mock::given(method("GET"))
            .and(path("/messages/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": 7, "content": "what a day", "user_id": 3, "username": "user_other",
                "tags": [], "like_count": 0, "created_at": "2024-05-01T12:00:00"
            }])))
            .mount(&server)
            .await;
        // The reply must carry the @author prefix
        Mock::given(method("POST"))
            .and(path("/messages/"))
            .and(body_string_contains("@user_other"))
            .respond_with(ResponseTemplate::new(201).set_body_json(posted_item(11)))
            .expect(1..)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/messages/"))
            .respond_with(ResponseTemplate::new(201).set_body_json(posted_item(12)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/messages/7/like"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "liked"})))
            .mount(&server)
            .await;

        let stop = CancellationToken::new();
        let config = agent_config(
            server.uri(),
            json!({"reply_probability": 1.0, "like_probability": 0.0}),
        );
        let mut rt = runtime(config, stop.clone());
        let handle = tokio::spawn(async move { rt.run().await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        stop.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_agent_active() {
        let server = MockServer::start().await;
        mount_happy_auth(&server).await;
        // Every feed action fails after authentication succeeded
        Mock::given(method("GET"))
            .and(path("/messages/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/messages/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let stop = CancellationToken::new();
        let mut rt = runtime(agent_config(server.uri(), json!({})), stop.clone());
        let handle = tokio::spawn(async move { rt.run().await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        stop.cancel();

        // The loop survived the failures and exited through Stopped
        let state = handle.await.unwrap();
        assert_eq!(state, AgentState::Stopped);
    }
}
