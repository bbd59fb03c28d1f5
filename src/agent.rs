//! The agent: identity rotation, rate limiting, and request logging around
//! a bound HTTP client.

use std::path::Path;
use std::sync::Arc;

use reqwest::{header, Client};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::history::{HistoryStore, RequestRecord};
use crate::identity::{random_identity, IDENTITY_POOL};
use crate::rate_limit::RateLimiter;

/// Source identifier used when none is supplied.
pub const DEFAULT_SOURCE: &str = "127.0.0.1";

/// Status logged for requests that failed below the HTTP layer.
const TRANSPORT_ERROR_STATUS: &str = "0";

#[derive(Debug)]
struct AgentState {
    rotation_enabled: bool,
    current_identity: String,
    limiter: RateLimiter,
    history: HistoryStore,
}

/// HTTP agent that rotates client identities, enforces a per-(origin,
/// source) request ceiling, and records every request it makes.
///
/// Mutable state lives behind a single async mutex; [`Agent::fetch`] holds
/// the lock across its whole check-rotate-send-log sequence, so concurrent
/// callers on clones of one agent serialize and each request carries exactly
/// one identity. Clones share state: they are one logical agent.
#[derive(Clone)]
pub struct Agent {
    client: Client,
    source: String,
    state: Arc<Mutex<AgentState>>,
}

impl Default for Agent {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE)
    }
}

impl Agent {
    /// Create an agent for the given source identifier, with rotation
    /// enabled, no request ceiling, and an empty history. An empty source
    /// falls back to the loopback default so every request stays loggable.
    pub fn new(source: &str) -> Self {
        let client = Client::builder()
            .gzip(true)
            .brotli(true)
            .build()
            .expect("Failed to create HTTP client");

        let source = if source.is_empty() {
            DEFAULT_SOURCE
        } else {
            source
        };

        Self {
            client,
            source: source.to_string(),
            state: Arc::new(Mutex::new(AgentState {
                rotation_enabled: true,
                current_identity: random_identity().to_string(),
                limiter: RateLimiter::new(),
                history: HistoryStore::new(),
            })),
        }
    }

    /// Create an agent from a declarative configuration.
    pub fn from_config(config: &AgentConfig) -> Result<Self, AgentError> {
        let mut limiter = RateLimiter::new();
        if let Some(limit) = config.rate_limit {
            limiter.set_limit(limit)?;
        }

        // The identity value mirrors the user-agent config convention:
        // unset or the "rotate" sentinel keep pool rotation, anything else
        // is a fixed custom identity.
        let (rotation_default, current_identity) = match config.identity.as_deref() {
            Some("") => {
                return Err(AgentError::InvalidArgument(
                    "identity must be non-empty".to_string(),
                ))
            }
            None | Some(crate::config::ROTATE_IDENTITY) => {
                (true, random_identity().to_string())
            }
            Some(identity) => (false, identity.to_string()),
        };

        let agent = Self::new(&config.source_or(DEFAULT_SOURCE));
        {
            // The mutex was created above and has no other handles yet.
            let mut state = agent
                .state
                .try_lock()
                .expect("freshly created agent state is unshared");
            state.rotation_enabled = config.rotate_identity.unwrap_or(rotation_default);
            state.current_identity = current_identity;
            state.limiter = limiter;
        }
        Ok(agent)
    }

    /// The source identifier this agent was created with.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The fixed pool identities are rotated through.
    pub fn identity_pool(&self) -> &'static [&'static str] {
        IDENTITY_POOL
    }

    /// The identity that will be attached to the next request.
    pub async fn identity(&self) -> String {
        self.state.lock().await.current_identity.clone()
    }

    /// Set the identity for subsequent requests. Empty identities are
    /// rejected without mutation.
    pub async fn set_identity(&self, identity: &str) -> Result<(), AgentError> {
        if identity.is_empty() {
            return Err(AgentError::InvalidArgument(
                "identity must be non-empty".to_string(),
            ));
        }
        self.state.lock().await.current_identity = identity.to_string();
        Ok(())
    }

    /// Choose a fresh identity before every request.
    pub async fn enable_rotation(&self) {
        self.state.lock().await.rotation_enabled = true;
    }

    /// Keep the current identity across requests.
    pub async fn disable_rotation(&self) {
        self.state.lock().await.rotation_enabled = false;
    }

    pub async fn rotation_enabled(&self) -> bool {
        self.state.lock().await.rotation_enabled
    }

    /// The configured request ceiling; 0 means unlimited.
    pub async fn limit(&self) -> u32 {
        self.state.lock().await.limiter.limit()
    }

    /// Set the request ceiling. Zero is rejected; construct a fresh agent
    /// for unlimited use.
    pub async fn set_limit(&self, limit: u32) -> Result<(), AgentError> {
        self.state.lock().await.limiter.set_limit(limit)
    }

    /// Whether another request to `url` would currently be permitted.
    pub async fn check_limit(&self, url: &str) -> bool {
        let state = self.state.lock().await;
        state.limiter.is_allowed(&state.history, url, &self.source)
    }

    /// Snapshot of the request history, oldest first.
    pub async fn history(&self) -> Vec<RequestRecord> {
        self.state.lock().await.history.records().to_vec()
    }

    pub async fn history_len(&self) -> usize {
        self.state.lock().await.history.len()
    }

    /// Discard the request history.
    pub async fn clear_history(&self) {
        self.state.lock().await.history.clear();
    }

    /// Append a record to the history directly.
    pub async fn log(
        &self,
        source: &str,
        url: &str,
        identity: &str,
        status: &str,
    ) -> Result<(), AgentError> {
        self.state.lock().await.history.log(source, url, identity, status)
    }

    /// Count logged requests whose url matches the origin of `url`.
    pub async fn count_by_domain(&self, url: &str) -> usize {
        self.state.lock().await.history.count_by_domain(url)
    }

    /// Count logged requests whose url contains `fragment`.
    pub async fn count_by_url(&self, fragment: &str) -> usize {
        self.state.lock().await.history.count_by_url(fragment)
    }

    /// Count logged requests whose source contains `fragment`.
    pub async fn count_by_source(&self, fragment: &str) -> usize {
        self.state.lock().await.history.count_by_source(fragment)
    }

    /// Append the history to a file in tab-separated form.
    pub async fn dump_history(&self, path: &Path) -> Result<(), AgentError> {
        self.state.lock().await.history.dump(path)
    }

    /// Load a previously dumped history file, appending to the current
    /// history. Returns the number of records loaded.
    pub async fn load_history(&self, path: &Path) -> Result<usize, AgentError> {
        self.state.lock().await.history.load(path)
    }

    /// Fetch `url` and return the response body as UTF-8 text.
    ///
    /// Recoverable conditions (empty url, rate-limit denial, transport
    /// failure, undecodable body) return an empty string and emit a
    /// warning-level event rather than an error; callers check for an empty
    /// result. Every attempt that reaches the transport is logged, whatever
    /// its outcome.
    pub async fn fetch(&self, url: &str) -> String {
        if url.is_empty() {
            warn!("fetch called with an empty url");
            return String::new();
        }

        // Hold the lock for the whole check-rotate-send-log sequence; this
        // is the serialization boundary for concurrent callers.
        let mut state = self.state.lock().await;

        if !state.limiter.is_allowed(&state.history, url, &self.source) {
            warn!(
                source = %self.source,
                url,
                limit = state.limiter.limit(),
                "rate limit reached; request denied"
            );
            return String::new();
        }

        if state.rotation_enabled {
            state.current_identity = random_identity().to_string();
            debug!(identity = %state.current_identity, "rotated client identity");
        }
        let identity = state.current_identity.clone();

        let result = self
            .client
            .get(url)
            .header(header::USER_AGENT, &identity)
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status();
                if let Err(e) = state
                    .history
                    .log(&self.source, url, &identity, status.as_str())
                {
                    warn!(url, error = %e, "request could not be logged");
                }

                if status.is_success() {
                    match response.text().await {
                        Ok(body) => body,
                        Err(e) => {
                            warn!(url, error = %e, "failed to decode response body");
                            String::new()
                        }
                    }
                } else {
                    warn!(url, status = %status, "request returned non-success status");
                    String::new()
                }
            }
            Err(e) => {
                if let Err(log_err) =
                    state
                        .history
                        .log(&self.source, url, &identity, TRANSPORT_ERROR_STATUS)
                {
                    warn!(url, error = %log_err, "request could not be logged");
                }
                warn!(url, error = %e, "transport error");
                String::new()
            }
        }
    }
}
