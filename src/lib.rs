//! Shroud — a thin personalization layer over an HTTP client.
//!
//! An [`Agent`] wraps a `reqwest` client and adds the bookkeeping a polite
//! scraper needs: a rotating pool of client identities (user agents), a
//! request history keyed by caller-supplied source and request origin, and a
//! simple request ceiling per (origin, source) pair. The history can be
//! dumped to and reloaded from a flat tab-separated file.
//!
//! ```no_run
//! use shroud::Agent;
//!
//! # async fn run() {
//! let agent = Agent::new("203.0.113.7");
//! agent.set_limit(10).await.unwrap();
//! let body = agent.fetch("http://example.com/").await;
//! if body.is_empty() {
//!     // denied, failed, or empty response; see the warning log
//! }
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod history;
pub mod identity;
pub mod rate_limit;

pub use agent::{Agent, DEFAULT_SOURCE};
pub use config::AgentConfig;
pub use error::AgentError;
pub use history::{extract_origin, HistoryStore, RequestRecord};
pub use identity::{random_identity, IDENTITY_POOL};
pub use rate_limit::{count_by_origin_and_source, RateLimiter};
