//! Per-(origin, source) request ceiling.
//!
//! The limiter itself holds only the configured ceiling; counting is done
//! against the request history at check time. Matching is by substring
//! containment on both the origin and the source, consistent with the
//! history counting methods.

use tracing::debug;

use crate::error::AgentError;
use crate::history::HistoryStore;

pub use crate::history::extract_origin;

/// Count history records whose url contains the origin of `url` and whose
/// source contains `source`. Returns 0 when no origin can be extracted.
pub fn count_by_origin_and_source(history: &HistoryStore, url: &str, source: &str) -> usize {
    let Some(origin) = extract_origin(url) else {
        return 0;
    };
    history
        .records()
        .iter()
        .filter(|r| r.url.contains(&origin) && r.source.contains(source))
        .count()
}

/// Request ceiling per (origin, source) pair. A limit of 0 means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimiter {
    limit: u32,
}

impl RateLimiter {
    /// Create an unlimited limiter.
    pub fn new() -> Self {
        Self::default()
    }

    /// The configured ceiling; 0 means unlimited.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Set the ceiling. Zero cannot be set explicitly (it is the internal
    /// unlimited sentinel); attempting to leaves the limit unchanged.
    pub fn set_limit(&mut self, limit: u32) -> Result<(), AgentError> {
        if limit == 0 {
            return Err(AgentError::InvalidArgument(
                "rate limit must be greater than zero".to_string(),
            ));
        }
        self.limit = limit;
        debug!(limit, "rate limit set");
        Ok(())
    }

    /// Whether another request to `url` is permitted for `source`.
    pub fn is_allowed(&self, history: &HistoryStore, url: &str, source: &str) -> bool {
        if self.limit == 0 {
            return true;
        }
        count_by_origin_and_source(history, url, source) < self.limit as usize
    }
}
