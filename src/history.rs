//! In-memory request log with flat-file persistence.
//!
//! Every request the agent makes is recorded here. Counting methods use
//! substring containment rather than exact equality, so a source filter of
//! `"1.2.3.4"` also matches a record with source `"21.2.3.40"`. Callers that
//! rely on this loose matching include the per-origin rate limiter.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use tracing::debug;
use url::Url;

use crate::error::AgentError;

/// Extract the origin of a URL: the hostname with a leading `www.` label
/// stripped. Returns `None` when the URL has no parseable hostname.
pub fn extract_origin(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

/// One logged request attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    /// Caller-supplied identifier, usually an originating address.
    pub source: String,
    /// Full request URL.
    pub url: String,
    /// Client identity header sent with the request.
    pub identity: String,
    /// Response status as logged, e.g. `"200"` or `"0"` for transport errors.
    pub status: String,
}

impl fmt::Display for RequestRecord {
    /// Renders the record as its persisted form: four tab-separated fields.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.source, self.url, self.identity, self.status
        )
    }
}

/// Append-only request log, oldest record first.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    records: Vec<RequestRecord>,
}

impl HistoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. All four fields must be non-empty; otherwise nothing
    /// is appended and `InvalidArgument` is returned.
    pub fn log(
        &mut self,
        source: &str,
        url: &str,
        identity: &str,
        status: &str,
    ) -> Result<(), AgentError> {
        if source.is_empty() || url.is_empty() || identity.is_empty() || status.is_empty() {
            return Err(AgentError::InvalidArgument(
                "request record requires source, url, identity, and status".to_string(),
            ));
        }
        self.records.push(RequestRecord {
            source: source.to_string(),
            url: url.to_string(),
            identity: identity.to_string(),
            status: status.to_string(),
        });
        Ok(())
    }

    /// Discard all records.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Read view of the log, insertion order preserved.
    pub fn records(&self) -> &[RequestRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Count records whose url contains the given fragment.
    pub fn count_by_url(&self, fragment: &str) -> usize {
        self.records.iter().filter(|r| r.url.contains(fragment)).count()
    }

    /// Count records whose source contains the given fragment.
    pub fn count_by_source(&self, fragment: &str) -> usize {
        self.records
            .iter()
            .filter(|r| r.source.contains(fragment))
            .count()
    }

    /// Count records matching the origin of `url`, ignoring source.
    /// Returns 0 when no hostname can be extracted.
    pub fn count_by_domain(&self, url: &str) -> usize {
        match extract_origin(url) {
            Some(origin) => self.count_by_url(&origin),
            None => 0,
        }
    }

    /// Append the log to a file, one tab-separated line per record.
    pub fn dump(&self, path: &Path) -> Result<(), AgentError> {
        let mut file = OpenOptions::new().append(true).create(true).open(path)?;
        for record in &self.records {
            writeln!(file, "{record}")?;
        }
        debug!(records = self.records.len(), path = %path.display(), "dumped request history");
        Ok(())
    }

    /// Re-log every line of a previously dumped file, appending to the
    /// current log. Stops at the first malformed line (fewer than four
    /// fields); records loaded before the failure are kept. Returns the
    /// number of records loaded.
    pub fn load(&mut self, path: &Path) -> Result<usize, AgentError> {
        let file = std::fs::File::open(path)?;
        let mut loaded = 0;
        for line in BufReader::new(file).lines() {
            let line = line?;
            let mut fields = line.split('\t');
            let source = fields.next().unwrap_or("");
            let url = fields.next().unwrap_or("");
            let identity = fields.next().unwrap_or("");
            let status = fields.next().unwrap_or("");
            self.log(source, url, identity, status)?;
            loaded += 1;
        }
        debug!(records = loaded, path = %path.display(), "loaded request history");
        Ok(loaded)
    }
}
