//! Agent configuration types.
//!
//! These structs define the JSON- or TOML-configurable behavior of an
//! agent: source identifier, identity rotation, and the request ceiling.

use serde::{Deserialize, Serialize};

/// Identity config value selecting per-request rotation from the pool.
pub const ROTATE_IDENTITY: &str = "rotate";

/// Declarative agent configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Source identifier used to key rate limiting and history queries.
    /// Defaults to the loopback address when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Whether a fresh identity is chosen before each request. Defaults to
    /// true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotate_identity: Option<bool>,
    /// Requests permitted per (origin, source) pair. Omit for unlimited;
    /// an explicit 0 is rejected at construction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<u32>,
    /// Identity configuration.
    /// - unset: a pool identity is chosen at construction
    /// - `"rotate"`: rotate through the pool on every request
    /// - any other string: use as a fixed identity (rotation off unless
    ///   `rotate_identity` says otherwise)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
}

impl AgentConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parse a configuration from TOML.
    pub fn from_toml(toml: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml)
    }

    /// Get the effective source, using the provided default if not set.
    pub fn source_or(&self, default: &str) -> String {
        self.source.clone().unwrap_or_else(|| default.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_all_defaults() {
        let config = AgentConfig::from_json("{}").unwrap();
        assert_eq!(config, AgentConfig::default());
        assert_eq!(config.source_or("127.0.0.1"), "127.0.0.1");
    }

    #[test]
    fn test_from_toml() {
        let config = AgentConfig::from_toml(
            r#"
            source = "9.9.9.9"
            rate_limit = 5
            identity = "rotate"
        "#,
        )
        .unwrap();
        assert_eq!(config.source.as_deref(), Some("9.9.9.9"));
        assert_eq!(config.rate_limit, Some(5));
        assert_eq!(config.identity.as_deref(), Some(ROTATE_IDENTITY));
        assert_eq!(config.rotate_identity, None);
    }

    #[test]
    fn test_full_config_round_trips() {
        let config = AgentConfig {
            source: Some("9.9.9.9".to_string()),
            rotate_identity: Some(false),
            rate_limit: Some(5),
            identity: Some("MyBot/1.0".to_string()),
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(AgentConfig::from_json(&json).unwrap(), config);
    }
}
