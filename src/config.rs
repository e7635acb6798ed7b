//! Configuration: retention policy grammar, duration parsing, and the
//! immutable [`Configuration`] struct threaded through the rest of the
//! service (the same role the teacher's `AppState` plays for per-request
//! handler state).

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed retention policy JSON: {0}")]
    PolicyJson(#[from] serde_json::Error),
    #[error("malformed duration {0:?}: expected N{{s|m|h|d|w|y}} or an integer count")]
    BadDuration(String),
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
}

/// A per-type retention rule: prune by age, or cap the record count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionRule {
    Age(Duration),
    Count(u64),
}

/// Parse the retention policy JSON (`{"app":"2w","deploy":10}`) into a
/// per-type rule map. A malformed policy string is a fatal configuration
/// error, detected once at startup.
pub fn parse_retention_policy(json: &str) -> Result<HashMap<String, RetentionRule>, ConfigError> {
    let raw: HashMap<String, RetentionValue> = serde_json::from_str(json)?;
    let mut rules = HashMap::with_capacity(raw.len());
    for (type_, value) in raw {
        let rule = match value {
            RetentionValue::Count(n) => RetentionRule::Count(n),
            RetentionValue::Duration(s) => RetentionRule::Age(parse_duration(&s)?),
        };
        rules.insert(type_, rule);
    }
    Ok(rules)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RetentionValue {
    Count(u64),
    Duration(String),
}

/// Parse `N{s|m|h|d|w|y}` with the familiar calendar-ignorant ratios:
/// `1m=60s, 1h=60m, 1d=24h, 1w=7d, 1y=52w`.
pub fn parse_duration(spec: &str) -> Result<Duration, ConfigError> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(ConfigError::BadDuration(spec.to_string()));
    }
    let (digits, unit) = spec.split_at(spec.len() - 1);
    let n: u64 = digits
        .parse()
        .map_err(|_| ConfigError::BadDuration(spec.to_string()))?;

    let seconds = match unit {
        "s" => n,
        "m" => n * 60,
        "h" => n * 60 * 60,
        "d" => n * 60 * 60 * 24,
        "w" => n * 60 * 60 * 24 * 7,
        "y" => n * 60 * 60 * 24 * 7 * 52,
        _ => return Err(ConfigError::BadDuration(spec.to_string())),
    };
    Ok(Duration::from_secs(seconds))
}

/// Layered service configuration: CLI flags override an optional TOML file,
/// which overrides the defaults below.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub listen_http: String,
    pub listen_udp: String,
    pub listen_tcp: String,
    pub archive_db: String,
    /// Empty string disables the authenticator, per the CLI surface.
    pub auth_db: String,
    /// Empty string disables the publisher sink.
    pub publisher_address: String,
    pub retention_policy: String,
    pub default_type: String,
    pub default_log_level: String,
    pub admin_token: String,
    pub cleanup_frequency_secs: u64,
    pub insecure: bool,
    pub cors_origin: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            listen_http: "127.0.0.1:1234".to_string(),
            listen_udp: "127.0.0.1:1234".to_string(),
            listen_tcp: "127.0.0.1:1235".to_string(),
            archive_db: "file:///tmp/logdeck.db".to_string(),
            auth_db: String::new(),
            publisher_address: String::new(),
            retention_policy: r#"{"app":"2w"}"#.to_string(),
            default_type: "app".to_string(),
            default_log_level: "info".to_string(),
            admin_token: "secret".to_string(),
            cleanup_frequency_secs: 60,
            insecure: false,
            cors_origin: "*".to_string(),
        }
    }
}

impl Configuration {
    /// Strip the `file://`/`boltdb://` scheme prefixes the CLI surface
    /// historically accepts, leaving a plain filesystem path.
    pub fn archive_path(&self) -> &str {
        strip_scheme(&self.archive_db)
    }

    pub fn auth_path(&self) -> Option<&str> {
        if self.auth_db.is_empty() {
            None
        } else {
            Some(strip_scheme(&self.auth_db))
        }
    }

    pub fn retention_rules(&self) -> Result<HashMap<String, RetentionRule>, ConfigError> {
        parse_retention_policy(&self.retention_policy)
    }

    pub fn load_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&text)?)
    }
}

fn strip_scheme(addr: &str) -> &str {
    for scheme in ["boltdb://", "file://"] {
        if let Some(rest) = addr.strip_prefix(scheme) {
            return rest;
        }
    }
    addr
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_grammar_covers_every_unit() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86400));
        assert_eq!(parse_duration("1w").unwrap(), Duration::from_secs(86400 * 7));
        assert_eq!(parse_duration("1y").unwrap(), Duration::from_secs(86400 * 7 * 52));
    }

    #[test]
    fn malformed_duration_is_an_error() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10x").is_err());
        assert!(parse_duration("abc").is_err());
    }

    #[test]
    fn retention_policy_mixes_age_and_count_rules() {
        let rules = parse_retention_policy(r#"{"app":"1s","deploy":10}"#).unwrap();
        assert_eq!(rules["app"], RetentionRule::Age(Duration::from_secs(1)));
        assert_eq!(rules["deploy"], RetentionRule::Count(10));
    }

    #[test]
    fn archive_path_strips_known_schemes() {
        let mut cfg = Configuration::default();
        cfg.archive_db = "boltdb:///var/db/logdeck.db".to_string();
        assert_eq!(cfg.archive_path(), "/var/db/logdeck.db");
    }
}
