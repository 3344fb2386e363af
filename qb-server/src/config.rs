use std::{env, fmt, path::PathBuf, time::Duration};

use url::Url;

pub const DEFAULT_NODE_NORM_URL: &str = "https://nodenormalization-sri.renci.org/1.4";
pub const DEFAULT_NAME_RESOLVER_URL: &str = "https://name-resolution-sri.renci.org";
pub const DEFAULT_BIOLINK_URL: &str =
    "https://raw.githubusercontent.com/biolink/biolink-model/v4.2.0/biolink-model.yaml";
pub const DEFAULT_ROBOKACHE_URL: &str = "https://robokache.renci.org";
pub const DEFAULT_ARA_ENDPOINTS: &str =
    "aragorn=https://aragorn.renci.org/1.4/query,robokop=https://aragorn.renci.org/robokop/query";
pub const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 300_000;

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub node_norm_url: String,
    pub name_resolver_url: String,
    pub biolink_url: String,
    pub robokache_url: String,
    /// Answer services by id, in configuration order.
    pub aras: Vec<(String, String)>,
    pub explore_db: Option<PathBuf>,
    pub samples_path: Option<PathBuf>,
    pub upstream_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            node_norm_url: DEFAULT_NODE_NORM_URL.to_string(),
            name_resolver_url: DEFAULT_NAME_RESOLVER_URL.to_string(),
            biolink_url: DEFAULT_BIOLINK_URL.to_string(),
            robokache_url: DEFAULT_ROBOKACHE_URL.to_string(),
            aras: parse_ara_endpoints("ARA_ENDPOINTS", DEFAULT_ARA_ENDPOINTS).unwrap_or_default(),
            explore_db: None,
            samples_path: None,
            upstream_timeout_ms: DEFAULT_UPSTREAM_TIMEOUT_MS,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidNumber { key: String, value: String },
    InvalidUrl { key: String, value: String },
    InvalidAraEntry(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a non-negative integer, got `{value}`")
            }
            ConfigError::InvalidUrl { key, value } => {
                write!(f, "{key} must be an absolute http(s) url, got `{value}`")
            }
            ConfigError::InvalidAraEntry(entry) => {
                write!(f, "ARA_ENDPOINTS entries must look like `name=url`, got `{entry}`")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, falling back to defaults
    /// for unset or blank keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str, default: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let optional_path = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        };

        Ok(Self {
            node_norm_url: parse_base_url("NODE_NORM_URL", &value("NODE_NORM_URL", DEFAULT_NODE_NORM_URL))?,
            name_resolver_url: parse_base_url(
                "NAME_RESOLVER_URL",
                &value("NAME_RESOLVER_URL", DEFAULT_NAME_RESOLVER_URL),
            )?,
            biolink_url: parse_base_url("BIOLINK_URL", &value("BIOLINK_URL", DEFAULT_BIOLINK_URL))?,
            robokache_url: parse_base_url(
                "ROBOKACHE_URL",
                &value("ROBOKACHE_URL", DEFAULT_ROBOKACHE_URL),
            )?,
            aras: parse_ara_endpoints(
                "ARA_ENDPOINTS",
                &value("ARA_ENDPOINTS", DEFAULT_ARA_ENDPOINTS),
            )?,
            explore_db: optional_path("EXPLORE_DB"),
            samples_path: optional_path("QUICK_ANSWER_SAMPLES"),
            upstream_timeout_ms: parse_u64(
                "UPSTREAM_TIMEOUT_MS",
                &value("UPSTREAM_TIMEOUT_MS", &DEFAULT_UPSTREAM_TIMEOUT_MS.to_string()),
            )?,
        })
    }

    pub fn ara_url(&self, ara: &str) -> Option<&str> {
        self.aras
            .iter()
            .find(|(name, _)| name == ara)
            .map(|(_, url)| url.as_str())
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }
}

pub(crate) fn normalize_base_url(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

fn parse_base_url(key: &str, value: &str) -> Result<String, ConfigError> {
    let normalized = normalize_base_url(value);
    match Url::parse(&normalized) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(normalized),
        _ => Err(ConfigError::InvalidUrl {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidNumber {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_ara_endpoints(key: &str, value: &str) -> Result<Vec<(String, String)>, ConfigError> {
    let mut aras = Vec::new();
    for entry in value.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let Some((name, url)) = entry.split_once('=') else {
            return Err(ConfigError::InvalidAraEntry(entry.to_string()));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::InvalidAraEntry(entry.to_string()));
        }
        aras.push((name.to_string(), parse_base_url(key, url)?));
    }
    Ok(aras)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = ServiceConfig::from_lookup(lookup(&[])).expect("defaults should parse");
        assert_eq!(config.node_norm_url, DEFAULT_NODE_NORM_URL);
        assert_eq!(config.upstream_timeout_ms, DEFAULT_UPSTREAM_TIMEOUT_MS);
        assert_eq!(config.ara_url("aragorn"), Some("https://aragorn.renci.org/1.4/query"));
        assert!(config.explore_db.is_none());
    }

    #[test]
    fn overrides_are_trimmed_and_normalized() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("ROBOKACHE_URL", " http://127.0.0.1:8080/ "),
            ("ARA_ENDPOINTS", "local=http://127.0.0.1:9000/query/, other = http://example.org"),
            ("EXPLORE_DB", "/tmp/explore.db"),
            ("UPSTREAM_TIMEOUT_MS", "250"),
        ]))
        .expect("overrides should parse");
        assert_eq!(config.robokache_url, "http://127.0.0.1:8080");
        assert_eq!(config.ara_url("local"), Some("http://127.0.0.1:9000/query"));
        assert_eq!(config.ara_url("other"), Some("http://example.org"));
        assert_eq!(config.ara_url("aragorn"), None);
        assert_eq!(config.explore_db, Some(PathBuf::from("/tmp/explore.db")));
        assert_eq!(config.upstream_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = ServiceConfig::from_lookup(lookup(&[("UPSTREAM_TIMEOUT_MS", "soon")]))
            .expect_err("timeout should be numeric");
        assert!(matches!(err, ConfigError::InvalidNumber { .. }));

        let err = ServiceConfig::from_lookup(lookup(&[("ARA_ENDPOINTS", "aragorn")]))
            .expect_err("entries need a url");
        assert!(matches!(err, ConfigError::InvalidAraEntry(entry) if entry == "aragorn"));

        let err = ServiceConfig::from_lookup(lookup(&[("BIOLINK_URL", "ftp://example.org/x")]))
            .expect_err("only http urls are accepted");
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }
}
