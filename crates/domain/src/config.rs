//! Configuration value types
//!
//! Plain data only; the environment loader lives in `couchstat-infra`.

use std::time::Duration;

/// Default listen port for the exposition server.
pub const DEFAULT_PORT: u16 = 7040;

/// Default base URL of the monitored cluster.
pub const DEFAULT_COUCHBASE_URL: &str = "http://localhost:8091";

/// Default poll interval between collection cycles.
pub const DEFAULT_FETCH_DELAY: Duration = Duration::from_millis(10_000);

/// Default backoff after a failed collection cycle.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1_000);

/// Default bucket ignore pattern; matches nothing.
pub const DEFAULT_IGNORE_BUCKETS: &str = "^$";

/// Top-level exporter configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Exposition HTTP server settings
    pub server: ServerConfig,
    /// Monitored cluster endpoint and credentials
    pub cluster: ClusterConfig,
    /// Collection cycle timing and filtering
    pub collection: CollectionConfig,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
}

/// Exposition HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

/// Monitored cluster endpoint and credentials.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Normalized base URL, no trailing slash
    pub base_url: String,
    /// Basic-auth username
    pub username: String,
    /// Basic-auth password
    pub password: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_COUCHBASE_URL.to_string(),
            username: "username".to_string(),
            password: "password".to_string(),
        }
    }
}

/// Collection cycle timing and filtering.
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    /// Delay between successful cycles
    pub poll_interval: Duration,
    /// Delay before restarting after a failed cycle
    pub retry_delay: Duration,
    /// Buckets whose name matches this pattern are skipped entirely
    pub ignore_buckets: String,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_FETCH_DELAY,
            retry_delay: DEFAULT_RETRY_DELAY,
            ignore_buckets: DEFAULT_IGNORE_BUCKETS.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.server.port, 7040);
        assert_eq!(config.cluster.base_url, "http://localhost:8091");
        assert_eq!(config.collection.poll_interval, Duration::from_millis(10_000));
        assert_eq!(config.collection.retry_delay, Duration::from_millis(1_000));
        assert_eq!(config.collection.ignore_buckets, "^$");
    }
}
