//! Configuration loader
//!
//! Loads exporter configuration from environment variables. Every
//! variable is optional and falls back to its documented default;
//! numeric variables and the bucket ignore pattern are validated so a
//! bad value fails at startup instead of mid-cycle.
//!
//! ## Environment Variables
//! - `PORT`: exposition server listen port
//! - `COUCHBASE_URL`: base URL of the monitored cluster
//! - `COUCHBASE_USER`: basic-auth username
//! - `COUCHBASE_PASS`: basic-auth password
//! - `FETCH_DELAY`: poll interval between cycles, milliseconds
//! - `RETRY_DELAY`: backoff after a failed cycle, milliseconds
//! - `LOGLEVEL`: default log filter when `RUST_LOG` is unset
//! - `IGNORE_BUCKETS`: regular expression of bucket names to skip

use std::str::FromStr;
use std::time::Duration;

use couchstat_domain::config::{
    ClusterConfig, CollectionConfig, Config, ServerConfig, DEFAULT_COUCHBASE_URL,
    DEFAULT_FETCH_DELAY, DEFAULT_IGNORE_BUCKETS, DEFAULT_PORT, DEFAULT_RETRY_DELAY,
};
use couchstat_domain::{CouchstatError, Result};
use regex::Regex;

use crate::couchbase::normalize_base_url;

/// Load configuration from environment variables.
///
/// # Errors
/// Returns [`CouchstatError::Config`] when a numeric variable does not
/// parse, the base URL is invalid, or the bucket ignore pattern is not a
/// valid regular expression.
pub fn load_from_env() -> Result<Config> {
    let port = env_number("PORT", DEFAULT_PORT)?;
    let base_url = normalize_base_url(&env_string("COUCHBASE_URL", DEFAULT_COUCHBASE_URL))?;
    let username = env_string("COUCHBASE_USER", "username");
    let password = env_string("COUCHBASE_PASS", "password");

    let fetch_delay_ms = env_number("FETCH_DELAY", DEFAULT_FETCH_DELAY.as_millis() as u64)?;
    let retry_delay_ms = env_number("RETRY_DELAY", DEFAULT_RETRY_DELAY.as_millis() as u64)?;
    let log_level = env_string("LOGLEVEL", "info");

    let ignore_buckets = env_string("IGNORE_BUCKETS", DEFAULT_IGNORE_BUCKETS);
    Regex::new(&ignore_buckets).map_err(|err| {
        CouchstatError::Config(format!("invalid IGNORE_BUCKETS pattern: {err}"))
    })?;

    Ok(Config {
        server: ServerConfig { port },
        cluster: ClusterConfig { base_url, username, password },
        collection: CollectionConfig {
            poll_interval: Duration::from_millis(fetch_delay_ms),
            retry_delay: Duration::from_millis(retry_delay_ms),
            ignore_buckets,
        },
        log_level,
    })
}

/// Get an environment variable, falling back to a default.
fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a numeric environment variable, falling back to a default.
///
/// # Errors
/// Returns [`CouchstatError::Config`] when the variable is set but does
/// not parse as a number.
fn env_number<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value.parse::<T>().map_err(|err| {
            CouchstatError::Config(format!("expected {key} to be a number: {err}"))
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use once_cell::sync::Lazy;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const ALL_VARS: [&str; 8] = [
        "PORT",
        "COUCHBASE_URL",
        "COUCHBASE_USER",
        "COUCHBASE_PASS",
        "FETCH_DELAY",
        "RETRY_DELAY",
        "LOGLEVEL",
        "IGNORE_BUCKETS",
    ];

    fn clear_env() {
        for var in ALL_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn unset_environment_yields_defaults() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let config = load_from_env().expect("config");
        assert_eq!(config.server.port, 7040);
        assert_eq!(config.cluster.base_url, "http://localhost:8091");
        assert_eq!(config.cluster.username, "username");
        assert_eq!(config.collection.poll_interval, Duration::from_millis(10_000));
        assert_eq!(config.collection.retry_delay, Duration::from_millis(1_000));
        assert_eq!(config.collection.ignore_buckets, "^$");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn set_variables_override_defaults() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("PORT", "9000");
        std::env::set_var("COUCHBASE_URL", "https://cb.example.com");
        std::env::set_var("COUCHBASE_USER", "admin");
        std::env::set_var("COUCHBASE_PASS", "hunter2");
        std::env::set_var("FETCH_DELAY", "5000");
        std::env::set_var("IGNORE_BUCKETS", "^test");

        let config = load_from_env().expect("config");
        assert_eq!(config.server.port, 9000);
        // The loader normalizes the base URL on the way in.
        assert_eq!(config.cluster.base_url, "https://cb.example.com:18091");
        assert_eq!(config.cluster.username, "admin");
        assert_eq!(config.collection.poll_interval, Duration::from_millis(5_000));
        assert_eq!(config.collection.ignore_buckets, "^test");

        clear_env();
    }

    #[test]
    fn non_numeric_fetch_delay_is_rejected() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("FETCH_DELAY", "soon");
        let result = load_from_env();
        assert!(matches!(result, Err(CouchstatError::Config(_))));

        clear_env();
    }

    #[test]
    fn invalid_ignore_pattern_is_rejected() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("IGNORE_BUCKETS", "[unclosed");
        let result = load_from_env();
        assert!(matches!(result, Err(CouchstatError::Config(_))));

        clear_env();
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("COUCHBASE_URL", "not a url");
        let result = load_from_env();
        assert!(matches!(result, Err(CouchstatError::Config(_))));

        clear_env();
    }
}
