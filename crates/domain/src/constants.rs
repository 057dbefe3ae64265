//! Service-wide constants

/// Service name, reported by `/health_check` and used in log metadata.
pub const NAME: &str = "couchstat";

/// Crate version, reported by `/health_check`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// User agent sent with every request to the monitored cluster.
pub const USER_AGENT: &str = concat!("couchstat/", env!("CARGO_PKG_VERSION"));

/// Prefix applied to every derived gauge name.
pub const METRIC_NAMESPACE: &str = "couchbase";
