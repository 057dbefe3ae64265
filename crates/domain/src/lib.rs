//! # Couchstat Domain
//!
//! Pure data for the exporter: the error type, configuration values, and
//! serde models of the Couchbase administrative API responses that the
//! collectors consume.
//!
//! ## Architecture
//! - No I/O, no async, no metrics types
//! - Everything else in the workspace depends on this crate

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::{ClusterConfig, CollectionConfig, Config, ServerConfig};
pub use errors::{CouchstatError, Result};
