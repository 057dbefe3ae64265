//! Couchbase administrative API access

mod client;
mod url;

pub use client::CouchbaseClient;
pub use url::normalize_base_url;
