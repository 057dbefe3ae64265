//! Base-URL normalization
//!
//! Couchbase's administrative API listens on 8091 (plain) or 18091
//! (TLS); a configured base URL without an explicit port gets the
//! matching default so operators can point the exporter at a bare host.

use couchstat_domain::{CouchstatError, Result};
use url::Url;

use crate::errors::InfraError;

/// Normalize a configured base URL: default the administrative port and
/// strip a trailing slash.
///
/// # Errors
/// Returns [`CouchstatError::Config`] when the input is not a valid URL
/// or cannot carry a port.
pub fn normalize_base_url(input: &str) -> Result<String> {
    let mut url = Url::parse(input).map_err(|err| {
        let infra: InfraError = err.into();
        CouchstatError::from(infra)
    })?;

    if url.port().is_none() {
        let default_port = match url.scheme() {
            "http" => Some(8091),
            "https" => Some(18091),
            _ => None,
        };
        if let Some(port) = default_port {
            url.set_port(Some(port)).map_err(|()| {
                CouchstatError::Config(format!("cannot set port on URL: {input}"))
            })?;
        }
    }

    let mut output = url.to_string();
    if output.ends_with('/') {
        output.pop();
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_the_administrative_port() {
        let tests = [
            ("http://abcd", "http://abcd:8091"),
            ("https://abcd", "https://abcd:18091"),
            ("http://abcd:3456", "http://abcd:3456"),
            ("https://abcd:3456", "https://abcd:3456"),
        ];

        for (input, expected) in tests {
            assert_eq!(normalize_base_url(input).unwrap(), expected, "normalize({input})");
        }
    }

    #[test]
    fn strips_a_trailing_slash() {
        assert_eq!(normalize_base_url("http://abcd:3456/").unwrap(), "http://abcd:3456");
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(normalize_base_url("not a url"), Err(CouchstatError::Config(_))));
    }
}
