//! Conversions from external infrastructure errors into domain errors.

use couchstat_domain::CouchstatError;
use reqwest::Error as HttpError;
use url::ParseError as UrlError;

/// Error newtype that keeps conversions on the infrastructure side and
/// can be converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub CouchstatError);

impl From<InfraError> for CouchstatError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<CouchstatError> for InfraError {
    fn from(value: CouchstatError) -> Self {
        InfraError(value)
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        let detail = if value.is_timeout() {
            format!("http request timed out: {value}")
        } else if value.is_connect() {
            format!("http connection failed: {value}")
        } else if value.is_decode() {
            format!("http response body malformed: {value}")
        } else {
            format!("http request failed: {value}")
        };
        InfraError(CouchstatError::Network(detail))
    }
}

impl From<UrlError> for InfraError {
    fn from(value: UrlError) -> Self {
        InfraError(CouchstatError::Config(format!("invalid URL: {value}")))
    }
}
