//! Error types for the OpenStack compute gateway.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by [`super::NovaGateway`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum NovaGatewayError {
    /// Raised when the configuration is incomplete.
    #[error("configuration error: {0}")]
    Config(String),
    /// Raised when Keystone rejects the credentials.
    #[error("authentication failed with status {status}: {message}")]
    Auth {
        /// HTTP status returned by Keystone.
        status: u16,
        /// Response body returned by Keystone.
        message: String,
    },
    /// Raised when Keystone answers without an `X-Subject-Token` header.
    #[error("authentication response did not include a token")]
    MissingToken,
    /// Raised when the service catalogue has no usable compute endpoint.
    #[error("no public compute endpoint in the service catalogue{}", region_suffix(.region.as_deref()))]
    MissingEndpoint {
        /// Region filter that was applied, if any.
        region: Option<String>,
    },
    /// Raised when a request cannot be sent or its body cannot be read.
    #[error("request failed: {message}")]
    Http {
        /// Message from the HTTP client.
        message: String,
    },
    /// Raised when the compute API answers with an unexpected status.
    #[error("{method} {url} returned status {status}: {body}")]
    Status {
        /// HTTP method of the failed request.
        method: String,
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
    /// Raised when a response body does not match the expected shape.
    #[error("failed to decode {resource} response: {message}")]
    Decode {
        /// Resource being decoded (for example `servers`).
        resource: String,
        /// Decoder message.
        message: String,
    },
}

fn region_suffix(region: Option<&str>) -> String {
    region.map_or_else(String::new, |name| format!(" for region {name}"))
}

impl From<reqwest::Error> for NovaGatewayError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http {
            message: value.to_string(),
        }
    }
}

impl From<ConfigError> for NovaGatewayError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}
