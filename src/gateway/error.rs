use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no API key configured; pass one explicitly or set {}", crate::gateway::API_KEY_ENV)]
    MissingApiKey,

    #[error("failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("service unavailable for {url} after {attempts} attempts")]
    ServiceUnavailable {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("authentication rejected for {url} with status {status}")]
    AuthRejected { url: String, status: StatusCode },

    #[error("invalid request for {url} with status {status}")]
    InvalidRequest { url: String, status: StatusCode },

    #[error("no data found for {context}")]
    NotFound { context: String },

    #[error("failed to decode response from {url}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl GatewayError {
    /// Whether this is the benign "service holds no data for that key/range"
    /// outcome, which bulk operations record as an empty result.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound { .. })
    }
}
