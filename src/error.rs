//! Errors raised by the outbound provider clients.

use thiserror::Error;

/// Failure of a call to the LLM or email provider.
///
/// The `Display` output may contain upstream response bodies. It is meant for
/// logs only and must not be returned to API callers.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider reported an error: {0}")]
    Provider(String),

    #[error("HTTP request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode upstream response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl UpstreamError {
    pub fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured(_))
    }
}
