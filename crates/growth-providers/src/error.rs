// crates/growth-providers/src/error.rs
// ============================================================================
// Module: Provider Errors
// Description: The `Network` error family from spec §7, surfaced by every
// outbound HTTP call this crate makes.
// ============================================================================

use thiserror::Error;

/// Errors raised by outbound HTTP calls (spec §7: "`Network{transport|
/// http(status)|decoding}`").
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The request never reached the server, or the connection failed.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server responded with a non-success status.
    #[error("http error: status {status}, body: {body}")]
    Http {
        /// The response status code.
        status: u16,
        /// The response body, truncated for logging.
        body: String,
    },
    /// The response body could not be decoded as the expected shape.
    #[error("response decoding failed: {0}")]
    Decoding(#[from] serde_json::Error),
    /// The outgoing request body could not be gzip-compressed.
    #[error("request compression failed: {0}")]
    Compression(#[from] std::io::Error),
}

impl ProviderError {
    /// Returns true when this error is one the network queue's retry
    /// taxonomy treats as retryable (spec §4.2: "HTTP 5xx, 408, 429,
    /// transport errors").
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Http { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            Self::Decoding(_) | Self::Compression(_) => false,
        }
    }
}
