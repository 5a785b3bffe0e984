use stintel_core::SourceError;
use thiserror::Error;

/// Errors returned by the source-service HTTP clients.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Network or TLS failure, or a non-2xx status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl From<CollectorError> for SourceError {
    fn from(err: CollectorError) -> Self {
        match err {
            CollectorError::Http(e) if e.is_timeout() => {
                SourceError::Unavailable(format!("timeout: {e}"))
            }
            CollectorError::Http(e) => SourceError::Unavailable(e.to_string()),
            CollectorError::Deserialize { .. } => SourceError::Malformed(err.to_string()),
            CollectorError::InvalidBaseUrl { .. } => SourceError::NotConfigured(err.to_string()),
        }
    }
}
