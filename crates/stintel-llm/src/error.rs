use stintel_core::CompletionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response; the body usually carries the provider's error message.
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("response contained no text")]
    EmptyResponse,

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl From<LlmError> for CompletionError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Http(_) | LlmError::Status { .. } | LlmError::InvalidBaseUrl { .. } => {
                CompletionError::Unavailable(err.to_string())
            }
            LlmError::Deserialize { .. } | LlmError::EmptyResponse => {
                CompletionError::InvalidResponse(err.to_string())
            }
        }
    }
}
