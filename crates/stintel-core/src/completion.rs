use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    #[must_use]
    pub fn new(prompt: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            temperature,
            max_tokens,
        }
    }
}

#[derive(Debug, Error)]
pub enum CompletionError {
    /// No credentials for the selected provider. Callers fall back silently.
    #[error("completion provider not configured: {0}")]
    NotConfigured(String),

    #[error("completion provider unavailable: {0}")]
    Unavailable(String),

    #[error("unexpected completion response: {0}")]
    InvalidResponse(String),
}

impl CompletionError {
    #[must_use]
    pub fn is_not_configured(&self) -> bool {
        matches!(self, CompletionError::NotConfigured(_))
    }
}

/// Prompt in, text out.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Model identifier recorded alongside saved analyses.
    fn model(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}
