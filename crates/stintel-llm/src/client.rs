//! HTTP client for the hosted text-completion APIs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use stintel_core::{AppConfig, CompletionError, CompletionRequest, LlmProvider, TextCompletion};

use crate::error::LlmError;
use crate::wire::{
    ChatRequest, ChatResponse, Message, MessagesRequest, MessagesResponse, ANTHROPIC_VERSION,
    SYSTEM_PROMPT,
};

const OPENAI_BASE_URL: &str = "https://api.openai.com/";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/";

/// [`TextCompletion`] backed by OpenAI chat completions or Anthropic messages.
///
/// A client without an API key is still constructible; every call then fails
/// with [`CompletionError::NotConfigured`] so callers can use their fallbacks.
pub struct CompletionClient {
    client: Client,
    provider: LlmProvider,
    model: String,
    api_key: Option<String>,
    base_url: Url,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl CompletionClient {
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        provider: LlmProvider,
        model: &str,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let base_url = match provider {
            LlmProvider::OpenAi => OPENAI_BASE_URL,
            LlmProvider::Anthropic => ANTHROPIC_BASE_URL,
        };
        Self::with_base_url(provider, model, api_key, timeout_secs, base_url)
    }

    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the `reqwest::Client` cannot be built.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, LlmError> {
        Self::new(
            config.llm_provider,
            &config.llm_model,
            config.llm_api_key.clone(),
            config.llm_timeout_secs,
        )
    }

    /// Point the client at a different host (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the `reqwest::Client` cannot be built, or
    /// [`LlmError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        provider: LlmProvider,
        model: &str,
        api_key: Option<String>,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("stintel/0.1 (startup-intelligence)")
            .build()?;
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| LlmError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            client,
            provider,
            model: model.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url,
        })
    }

    #[must_use]
    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self, path: &str) -> Result<Url, LlmError> {
        self.base_url
            .join(path)
            .map_err(|e| LlmError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn send<T: DeserializeOwned>(
        request: RequestBuilder,
        context: &str,
    ) -> Result<T, LlmError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: truncate(&body, 300),
            });
        }
        serde_json::from_str(&body).map_err(|e| LlmError::Deserialize {
            context: context.to_string(),
            source: e,
        })
    }

    async fn complete_openai(
        &self,
        api_key: &str,
        request: &CompletionRequest,
    ) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };
        let builder = self
            .client
            .post(self.endpoint("v1/chat/completions")?)
            .bearer_auth(api_key)
            .json(&body);
        let response: ChatResponse = Self::send(builder, "chat completions").await?;
        response.into_text().ok_or(LlmError::EmptyResponse)
    }

    async fn complete_anthropic(
        &self,
        api_key: &str,
        request: &CompletionRequest,
    ) -> Result<String, LlmError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
        };
        let builder = self
            .client
            .post(self.endpoint("v1/messages")?)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);
        let response: MessagesResponse = Self::send(builder, "messages").await?;
        response.into_text().ok_or(LlmError::EmptyResponse)
    }
}

fn truncate(body: &str, max_chars: usize) -> String {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[async_trait]
impl TextCompletion for CompletionClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(CompletionError::NotConfigured(format!(
                "no API key for {}",
                self.provider
            )));
        };
        let result = match self.provider {
            LlmProvider::OpenAi => self.complete_openai(api_key, request).await,
            LlmProvider::Anthropic => self.complete_anthropic(api_key, request).await,
        };
        match result {
            Ok(text) => {
                tracing::debug!(provider = %self.provider, chars = text.len(), "completion received");
                Ok(text)
            }
            Err(e) => {
                tracing::warn!(provider = %self.provider, error = %e, "completion failed");
                Err(e.into())
            }
        }
    }
}
