//! Shared JSON-over-HTTP client for the collector services.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use stintel_core::AppConfig;

use crate::error::CollectorError;
use crate::retry::RetryPolicy;

const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "stintel/0.1 (startup-intelligence)".to_string(),
            max_retries: 0,
            backoff_base_ms: 500,
        }
    }
}

impl ClientSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.collector_timeout_secs,
            user_agent: config.collector_user_agent.clone(),
            max_retries: config.collector_max_retries,
            backoff_base_ms: config.collector_backoff_base_ms,
        }
    }
}

/// Slack on top of the request budget for decoding and scheduling.
const BUDGET_MARGIN: Duration = Duration::from_secs(5);

impl ClientSettings {
    /// Upper bound on one collector call: every attempt at the full request
    /// timeout plus the retry waits between them.
    #[must_use]
    pub fn source_budget(&self) -> Duration {
        RetryPolicy::new(self.max_retries, self.backoff_base_ms)
            .worst_case(Duration::from_secs(self.timeout_secs))
            .saturating_add(BUDGET_MARGIN)
    }
}

/// GET-only client bound to one service base URL.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    client: Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl ServiceClient {
    /// # Errors
    ///
    /// Returns [`CollectorError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`CollectorError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn new(base_url: &str, settings: &ClientSettings) -> Result<Self, CollectorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(settings.user_agent.clone())
            .build()?;

        // Exactly one trailing slash so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| CollectorError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            retry: RetryPolicy::new(settings.max_retries, settings.backoff_base_ms),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn build_url(&self, path: &str, query: &[(&str, String)]) -> Url {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .unwrap_or_else(|_| self.base_url.clone());
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        url
    }

    /// GET `path` with `query` and decode the JSON body as `T`.
    ///
    /// # Errors
    ///
    /// - [`CollectorError::Http`] on network failure or non-2xx status.
    /// - [`CollectorError::Deserialize`] if the body does not match `T`.
    pub async fn get_json<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, CollectorError>
    where
        T: DeserializeOwned,
    {
        let url = self.build_url(path, query);
        self.retry
            .run(url.path(), || {
                let url = url.clone();
                async move {
                    let response = self.client.get(url.clone()).send().await?;
                    let body = response.error_for_status()?.text().await?;
                    serde_json::from_str(&body).map_err(|e| CollectorError::Deserialize {
                        context: url.path().to_string(),
                        source: e,
                    })
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ServiceClient {
        ServiceClient::new(base, &ClientSettings::default()).unwrap()
    }

    #[test]
    fn build_url_appends_path_and_query() {
        let c = client("http://localhost:3002");
        let url = c.build_url("/funding", &[("days", "7".to_string())]);
        assert_eq!(url.as_str(), "http://localhost:3002/funding?days=7");
    }

    #[test]
    fn build_url_keeps_base_path_prefix() {
        let c = client("http://gateway.local/startup/");
        let url = c.build_url("launches", &[]);
        assert_eq!(url.as_str(), "http://gateway.local/startup/launches");
    }

    #[test]
    fn source_budget_covers_retries_and_waits() {
        let settings = ClientSettings {
            timeout_secs: 30,
            max_retries: 2,
            backoff_base_ms: 1_000,
            ..ClientSettings::default()
        };
        // 90 s of attempts, 3.75 s of waits, 5 s margin
        assert_eq!(settings.source_budget(), Duration::from_millis(98_750));
        assert_eq!(ClientSettings::default().source_budget(), Duration::from_secs(35));

        let extreme = ClientSettings {
            timeout_secs: u64::MAX,
            max_retries: u32::MAX,
            ..ClientSettings::default()
        };
        assert_eq!(extreme.source_budget(), Duration::MAX);
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = ServiceClient::new("not a url", &ClientSettings::default()).unwrap_err();
        assert!(matches!(err, CollectorError::InvalidBaseUrl { .. }));
    }
}
