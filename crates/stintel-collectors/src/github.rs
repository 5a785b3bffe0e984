use async_trait::async_trait;
use stintel_core::{CollectedRecord, SourceCollector, SourceError};

use crate::client::{ClientSettings, ServiceClient};
use crate::error::CollectorError;
use crate::startup::merge_halves;
use crate::wire::{SignalsResponse, TrendingResponse};

const TRENDING_LIMIT: u32 = 25;
const SIGNAL_KEYWORDS: &str = "startup,AI,tech";

/// Trending repositories and derived activity signals from the GitHub monitor.
#[derive(Debug, Clone)]
pub struct GithubCollector {
    client: ServiceClient,
}

impl GithubCollector {
    /// # Errors
    ///
    /// Returns [`CollectorError`] if the HTTP client cannot be built or the
    /// base URL is invalid.
    pub fn new(base_url: &str, settings: &ClientSettings) -> Result<Self, CollectorError> {
        Ok(Self {
            client: ServiceClient::new(base_url, settings)?,
        })
    }

    /// Daily trending list; the window does not apply to trending.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError`] on transport failure or a malformed body.
    pub async fn fetch_trending(&self) -> Result<Vec<CollectedRecord>, CollectorError> {
        let response: TrendingResponse = self
            .client
            .get_json(
                "trending",
                &[
                    ("since", "daily".to_string()),
                    ("limit", TRENDING_LIMIT.to_string()),
                ],
            )
            .await?;
        Ok(response
            .repositories
            .into_iter()
            .filter_map(|r| r.into_record().map(CollectedRecord::Repository))
            .collect())
    }

    /// # Errors
    ///
    /// Returns [`CollectorError`] on transport failure or a malformed body.
    pub async fn fetch_signals(&self, days_back: u32) -> Result<Vec<CollectedRecord>, CollectorError> {
        let response: SignalsResponse = self
            .client
            .get_json(
                "signals",
                &[
                    ("days", days_back.to_string()),
                    ("keywords", SIGNAL_KEYWORDS.to_string()),
                ],
            )
            .await?;
        Ok(response
            .signals
            .into_iter()
            .filter_map(|s| s.into_record().map(CollectedRecord::RepoSignal))
            .collect())
    }
}

#[async_trait]
impl SourceCollector for GithubCollector {
    fn name(&self) -> &str {
        "github"
    }

    async fn collect(&self, days_back: u32) -> Result<Vec<CollectedRecord>, SourceError> {
        let (trending, signals) =
            tokio::join!(self.fetch_trending(), self.fetch_signals(days_back));
        merge_halves(self.name(), ("trending", trending), ("signals", signals))
    }
}
