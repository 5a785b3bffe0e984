use async_trait::async_trait;
use stintel_core::{CollectedRecord, SourceCollector, SourceError};

use crate::client::{ClientSettings, ServiceClient};
use crate::error::CollectorError;
use crate::wire::NewsResponse;

/// Per-source article cap requested from the news aggregator.
const ARTICLES_PER_SOURCE: u32 = 20;

/// Aggregated tech-news headlines.
#[derive(Debug, Clone)]
pub struct NewsCollector {
    client: ServiceClient,
}

impl NewsCollector {
    /// # Errors
    ///
    /// Returns [`CollectorError`] if the HTTP client cannot be built or the
    /// base URL is invalid.
    pub fn new(base_url: &str, settings: &ClientSettings) -> Result<Self, CollectorError> {
        Ok(Self {
            client: ServiceClient::new(base_url, settings)?,
        })
    }

    /// Fetch and flatten articles from the last `days_back` days.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError`] on transport failure or a malformed body.
    pub async fn fetch_articles(&self, days_back: u32) -> Result<Vec<CollectedRecord>, CollectorError> {
        let hours = days_back.saturating_mul(24);
        let response: NewsResponse = self
            .client
            .get_json(
                "all",
                &[
                    ("limit", ARTICLES_PER_SOURCE.to_string()),
                    ("hours", hours.to_string()),
                ],
            )
            .await?;
        Ok(response
            .into_articles()
            .into_iter()
            .map(CollectedRecord::Article)
            .collect())
    }
}

#[async_trait]
impl SourceCollector for NewsCollector {
    fn name(&self) -> &str {
        "news"
    }

    async fn collect(&self, days_back: u32) -> Result<Vec<CollectedRecord>, SourceError> {
        let records = self.fetch_articles(days_back).await?;
        tracing::debug!(count = records.len(), "news: collected articles");
        Ok(records)
    }
}
