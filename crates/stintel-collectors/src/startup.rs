use async_trait::async_trait;
use stintel_core::{CollectedRecord, SourceCollector, SourceError};

use crate::client::{ClientSettings, ServiceClient};
use crate::error::CollectorError;
use crate::wire::{FundingResponse, LaunchResponse};

/// Funding announcements and product launches from the startup tracker.
///
/// Both endpoints are queried concurrently. If only one fails, its error is
/// logged and the other's records are returned; if both fail, the funding
/// error is surfaced.
#[derive(Debug, Clone)]
pub struct StartupCollector {
    client: ServiceClient,
}

impl StartupCollector {
    /// # Errors
    ///
    /// Returns [`CollectorError`] if the HTTP client cannot be built or the
    /// base URL is invalid.
    pub fn new(base_url: &str, settings: &ClientSettings) -> Result<Self, CollectorError> {
        Ok(Self {
            client: ServiceClient::new(base_url, settings)?,
        })
    }

    /// # Errors
    ///
    /// Returns [`CollectorError`] on transport failure or a malformed body.
    pub async fn fetch_funding(&self, days_back: u32) -> Result<Vec<CollectedRecord>, CollectorError> {
        let response: FundingResponse = self
            .client
            .get_json("funding", &[("days", days_back.to_string())])
            .await?;
        Ok(response
            .funding_rounds
            .into_iter()
            .filter_map(|f| f.into_record().map(CollectedRecord::FundingRound))
            .collect())
    }

    /// # Errors
    ///
    /// Returns [`CollectorError`] on transport failure or a malformed body.
    pub async fn fetch_launches(&self, days_back: u32) -> Result<Vec<CollectedRecord>, CollectorError> {
        let response: LaunchResponse = self
            .client
            .get_json("launches", &[("days", days_back.to_string())])
            .await?;
        Ok(response
            .launches
            .into_iter()
            .filter_map(|l| l.into_record().map(CollectedRecord::Launch))
            .collect())
    }
}

#[async_trait]
impl SourceCollector for StartupCollector {
    fn name(&self) -> &str {
        "startup"
    }

    async fn collect(&self, days_back: u32) -> Result<Vec<CollectedRecord>, SourceError> {
        let (funding, launches) =
            tokio::join!(self.fetch_funding(days_back), self.fetch_launches(days_back));
        merge_halves(self.name(), ("funding", funding), ("launches", launches))
    }
}

/// Combine the two halves of a two-endpoint source.
pub(crate) fn merge_halves(
    source: &str,
    (first_name, first): (&str, Result<Vec<CollectedRecord>, CollectorError>),
    (second_name, second): (&str, Result<Vec<CollectedRecord>, CollectorError>),
) -> Result<Vec<CollectedRecord>, SourceError> {
    match (first, second) {
        (Ok(mut a), Ok(b)) => {
            a.extend(b);
            Ok(a)
        }
        (Ok(a), Err(e)) => {
            tracing::warn!(source, endpoint = second_name, error = %e, "partial collection failure");
            Ok(a)
        }
        (Err(e), Ok(b)) => {
            tracing::warn!(source, endpoint = first_name, error = %e, "partial collection failure");
            Ok(b)
        }
        (Err(e1), Err(e2)) => {
            tracing::warn!(source, endpoint = second_name, error = %e2, "collection failure");
            Err(e1.into())
        }
    }
}
