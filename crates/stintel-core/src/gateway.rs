//! Storage interface consumed by the pipeline.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::analysis::{AnalysisRecord, NewAnalysis};
use crate::briefing::Briefing;
use crate::records::{CollectedRecord, Enrichment, RecordKind, StoredRecord};
use crate::workflow::{NewWorkflowRun, RunReport, WorkflowRunRecord};

pub const MAX_DAYS: u32 = 365;
pub const MAX_LIMIT: u32 = 10_000;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl GatewayError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        GatewayError::Backend(Box::new(err))
    }
}

/// Validate a look-back window in days.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidArgument`] unless `1 <= days <= 365`.
pub fn validate_days(days: u32) -> Result<u32, GatewayError> {
    if (1..=MAX_DAYS).contains(&days) {
        Ok(days)
    } else {
        Err(GatewayError::InvalidArgument(format!(
            "days must be between 1 and {MAX_DAYS}, got {days}"
        )))
    }
}

/// Validate a result limit.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidArgument`] unless `1 <= limit <= 10000`.
pub fn validate_limit(limit: u32) -> Result<u32, GatewayError> {
    if (1..=MAX_LIMIT).contains(&limit) {
        Ok(limit)
    } else {
        Err(GatewayError::InvalidArgument(format!(
            "limit must be between 1 and {MAX_LIMIT}, got {limit}"
        )))
    }
}

/// Filter for [`PersistenceGateway::query_recent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecentQuery {
    pub days: u32,
    pub enriched: Option<bool>,
    pub limit: Option<u32>,
}

impl RecentQuery {
    #[must_use]
    pub fn days(days: u32) -> Self {
        Self {
            days,
            enriched: None,
            limit: None,
        }
    }

    #[must_use]
    pub fn enriched(mut self, enriched: bool) -> Self {
        self.enriched = Some(enriched);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidArgument`] when the window or limit is out of range.
    pub fn validate(&self) -> Result<(), GatewayError> {
        validate_days(self.days)?;
        if let Some(limit) = self.limit {
            validate_limit(limit)?;
        }
        Ok(())
    }
}

#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Insert records of one kind, skipping existing dedup keys.
    ///
    /// Returns the number of rows actually inserted.
    async fn upsert_records(
        &self,
        kind: RecordKind,
        records: &[CollectedRecord],
    ) -> Result<u64, GatewayError>;

    /// Most recent records first, filtered by `occurred_at` within the window.
    async fn query_recent(
        &self,
        kind: RecordKind,
        query: RecentQuery,
    ) -> Result<Vec<StoredRecord>, GatewayError>;

    async fn count_recent(
        &self,
        kind: RecordKind,
        days: u32,
        enriched: Option<bool>,
    ) -> Result<u64, GatewayError>;

    /// Attach enrichment to an unenriched record. Returns `false` if the
    /// record was already enriched or does not exist.
    async fn apply_enrichment(
        &self,
        kind: RecordKind,
        id: i64,
        enrichment: &Enrichment,
    ) -> Result<bool, GatewayError>;

    async fn save_analysis(&self, analysis: &NewAnalysis) -> Result<i64, GatewayError>;

    async fn latest_analysis(&self) -> Result<Option<AnalysisRecord>, GatewayError>;

    /// Insert or replace the briefing for `briefing.briefing_date`.
    async fn save_briefing(&self, briefing: &Briefing) -> Result<(), GatewayError>;

    async fn latest_briefing(&self) -> Result<Option<Briefing>, GatewayError>;

    async fn briefing_by_date(&self, date: NaiveDate) -> Result<Option<Briefing>, GatewayError>;

    async fn record_run_started(&self, run: &NewWorkflowRun) -> Result<i64, GatewayError>;

    async fn record_run_finished(&self, id: i64, report: &RunReport) -> Result<(), GatewayError>;

    async fn list_runs(&self, limit: u32) -> Result<Vec<WorkflowRunRecord>, GatewayError>;

    async fn ping(&self) -> Result<(), GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn days_bounds() {
        assert!(validate_days(0).is_err());
        assert_eq!(validate_days(1).unwrap(), 1);
        assert_eq!(validate_days(365).unwrap(), 365);
        assert!(matches!(
            validate_days(366),
            Err(GatewayError::InvalidArgument(_))
        ));
    }

    #[test]
    fn limit_bounds() {
        assert!(validate_limit(0).is_err());
        assert_eq!(validate_limit(10_000).unwrap(), 10_000);
        assert!(validate_limit(10_001).is_err());
    }

    #[test]
    fn query_validation_checks_both_fields() {
        assert!(RecentQuery::days(7).limit(100).validate().is_ok());
        assert!(RecentQuery::days(7).validate().is_ok());
        assert!(RecentQuery::days(400).validate().is_err());
        assert!(RecentQuery::days(7).limit(0).validate().is_err());
    }
}
