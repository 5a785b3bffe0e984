use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::records::CollectedRecord;

/// Why a source produced no records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("source not configured: {0}")]
    NotConfigured(String),

    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("malformed source response: {0}")]
    Malformed(String),

    #[error("source timed out after {0:?}")]
    TimedOut(Duration),

    #[error("source task aborted: {0}")]
    Aborted(String),
}

/// One external provider of raw records.
#[async_trait]
pub trait SourceCollector: Send + Sync {
    /// Stable slot name used in run reports (`news`, `startup`, `github`).
    fn name(&self) -> &str;

    async fn collect(&self, days_back: u32) -> Result<Vec<CollectedRecord>, SourceError>;
}
