use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single free-form analysis entry (trend, move, or opportunity).
pub type AnalysisItem = serde_json::Map<String, serde_json::Value>;

/// Canonical four-list analysis shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    #[serde(default)]
    pub trends: Vec<AnalysisItem>,
    #[serde(default)]
    pub competitor_moves: Vec<AnalysisItem>,
    #[serde(default)]
    pub opportunities_for_founders: Vec<AnalysisItem>,
    #[serde(default)]
    pub opportunities_for_investors: Vec<AnalysisItem>,
}

impl AnalysisPayload {
    pub const LIST_KEYS: [&'static str; 4] = [
        "trends",
        "competitor_moves",
        "opportunities_for_founders",
        "opportunities_for_investors",
    ];

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trends.is_empty()
            && self.competitor_moves.is_empty()
            && self.opportunities_for_founders.is_empty()
            && self.opportunities_for_investors.is_empty()
    }

    #[must_use]
    pub fn opportunity_count(&self) -> usize {
        self.opportunities_for_founders.len() + self.opportunities_for_investors.len()
    }
}

/// Per-list caps applied when normalizing model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisLimits {
    pub trends: usize,
    pub competitor_moves: usize,
    pub opportunities_for_founders: usize,
    pub opportunities_for_investors: usize,
}

impl Default for AnalysisLimits {
    fn default() -> Self {
        Self {
            trends: 20,
            competitor_moves: 20,
            opportunities_for_founders: 15,
            opportunities_for_investors: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAnalysis {
    pub analysis_type: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub payload: AnalysisPayload,
    pub model_used: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: i64,
    pub analysis_type: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub payload: AnalysisPayload,
    pub model_used: Option<String>,
    pub created_at: DateTime<Utc>,
}
