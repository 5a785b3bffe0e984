use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisItem;

/// The published daily digest, unique per calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Briefing {
    pub briefing_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub data_period: DataPeriod,
    pub summary: String,
    pub trends: Vec<BriefingTrend>,
    pub funding_rounds: Vec<BriefingFunding>,
    pub product_launches: Vec<BriefingLaunch>,
    pub competitor_moves: Vec<AnalysisItem>,
    pub opportunities_for_founders: Vec<AnalysisItem>,
    pub opportunities_for_investors: Vec<AnalysisItem>,
    pub intelligence_threads: Vec<IntelligenceThread>,
    pub statistics: BriefingStatistics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefingTrend {
    pub title: String,
    pub description: String,
    pub confidence: f64,
    pub evidence: Vec<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefingFunding {
    pub company: String,
    pub amount: Option<String>,
    pub round_type: Option<String>,
    pub investors: Vec<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefingLaunch {
    pub name: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub votes: Option<i64>,
}

/// A high-confidence trend joined with the articles that mention it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelligenceThread {
    pub id: String,
    pub title: String,
    pub description: String,
    pub confidence: f64,
    pub related_articles: Vec<ThreadArticle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadArticle {
    pub title: String,
    pub url: String,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BriefingStatistics {
    pub news_articles: usize,
    pub funding_rounds: usize,
    pub product_launches: usize,
    pub repositories: usize,
    pub trends_identified: usize,
    pub opportunities_identified: usize,
}
