//! Summarize stage: assemble the daily [`Briefing`] from the analysis and
//! the most recent stored records.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use stintel_core::{
    AnalysisItem, AnalysisPayload, Briefing, BriefingFunding, BriefingLaunch, BriefingStatistics,
    BriefingTrend, CollectedRecord, CompletionRequest, DataPeriod, IntelligenceThread,
    PersistenceGateway, RecentQuery, RecordKind, StageStatus, StoredRecord, TextCompletion,
    ThreadArticle,
};

const TEMPERATURE: f32 = 0.8;
const MAX_TOKENS: u32 = 500;
const TOP_FUNDING: usize = 15;
const TOP_LAUNCHES: usize = 15;
const TOP_ANALYSIS_ITEMS: usize = 10;
const TOP_THREADS: usize = 5;
const MAX_EVIDENCE: usize = 5;
const MAX_RELATED_ARTICLES: usize = 5;
const DEFAULT_CONFIDENCE: f64 = 0.6;

const PROMPT_TEMPLATE: &str = "You are a startup intelligence analyst creating a daily briefing summary.

Based on the analysis results below, create a concise executive summary (2-3 paragraphs) that highlights:
1. The most significant trends and developments
2. Key funding activity and notable rounds
3. Important product launches
4. Top opportunities for founders and investors

Analysis results:
{analysis_results}

Provide a well-structured summary that captures the essence of today's startup intelligence. Make it engaging and actionable.";

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryOutcome {
    pub briefing: Briefing,
    pub status: StageStatus,
    pub detail: Option<String>,
}

/// Deterministic summary used when no model text is available.
#[must_use]
pub fn fallback_summary(analysis: &AnalysisPayload) -> String {
    format!(
        "Today's startup intelligence reveals {} key trends across the ecosystem. \
         We've identified {} significant market moves and {} actionable opportunities. \
         Key areas of interest include emerging technologies, strategic funding rounds, and market gaps.",
        analysis.trends.len(),
        analysis.competitor_moves.len(),
        analysis.opportunities_for_founders.len()
    )
}

/// Parse amounts like `$1.5M`, `2B`, `750k` or `1,200,000`; anything
/// unparseable sorts as zero.
#[must_use]
pub fn parse_funding_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' ' | '€' | '£'))
        .collect();
    let upper = cleaned.to_uppercase();
    let (number, multiplier) = if let Some(n) = upper.strip_suffix('B') {
        (n, 1_000_000_000.0)
    } else if let Some(n) = upper.strip_suffix('M') {
        (n, 1_000_000.0)
    } else if let Some(n) = upper.strip_suffix('K') {
        (n, 1_000.0)
    } else {
        (upper.as_str(), 1.0)
    };
    number.parse::<f64>().map_or(0.0, |v| v * multiplier)
}

fn item_str<'a>(item: &'a AnalysisItem, key: &str) -> Option<&'a str> {
    item.get(key).and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

fn item_strings(item: &AnalysisItem, key: &str) -> Vec<String> {
    item.get(key)
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// `high|medium|low` labels or a numeric value in `[0, 1]`.
fn confidence_of(item: &AnalysisItem) -> f64 {
    match item.get("confidence") {
        Some(Value::Number(n)) => n.as_f64().map_or(DEFAULT_CONFIDENCE, |v| v.clamp(0.0, 1.0)),
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "high" => 0.9,
            "low" => 0.3,
            other => other.parse::<f64>().map_or(DEFAULT_CONFIDENCE, |v| v.clamp(0.0, 1.0)),
        },
        _ => DEFAULT_CONFIDENCE,
    }
}

#[must_use]
pub fn format_trends(trends: &[AnalysisItem]) -> Vec<BriefingTrend> {
    trends
        .iter()
        .map(|t| {
            let mut evidence = item_strings(t, "evidence");
            evidence.truncate(MAX_EVIDENCE);
            BriefingTrend {
                title: item_str(t, "title").unwrap_or("Unnamed Trend").to_string(),
                description: item_str(t, "description").unwrap_or_default().to_string(),
                confidence: confidence_of(t),
                evidence,
                category: item_str(t, "sector")
                    .or_else(|| item_str(t, "category"))
                    .map(str::to_string),
            }
        })
        .collect()
}

#[must_use]
pub fn format_funding(records: &[StoredRecord]) -> Vec<BriefingFunding> {
    let mut rounds: Vec<(f64, BriefingFunding)> = records
        .iter()
        .filter_map(|r| match &r.record {
            CollectedRecord::FundingRound(f) => Some((
                f.amount.as_deref().map_or(0.0, parse_funding_amount),
                BriefingFunding {
                    company: f.company.clone(),
                    amount: f.amount.clone(),
                    round_type: f.round_type.clone(),
                    investors: f.investors.clone(),
                    link: f.link.clone(),
                },
            )),
            _ => None,
        })
        .collect();
    rounds.sort_by(|a, b| b.0.total_cmp(&a.0));
    rounds
        .into_iter()
        .take(TOP_FUNDING)
        .map(|(_, f)| f)
        .collect()
}

#[must_use]
pub fn format_launches(records: &[StoredRecord]) -> Vec<BriefingLaunch> {
    records
        .iter()
        .filter_map(|r| match &r.record {
            CollectedRecord::Launch(l) => Some(BriefingLaunch {
                name: l.name.clone(),
                description: l.description.clone().or_else(|| l.tagline.clone()),
                link: l.link.clone(),
                votes: l.votes,
            }),
            _ => None,
        })
        .take(TOP_LAUNCHES)
        .collect()
}

fn thread_id(title: &str) -> String {
    format!("trend_{}", title.trim().to_lowercase().replace(' ', "_"))
}

/// Top trends by confidence, each joined with articles mentioning its
/// signal keywords (or title words when the trend lists no signals).
#[must_use]
pub fn build_threads(trends: &[AnalysisItem], news: &[StoredRecord]) -> Vec<IntelligenceThread> {
    let mut ranked: Vec<&AnalysisItem> = trends.iter().collect();
    ranked.sort_by(|a, b| confidence_of(b).total_cmp(&confidence_of(a)));

    ranked
        .into_iter()
        .take(TOP_THREADS)
        .map(|trend| {
            let title = item_str(trend, "title").unwrap_or("Unknown Trend");
            let mut keywords: Vec<String> = item_strings(trend, "signals")
                .into_iter()
                .map(|k| k.to_lowercase())
                .filter(|k| !k.trim().is_empty())
                .collect();
            if keywords.is_empty() {
                keywords = title
                    .split_whitespace()
                    .filter(|w| w.len() > 3)
                    .map(str::to_lowercase)
                    .collect();
            }

            let related_articles = news
                .iter()
                .filter_map(|r| match &r.record {
                    CollectedRecord::Article(a) => {
                        let haystack = format!(
                            "{} {}",
                            a.title.to_lowercase(),
                            a.summary.as_deref().unwrap_or_default().to_lowercase()
                        );
                        keywords
                            .iter()
                            .any(|k| haystack.contains(k.as_str()))
                            .then(|| ThreadArticle {
                                title: a.title.clone(),
                                url: a.url.clone(),
                                source: a.source.clone(),
                            })
                    }
                    _ => None,
                })
                .take(MAX_RELATED_ARTICLES)
                .collect();

            IntelligenceThread {
                id: thread_id(title),
                title: title.to_string(),
                description: item_str(trend, "description").unwrap_or_default().to_string(),
                confidence: confidence_of(trend),
                related_articles,
            }
        })
        .collect()
}

fn top_items(items: &[AnalysisItem]) -> Vec<AnalysisItem> {
    items.iter().take(TOP_ANALYSIS_ITEMS).cloned().collect()
}

pub struct Summarizer {
    gateway: Arc<dyn PersistenceGateway>,
    completion: Option<Arc<dyn TextCompletion>>,
}

impl Summarizer {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        completion: Option<Arc<dyn TextCompletion>>,
    ) -> Self {
        Self {
            gateway,
            completion,
        }
    }

    async fn recent(&self, kind: RecordKind, days_back: u32, limit: u32, problems: &mut Vec<String>) -> Vec<StoredRecord> {
        match self
            .gateway
            .query_recent(kind, RecentQuery::days(days_back).limit(limit))
            .await
        {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(kind = %kind, error = %e, "summarize: read failed");
                problems.push(format!("{kind}: {e}"));
                Vec::new()
            }
        }
    }

    /// Model summary, or the fallback template with the reason it was used.
    async fn summary_text(&self, analysis: &AnalysisPayload) -> (String, Option<String>) {
        let Some(completion) = self.completion.as_deref() else {
            return (fallback_summary(analysis), Some("completion not configured".into()));
        };
        let rendered = serde_json::to_string_pretty(analysis).unwrap_or_default();
        let prompt = PROMPT_TEMPLATE.replace("{analysis_results}", &rendered);
        match completion
            .complete(&CompletionRequest::new(prompt, TEMPERATURE, MAX_TOKENS))
            .await
        {
            Ok(text) if !text.trim().is_empty() => (text.trim().to_string(), None),
            Ok(_) => (fallback_summary(analysis), Some("empty model summary".into())),
            Err(e) => {
                tracing::warn!(error = %e, "summarize: using fallback summary");
                (fallback_summary(analysis), Some(e.to_string()))
            }
        }
    }

    pub async fn summarize(
        &self,
        analysis: &AnalysisPayload,
        days_back: u32,
        now: DateTime<Utc>,
    ) -> SummaryOutcome {
        let mut problems = Vec::new();
        let news = self.recent(RecordKind::Article, days_back, 50, &mut problems).await;
        let funding = self.recent(RecordKind::FundingRound, days_back, 50, &mut problems).await;
        let launches = self.recent(RecordKind::Launch, days_back, 50, &mut problems).await;
        let repositories = self.recent(RecordKind::Repository, days_back, 30, &mut problems).await;

        let (summary, fallback_reason) = self.summary_text(analysis).await;
        if let Some(reason) = fallback_reason {
            problems.push(format!("summary fallback: {reason}"));
        }

        let briefing = Briefing {
            briefing_date: now.date_naive(),
            generated_at: now,
            data_period: DataPeriod {
                start: now - Duration::days(i64::from(days_back)),
                end: now,
                days: days_back,
            },
            summary,
            trends: format_trends(&analysis.trends),
            funding_rounds: format_funding(&funding),
            product_launches: format_launches(&launches),
            competitor_moves: top_items(&analysis.competitor_moves),
            opportunities_for_founders: top_items(&analysis.opportunities_for_founders),
            opportunities_for_investors: top_items(&analysis.opportunities_for_investors),
            intelligence_threads: build_threads(&analysis.trends, &news),
            statistics: BriefingStatistics {
                news_articles: news.len(),
                funding_rounds: funding.len(),
                product_launches: launches.len(),
                repositories: repositories.len(),
                trends_identified: analysis.trends.len(),
                opportunities_identified: analysis.opportunity_count(),
            },
        };

        SummaryOutcome {
            briefing,
            status: if problems.is_empty() {
                StageStatus::Ok
            } else {
                StageStatus::Degraded
            },
            detail: (!problems.is_empty()).then(|| problems.join("; ")),
        }
    }
}

#[cfg(test)]
#[path = "summarizer_test.rs"]
mod tests;
