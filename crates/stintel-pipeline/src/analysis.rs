//! Analyze stage: turn enriched records into trends, competitor moves and
//! opportunities via the text-completion capability.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{Duration, Utc};
use stintel_core::{
    AnalysisLimits, AnalysisPayload, CollectedRecord, CompletionRequest, NewAnalysis,
    PersistenceGateway, RecentQuery, RecordKind, StageStatus, StoredRecord, TextCompletion,
};

use crate::extract::{extract_json_object, normalize_payload};

pub const ANALYSIS_TYPE: &str = "comprehensive";
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 4000;
const SUMMARY_ITEMS: usize = 10;

const PROMPT_TEMPLATE: &str = r#"You are a startup intelligence analyst with expertise in technology trends, startup ecosystems, and venture capital.

Analyze the following startup signals (news articles, funding events, launches, GitHub activity) and identify patterns, trends, and opportunities.

1. Cluster trends: group related items into thematic clusters, note emerging sectors and early signals.
2. Identify competitor moves: strategic shifts, M&A activity, notable launches and rounds.
3. Extract opportunities for founders: market gaps, partnerships, underserved segments.
4. Extract opportunities for investors: hot sectors, early traction, timing indicators.

Input data:
{data_summary}

Respond with valid JSON only, in this shape:
{
  "trends": [{"title": "", "description": "", "signals": [""], "confidence": "high|medium|low", "sector": "", "evidence": [""]}],
  "competitor_moves": [{"company": "", "move_type": "funding|acquisition|launch|pivot", "description": "", "significance": "", "date": "YYYY-MM-DD"}],
  "opportunities_for_founders": [{"title": "", "description": "", "reasoning": "", "market_size_indicator": "small|medium|large", "urgency": "low|medium|high", "category": "market_gap|partnership|trend|segment"}],
  "opportunities_for_investors": [{"title": "", "description": "", "reasoning": "", "sector": "", "stage_preference": "early|growth|later", "risk_level": "low|medium|high", "potential_return": "low|medium|high"}]
}"#;

/// Records read for one analysis pass.
#[derive(Debug, Clone, Default)]
pub struct AnalysisInput {
    pub news: Vec<StoredRecord>,
    pub funding: Vec<StoredRecord>,
    pub launches: Vec<StoredRecord>,
    pub repositories: Vec<StoredRecord>,
    pub signals: Vec<StoredRecord>,
}

impl AnalysisInput {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.news.is_empty()
            && self.funding.is_empty()
            && self.launches.is_empty()
            && self.repositories.is_empty()
            && self.signals.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub payload: AnalysisPayload,
    pub analysis_id: Option<i64>,
    pub status: StageStatus,
    pub detail: Option<String>,
}

impl AnalysisOutcome {
    fn degraded(detail: impl Into<String>) -> Self {
        Self {
            payload: AnalysisPayload::default(),
            analysis_id: None,
            status: StageStatus::Degraded,
            detail: Some(detail.into()),
        }
    }
}

/// Markdown-ish digest of the input, ten items per kind.
#[must_use]
pub fn build_data_summary(input: &AnalysisInput) -> String {
    let mut out = String::new();
    let mut section = |title: &str, records: &[StoredRecord], line: &dyn Fn(&CollectedRecord) -> String| {
        if records.is_empty() {
            return;
        }
        let _ = writeln!(out, "\n{title} ({} items):", records.len());
        for r in records.iter().take(SUMMARY_ITEMS) {
            let _ = writeln!(out, "- {}", line(&r.record));
        }
    };

    section("Recent News", &input.news, &|r| match r {
        CollectedRecord::Article(a) => {
            format!("{} ({})", a.title, a.source.as_deref().unwrap_or("unknown"))
        }
        other => other.headline().to_string(),
    });
    section("Recent Funding", &input.funding, &|r| match r {
        CollectedRecord::FundingRound(f) => format!(
            "{}: {} ({})",
            f.company,
            f.amount.as_deref().unwrap_or("N/A"),
            f.round_type.as_deref().unwrap_or("N/A")
        ),
        other => other.headline().to_string(),
    });
    section("Recent Launches", &input.launches, &|r| match r {
        CollectedRecord::Launch(l) => format!(
            "{} ({})",
            l.name,
            l.topics.first().map_or("N/A", String::as_str)
        ),
        other => other.headline().to_string(),
    });
    section("Trending GitHub Repos", &input.repositories, &|r| match r {
        CollectedRecord::Repository(repo) => format!(
            "{}: {} stars ({})",
            repo.full_name,
            repo.stars.unwrap_or(0),
            repo.language.as_deref().unwrap_or("N/A")
        ),
        other => other.headline().to_string(),
    });
    section("Technical Signals", &input.signals, &|r| match r {
        CollectedRecord::RepoSignal(s) => format!("{}: {}", s.signal_type, s.indicator),
        other => other.headline().to_string(),
    });
    out
}

#[must_use]
pub fn build_prompt(input: &AnalysisInput) -> String {
    PROMPT_TEMPLATE.replace("{data_summary}", &build_data_summary(input))
}

pub struct Analyzer {
    gateway: Arc<dyn PersistenceGateway>,
    completion: Option<Arc<dyn TextCompletion>>,
    limits: AnalysisLimits,
}

impl Analyzer {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        completion: Option<Arc<dyn TextCompletion>>,
    ) -> Self {
        Self {
            gateway,
            completion,
            limits: AnalysisLimits::default(),
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: AnalysisLimits) -> Self {
        self.limits = limits;
        self
    }

    async fn read(&self, kind: RecordKind, query: RecentQuery, failures: &mut Vec<String>) -> Vec<StoredRecord> {
        match self.gateway.query_recent(kind, query).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(kind = %kind, error = %e, "analyze: read failed");
                failures.push(format!("{kind}: {e}"));
                Vec::new()
            }
        }
    }

    /// Read the enriched window for every kind.
    pub async fn load_input(&self, days_back: u32) -> (AnalysisInput, Vec<String>) {
        let mut failures = Vec::new();
        let enriched = |limit| RecentQuery::days(days_back).enriched(true).limit(limit);
        let input = AnalysisInput {
            news: self.read(RecordKind::Article, enriched(100), &mut failures).await,
            funding: self.read(RecordKind::FundingRound, enriched(100), &mut failures).await,
            launches: self.read(RecordKind::Launch, enriched(100), &mut failures).await,
            repositories: self.read(RecordKind::Repository, enriched(50), &mut failures).await,
            signals: self
                .read(RecordKind::RepoSignal, RecentQuery::days(days_back).limit(50), &mut failures)
                .await,
        };
        (input, failures)
    }

    pub async fn analyze(&self, days_back: u32) -> AnalysisOutcome {
        let Some(completion) = self.completion.as_deref() else {
            tracing::info!("analyze: no completion provider configured, skipping");
            return AnalysisOutcome::degraded("completion not configured");
        };

        let (input, read_failures) = self.load_input(days_back).await;
        let prompt = build_prompt(&input);

        let text = match completion
            .complete(&CompletionRequest::new(prompt, TEMPERATURE, MAX_TOKENS))
            .await
        {
            Ok(text) => text,
            Err(e) if e.is_not_configured() => {
                tracing::info!(error = %e, "analyze: completion not configured");
                return AnalysisOutcome::degraded(e.to_string());
            }
            Err(e) => {
                tracing::warn!(error = %e, "analyze: completion failed");
                return AnalysisOutcome::degraded(e.to_string());
            }
        };

        let now = Utc::now();
        let mut problems = read_failures;
        let payload = match extract_json_object(&text) {
            Ok(value) => normalize_payload(&value, self.limits, now),
            Err(e) => {
                tracing::warn!(error = %e, "analyze: model output not usable, using empty analysis");
                problems.push(format!("extraction: {e}"));
                AnalysisPayload::default()
            }
        };

        let record = NewAnalysis {
            analysis_type: ANALYSIS_TYPE.to_string(),
            period_start: now - Duration::days(i64::from(days_back)),
            period_end: now,
            payload: payload.clone(),
            model_used: Some(completion.model().to_string()),
        };
        let analysis_id = match self.gateway.save_analysis(&record).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = %e, "analyze: failed to save analysis");
                problems.push(format!("save: {e}"));
                None
            }
        };

        tracing::info!(
            trends = payload.trends.len(),
            competitor_moves = payload.competitor_moves.len(),
            founder_opportunities = payload.opportunities_for_founders.len(),
            investor_opportunities = payload.opportunities_for_investors.len(),
            "analyze: finished"
        );

        AnalysisOutcome {
            payload,
            analysis_id,
            status: if problems.is_empty() {
                StageStatus::Ok
            } else {
                StageStatus::Degraded
            },
            detail: (!problems.is_empty()).then(|| problems.join("; ")),
        }
    }
}
