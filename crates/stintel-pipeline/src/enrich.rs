//! Enrichment stage: derive keywords, category, sentiment and friends for
//! freshly stored records.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use stintel_core::{
    CollectedRecord, CompletionRequest, Enrichment, RecordKind, StoredRecord, TextCompletion,
};

use crate::extract::extract_json_object;
use crate::lexicon::{
    all_matches, first_match, lexicon_score, normalized, CATEGORIES, INDUSTRIES, STAGES,
    STOPWORDS, TECHNOLOGIES,
};

const MAX_KEYWORDS: usize = 8;
const CATEGORIZE_BATCH: usize = 20;
const CATEGORIZE_TEMPERATURE: f32 = 0.3;
const CATEGORIZE_MAX_TOKENS: u32 = 1000;

/// Result of enriching one batch of records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentBatch {
    pub updates: Vec<(i64, Enrichment)>,
    /// Set when an optional step fell back (e.g. model categorization failed).
    pub degraded: Option<String>,
}

/// Computes enrichment for stored records of one kind.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, kind: RecordKind, records: &[StoredRecord]) -> EnrichmentBatch;
}

/// Deterministic heuristics, optionally refined by a model for article categories.
#[derive(Clone, Default)]
pub struct RecordEnricher {
    completion: Option<Arc<dyn TextCompletion>>,
}

impl std::fmt::Debug for RecordEnricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordEnricher")
            .field("completion", &self.completion.as_ref().map(|c| c.model().to_string()))
            .finish()
    }
}

impl RecordEnricher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_completion(completion: Arc<dyn TextCompletion>) -> Self {
        Self {
            completion: Some(completion),
        }
    }

    /// Ask the model to categorize the newest articles in one call. Returns
    /// `id -> category` for every id the model answered for.
    async fn categorize_articles(
        &self,
        completion: &dyn TextCompletion,
        records: &[StoredRecord],
    ) -> Result<HashMap<i64, String>, String> {
        let mut newest: Vec<&StoredRecord> = records.iter().collect();
        newest.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        newest.truncate(CATEGORIZE_BATCH);
        if newest.is_empty() {
            return Ok(HashMap::new());
        }

        let listing: String = newest
            .iter()
            .map(|r| format!("{}: {}\n", r.id, r.record.headline()))
            .collect();
        let allowed: Vec<&str> = CATEGORIES.iter().map(|(name, _)| *name).collect();
        let prompt = format!(
            "Categorize each startup news headline below. Allowed categories: {}, general.\n\
             Respond with JSON only, shaped as {{\"categories\": {{\"<id>\": \"<category>\"}}}}.\n\n{listing}",
            allowed.join(", ")
        );

        let text = completion
            .complete(&CompletionRequest::new(
                prompt,
                CATEGORIZE_TEMPERATURE,
                CATEGORIZE_MAX_TOKENS,
            ))
            .await
            .map_err(|e| e.to_string())?;
        let value = extract_json_object(&text).map_err(|e| e.to_string())?;
        let Some(Value::Object(categories)) = value.get("categories") else {
            return Err("model response has no `categories` object".to_string());
        };

        Ok(categories
            .iter()
            .filter_map(|(id, category)| {
                let id = id.trim().parse::<i64>().ok()?;
                let category = category.as_str()?.trim().to_lowercase();
                (!category.is_empty()).then_some((id, category))
            })
            .collect())
    }
}

#[async_trait]
impl Enricher for RecordEnricher {
    async fn enrich(&self, kind: RecordKind, records: &[StoredRecord]) -> EnrichmentBatch {
        let now = Utc::now();
        let mut updates: Vec<(i64, Enrichment)> = records
            .iter()
            .map(|r| (r.id, heuristic_enrichment(&r.record, now)))
            .collect();

        let mut degraded = None;
        if kind == RecordKind::Article {
            if let Some(completion) = self.completion.as_deref() {
                match self.categorize_articles(completion, records).await {
                    Ok(categories) => {
                        for (id, enrichment) in &mut updates {
                            if let Some(category) = categories.get(id) {
                                enrichment.category = Some(category.clone());
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "enrich: model categorization failed, using heuristics");
                        degraded = Some(format!("categorization fallback: {e}"));
                    }
                }
            }
        }

        EnrichmentBatch { updates, degraded }
    }
}

/// Most frequent non-stopword tokens, ties broken alphabetically.
fn extract_keywords(text: &str) -> Vec<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for token in text.split(|c: char| !c.is_alphanumeric()) {
        let token = token.to_lowercase();
        if token.chars().count() < 4
            || token.chars().all(|c| c.is_ascii_digit())
            || STOPWORDS.contains(&token.as_str())
        {
            continue;
        }
        *counts.entry(token).or_default() += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(MAX_KEYWORDS)
        .map(|(word, _)| word)
        .collect()
}

/// Star momentum mapped to `[0, 1]`: 60 % from stars gained today (saturating
/// at 100), 40 % from total stars on a log scale (saturating at 100k).
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn repository_activity(stars: Option<i64>, stars_today: Option<i64>) -> f32 {
    let today = (stars_today.unwrap_or(0).max(0) as f64 / 100.0).min(1.0);
    let total = ((stars.unwrap_or(0).max(0) as f64 + 1.0).log10() / 5.0).min(1.0);
    (today * 0.6 + total * 0.4).clamp(0.0, 1.0) as f32
}

/// Deterministic enrichment of a single record.
#[must_use]
pub fn heuristic_enrichment(record: &CollectedRecord, now: DateTime<Utc>) -> Enrichment {
    let text = record.text();
    let norm = normalized(&text);

    let category = match record {
        CollectedRecord::FundingRound(_) => Some("funding"),
        CollectedRecord::Launch(_) => Some("product_launch"),
        CollectedRecord::Repository(_) | CollectedRecord::RepoSignal(_) => Some("open_source"),
        CollectedRecord::Article(_) => first_match(&norm, CATEGORIES).or(Some("general")),
    };

    let stage = match record {
        CollectedRecord::FundingRound(f) => f
            .round_type
            .as_deref()
            .and_then(|r| first_match(&normalized(r), STAGES))
            .or_else(|| first_match(&norm, STAGES)),
        CollectedRecord::Article(_) | CollectedRecord::Launch(_) => first_match(&norm, STAGES),
        CollectedRecord::Repository(_) | CollectedRecord::RepoSignal(_) => None,
    };

    let mut technologies = all_matches(&norm, TECHNOLOGIES);
    if let CollectedRecord::Repository(r) = record {
        if let Some(lang) = r.language.as_deref() {
            let lang = lang.to_lowercase();
            if !technologies.contains(&lang) {
                technologies.push(lang);
            }
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    let activity_score = match record {
        CollectedRecord::Repository(r) => Some(repository_activity(r.stars, r.stars_today)),
        CollectedRecord::RepoSignal(s) => s.strength.map(|v| v.clamp(0.0, 1.0) as f32),
        _ => None,
    };

    Enrichment {
        keywords: extract_keywords(&text),
        category: category.map(str::to_string),
        sentiment: Some(lexicon_score(&text)),
        industry: first_match(&norm, INDUSTRIES).map(str::to_string),
        stage: stage.map(str::to_string),
        technologies,
        activity_score,
        enriched_at: Some(now),
    }
}
