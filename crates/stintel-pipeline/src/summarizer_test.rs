use async_trait::async_trait;
use serde_json::json;
use stintel_core::{Article, CompletionError, FundingRound, MemoryGateway};

use super::*;

fn item(value: Value) -> AnalysisItem {
    match value {
        Value::Object(map) => map,
        _ => unreachable!("test items are objects"),
    }
}

fn stored(id: i64, record: CollectedRecord) -> StoredRecord {
    let now = Utc::now();
    StoredRecord {
        id,
        record,
        enrichment: None,
        is_enriched: false,
        occurred_at: now,
        created_at: now,
        updated_at: now,
    }
}

fn funding(company: &str, amount: &str) -> StoredRecord {
    stored(
        0,
        CollectedRecord::FundingRound(FundingRound {
            company: company.into(),
            amount: Some(amount.into()),
            round_type: Some("Seed".into()),
            investors: vec![],
            description: None,
            link: None,
            source: None,
            announced_at: None,
        }),
    )
}

fn article(title: &str, url: &str) -> StoredRecord {
    stored(
        0,
        CollectedRecord::Article(Article {
            url: url.into(),
            title: title.into(),
            source: Some("hn".into()),
            summary: None,
            author: None,
            published_at: Some(Utc::now()),
            tags: vec![],
        }),
    )
}

struct Failing;

#[async_trait]
impl TextCompletion for Failing {
    fn model(&self) -> &str {
        "failing"
    }
    async fn complete(&self, _r: &CompletionRequest) -> Result<String, CompletionError> {
        Err(CompletionError::Unavailable("503".into()))
    }
}

struct Echo;

#[async_trait]
impl TextCompletion for Echo {
    fn model(&self) -> &str {
        "echo"
    }
    async fn complete(&self, _r: &CompletionRequest) -> Result<String, CompletionError> {
        Ok("  A busy week for AI infrastructure.  ".into())
    }
}

#[test]
fn funding_amounts_understand_suffixes() {
    assert!((parse_funding_amount("$1.5M") - 1_500_000.0).abs() < f64::EPSILON);
    assert!((parse_funding_amount("2b") - 2_000_000_000.0).abs() < f64::EPSILON);
    assert!((parse_funding_amount("$750K") - 750_000.0).abs() < f64::EPSILON);
    assert!((parse_funding_amount("1,200,000") - 1_200_000.0).abs() < f64::EPSILON);
    assert!(parse_funding_amount("undisclosed").abs() < f64::EPSILON);
    assert!(parse_funding_amount("$1.5M") < parse_funding_amount("$2B"));
}

#[test]
fn funding_is_sorted_by_amount_descending() {
    let records = vec![
        funding("Small", "$500K"),
        funding("Huge", "$2B"),
        funding("Unknown", "undisclosed"),
        funding("Mid", "$1.5M"),
    ];
    let names: Vec<String> = format_funding(&records).into_iter().map(|f| f.company).collect();
    assert_eq!(names, vec!["Huge", "Mid", "Small", "Unknown"]);
}

#[test]
fn trends_map_confidence_and_cap_evidence() {
    let trends = vec![item(json!({
        "title": "AI Agents",
        "confidence": "high",
        "sector": "AI",
        "evidence": ["a", "b", "c", "d", "e", "f", "g"]
    }))];
    let formatted = format_trends(&trends);
    assert!((formatted[0].confidence - 0.9).abs() < f64::EPSILON);
    assert_eq!(formatted[0].evidence.len(), 5);
    assert_eq!(formatted[0].category.as_deref(), Some("AI"));
}

#[test]
fn threads_rank_by_confidence_and_match_articles() {
    let trends = vec![
        item(json!({"title": "Quantum Chips", "confidence": "low", "signals": ["quantum"]})),
        item(json!({"title": "AI Agents", "confidence": "high", "signals": ["agent"]})),
    ];
    let news = vec![
        article("New agent framework ships", "https://a/1"),
        article("Quantum startup raises", "https://a/2"),
        article("Unrelated", "https://a/3"),
    ];
    let threads = build_threads(&trends, &news);
    assert_eq!(threads[0].id, "trend_ai_agents");
    assert_eq!(threads[0].related_articles.len(), 1);
    assert_eq!(threads[0].related_articles[0].url, "https://a/1");
    assert_eq!(threads[1].id, "trend_quantum_chips");
}

#[test]
fn fallback_summary_counts_analysis_lists() {
    let analysis = AnalysisPayload {
        trends: vec![item(json!({"title": "x"})), item(json!({"title": "y"}))],
        competitor_moves: vec![item(json!({"company": "Acme"}))],
        ..AnalysisPayload::default()
    };
    let text = fallback_summary(&analysis);
    assert!(text.starts_with("Today's startup intelligence reveals 2 key trends"));
    assert!(text.contains("1 significant market moves and 0 actionable opportunities"));
}

#[tokio::test]
async fn unconfigured_completion_uses_fallback_and_degrades() {
    let gateway = Arc::new(MemoryGateway::new());
    let summarizer = Summarizer::new(gateway, None);
    let outcome = summarizer
        .summarize(&AnalysisPayload::default(), 7, Utc::now())
        .await;
    assert_eq!(outcome.status, StageStatus::Degraded);
    assert!(!outcome.briefing.summary.is_empty());
    assert_eq!(outcome.briefing.data_period.days, 7);
}

#[tokio::test]
async fn failing_completion_falls_back() {
    let gateway = Arc::new(MemoryGateway::new());
    let summarizer = Summarizer::new(gateway, Some(Arc::new(Failing)));
    let outcome = summarizer
        .summarize(&AnalysisPayload::default(), 1, Utc::now())
        .await;
    assert!(outcome.briefing.summary.starts_with("Today's startup intelligence"));
    assert!(outcome.detail.unwrap().contains("503"));
}

#[tokio::test]
async fn model_summary_is_trimmed() {
    let gateway = Arc::new(MemoryGateway::new());
    let summarizer = Summarizer::new(gateway, Some(Arc::new(Echo)));
    let now = Utc::now();
    let outcome = summarizer.summarize(&AnalysisPayload::default(), 3, now).await;
    assert_eq!(outcome.status, StageStatus::Ok);
    assert_eq!(outcome.briefing.summary, "A busy week for AI infrastructure.");
    assert_eq!(outcome.briefing.briefing_date, now.date_naive());
}
