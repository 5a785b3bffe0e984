use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use stintel_core::{
    AnalysisRecord, Article, Briefing, Enrichment, FundingRound, GatewayError, MemoryGateway,
    NewAnalysis, SourceCollector, SourceError, StoredRecord, WorkflowRunRecord,
};

use super::*;
use crate::enrich::EnrichmentBatch;

struct Articles;

#[async_trait]
impl SourceCollector for Articles {
    fn name(&self) -> &str {
        "news"
    }
    async fn collect(&self, _days_back: u32) -> Result<Vec<CollectedRecord>, SourceError> {
        Ok((0..3)
            .map(|i| {
                CollectedRecord::Article(Article {
                    url: format!("https://news.example/{i}"),
                    title: format!("AI startup {i} raises seed funding"),
                    source: Some("hn".into()),
                    summary: None,
                    author: None,
                    published_at: Some(Utc::now()),
                    tags: vec![],
                })
            })
            .collect())
    }
}

struct Funding;

#[async_trait]
impl SourceCollector for Funding {
    fn name(&self) -> &str {
        "startup"
    }
    async fn collect(&self, _days_back: u32) -> Result<Vec<CollectedRecord>, SourceError> {
        Ok(vec![CollectedRecord::FundingRound(FundingRound {
            company: "Acme".into(),
            amount: Some("$5M".into()),
            round_type: Some("Seed".into()),
            investors: vec!["Initialized".into()],
            description: None,
            link: Some("https://funding.example/acme".into()),
            source: None,
            announced_at: Some(Utc::now()),
        })])
    }
}

struct Down;

#[async_trait]
impl SourceCollector for Down {
    fn name(&self) -> &str {
        "github"
    }
    async fn collect(&self, _days_back: u32) -> Result<Vec<CollectedRecord>, SourceError> {
        Err(SourceError::Unavailable("connection refused".into()))
    }
}

struct PanickingEnricher;

#[async_trait]
impl Enricher for PanickingEnricher {
    async fn enrich(&self, _kind: RecordKind, _records: &[StoredRecord]) -> EnrichmentBatch {
        panic!("enricher bug")
    }
}

/// Delegates to [`MemoryGateway`] but refuses to store briefings.
#[derive(Default)]
struct NoBriefings(MemoryGateway);

#[async_trait]
impl PersistenceGateway for NoBriefings {
    async fn upsert_records(&self, kind: RecordKind, records: &[CollectedRecord]) -> Result<u64, GatewayError> {
        self.0.upsert_records(kind, records).await
    }
    async fn query_recent(&self, kind: RecordKind, query: RecentQuery) -> Result<Vec<StoredRecord>, GatewayError> {
        self.0.query_recent(kind, query).await
    }
    async fn count_recent(&self, kind: RecordKind, days: u32, enriched: Option<bool>) -> Result<u64, GatewayError> {
        self.0.count_recent(kind, days, enriched).await
    }
    async fn apply_enrichment(&self, kind: RecordKind, id: i64, enrichment: &Enrichment) -> Result<bool, GatewayError> {
        self.0.apply_enrichment(kind, id, enrichment).await
    }
    async fn save_analysis(&self, analysis: &NewAnalysis) -> Result<i64, GatewayError> {
        self.0.save_analysis(analysis).await
    }
    async fn latest_analysis(&self) -> Result<Option<AnalysisRecord>, GatewayError> {
        self.0.latest_analysis().await
    }
    async fn save_briefing(&self, _briefing: &Briefing) -> Result<(), GatewayError> {
        Err(GatewayError::backend(std::io::Error::other("disk full")))
    }
    async fn latest_briefing(&self) -> Result<Option<Briefing>, GatewayError> {
        self.0.latest_briefing().await
    }
    async fn briefing_by_date(&self, date: NaiveDate) -> Result<Option<Briefing>, GatewayError> {
        self.0.briefing_by_date(date).await
    }
    async fn record_run_started(&self, run: &NewWorkflowRun) -> Result<i64, GatewayError> {
        self.0.record_run_started(run).await
    }
    async fn record_run_finished(&self, id: i64, report: &RunReport) -> Result<(), GatewayError> {
        self.0.record_run_finished(id, report).await
    }
    async fn list_runs(&self, limit: u32) -> Result<Vec<WorkflowRunRecord>, GatewayError> {
        self.0.list_runs(limit).await
    }
    async fn ping(&self) -> Result<(), GatewayError> {
        self.0.ping().await
    }
}

fn coordinator() -> CollectionCoordinator {
    CollectionCoordinator::new(
        vec![Arc::new(Articles), Arc::new(Funding), Arc::new(Down)],
        Duration::from_secs(5),
    )
}

fn statuses(report: &RunReport) -> Vec<(Stage, StageStatus)> {
    report.stages.iter().map(|s| (s.stage, s.status)).collect()
}

#[tokio::test]
async fn failing_source_degrades_collect_but_run_succeeds() {
    let gateway = Arc::new(MemoryGateway::new());
    let runner = PipelineRunner::new(gateway.clone(), coordinator(), None);

    let report = runner.run(7, TriggerSource::Manual).await;

    assert!(report.is_success(), "{report:?}");
    assert_eq!(report.collected["news"], 3);
    assert_eq!(report.collected["github"], 0);
    assert!(report.source_errors.contains_key("github"));
    assert_eq!(report.stage(Stage::Collect).unwrap().status, StageStatus::Degraded);
    assert_eq!(report.stored[&RecordKind::Article].inserted, 3);
    assert_eq!(report.enriched, 4);
    assert_eq!(report.stage(Stage::Analyze).unwrap().status, StageStatus::Degraded);
    assert_eq!(report.stage(Stage::PersistBriefing).unwrap().status, StageStatus::Ok);
    assert_eq!(report.briefing_date, Some(Utc::now().date_naive()));

    let briefing = gateway.latest_briefing().await.unwrap().unwrap();
    assert!(briefing.summary.starts_with("Today's startup intelligence"));
    assert_eq!(briefing.statistics.news_articles, 3);
    assert_eq!(briefing.funding_rounds[0].company, "Acme");
}

#[tokio::test]
async fn stages_run_in_order() {
    let runner = PipelineRunner::new(Arc::new(MemoryGateway::new()), coordinator(), None);
    let report = runner.run(7, TriggerSource::Manual).await;
    let order: Vec<Stage> = report.stages.iter().map(|s| s.stage).collect();
    assert_eq!(
        order,
        vec![
            Stage::Collect,
            Stage::Store,
            Stage::Enrich,
            Stage::Analyze,
            Stage::Summarize,
            Stage::PersistBriefing
        ]
    );
}

#[tokio::test]
async fn second_run_counts_duplicates_and_enriches_nothing_new() {
    let gateway = Arc::new(MemoryGateway::new());
    let runner = PipelineRunner::new(gateway.clone(), coordinator(), None);
    runner.run(7, TriggerSource::Manual).await;

    let again = runner.run(7, TriggerSource::Scheduled).await;
    assert_eq!(again.stored[&RecordKind::Article], StoreCounts { inserted: 0, duplicates: 3 });
    assert_eq!(again.enriched, 0);
    assert_eq!(gateway.record_count(RecordKind::Article).unwrap(), 3);
    assert_eq!(gateway.briefing_count().unwrap(), 1);
}

#[tokio::test]
async fn collect_only_skips_downstream_stages() {
    let gateway = Arc::new(MemoryGateway::new());
    let runner = PipelineRunner::new(gateway.clone(), coordinator(), None);

    let report = runner.collect_only(3, TriggerSource::Manual).await;

    assert!(report.is_success());
    assert_eq!(report.run_type, RunType::CollectOnly);
    assert_eq!(
        statuses(&report)[2..],
        [
            (Stage::Enrich, StageStatus::Skipped),
            (Stage::Analyze, StageStatus::Skipped),
            (Stage::Summarize, StageStatus::Skipped),
            (Stage::PersistBriefing, StageStatus::Skipped),
        ]
    );
    assert!(gateway.latest_briefing().await.unwrap().is_none());
    assert_eq!(gateway.record_count(RecordKind::FundingRound).unwrap(), 1);
}

#[tokio::test]
async fn briefing_write_failure_is_fatal_but_reported() {
    let gateway = Arc::new(NoBriefings::default());
    let runner = PipelineRunner::new(gateway.clone(), coordinator(), None);

    let report = runner.run(7, TriggerSource::Manual).await;

    assert_eq!(report.outcome, RunOutcome::Error);
    assert!(report.error.as_deref().unwrap().contains("disk full"));
    assert_eq!(report.stage(Stage::PersistBriefing).unwrap().status, StageStatus::Failed);
    assert_eq!(report.stored[&RecordKind::Article].inserted, 3);
    assert!(report.briefing_date.is_none());
}

#[tokio::test]
async fn panic_in_stage_becomes_error_outcome() {
    let gateway = Arc::new(MemoryGateway::new());
    let runner = PipelineRunner::new(gateway.clone(), coordinator(), None)
        .with_enricher(Arc::new(PanickingEnricher));

    let report = runner.run(7, TriggerSource::Manual).await;

    assert_eq!(report.outcome, RunOutcome::Error);
    assert!(report.error.as_deref().unwrap().contains("enricher bug"));
    assert_eq!(
        statuses(&report),
        vec![(Stage::Collect, StageStatus::Degraded), (Stage::Store, StageStatus::Ok)]
    );
    let runs = gateway.list_runs(10).await.unwrap();
    assert_eq!(runs[0].status, "failed");
}

#[tokio::test]
async fn runs_are_recorded_in_history() {
    let gateway = Arc::new(MemoryGateway::new());
    let runner = PipelineRunner::new(gateway.clone(), coordinator(), None);
    let report = runner.run(7, TriggerSource::Scheduled).await;

    let runs = gateway.list_runs(10).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_id, report.run_id);
    assert_eq!(runs[0].status, "succeeded");
    assert_eq!(runs[0].trigger_source, "scheduled");
    assert_eq!(runs[0].records_collected, 4);
}
