//! Stage sequencing for one pipeline run.
//!
//! `Collect → Store → Enrich → Analyze → Summarize → PersistBriefing`, each
//! stage isolated so a failing collaborator degrades its own stage only. The
//! only fatal faults are a failed briefing write and a panic inside a stage;
//! both still produce a [`RunReport`].

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use futures::FutureExt;
use stintel_core::{
    CollectedRecord, NewWorkflowRun, PersistenceGateway, RecentQuery, RecordKind, RunOutcome,
    RunReport, RunType, Stage, StageReport, StageStatus, StoreCounts, TextCompletion,
    TriggerSource,
};
use uuid::Uuid;

use crate::analysis::Analyzer;
use crate::coordinator::{CollectionCoordinator, SourceResult};
use crate::enrich::{Enricher, RecordEnricher};
use crate::summarizer::Summarizer;

/// Upper bound on records enriched per kind in one run.
const ENRICH_BATCH_LIMIT: u32 = 500;

/// Mutable run bookkeeping; survives a panic in a later stage.
#[derive(Debug, Default)]
struct Progress {
    stages: Vec<StageReport>,
    collected: BTreeMap<String, usize>,
    source_errors: BTreeMap<String, String>,
    stored: BTreeMap<RecordKind, StoreCounts>,
    enriched: u64,
    briefing_date: Option<NaiveDate>,
}

impl Progress {
    fn push(&mut self, stage: Stage, status: StageStatus, detail: Option<String>) {
        match status {
            StageStatus::Ok | StageStatus::Skipped => {
                tracing::info!(stage = ?stage, status = ?status, "pipeline: stage finished");
            }
            StageStatus::Degraded | StageStatus::Failed => {
                tracing::warn!(stage = ?stage, status = ?status, detail = detail.as_deref().unwrap_or(""), "pipeline: stage finished");
            }
        }
        self.stages.push(StageReport::new(stage, status, detail));
    }
}

fn status_for(problems: &[String]) -> (StageStatus, Option<String>) {
    if problems.is_empty() {
        (StageStatus::Ok, None)
    } else {
        (StageStatus::Degraded, Some(problems.join("; ")))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

pub struct PipelineRunner {
    gateway: Arc<dyn PersistenceGateway>,
    coordinator: CollectionCoordinator,
    enricher: Arc<dyn Enricher>,
    analyzer: Analyzer,
    summarizer: Summarizer,
}

impl PipelineRunner {
    /// Runner with the default [`RecordEnricher`]; `completion` is shared by
    /// the enrich, analyze and summarize stages.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        coordinator: CollectionCoordinator,
        completion: Option<Arc<dyn TextCompletion>>,
    ) -> Self {
        let enricher: Arc<dyn Enricher> = match &completion {
            Some(c) => Arc::new(RecordEnricher::with_completion(Arc::clone(c))),
            None => Arc::new(RecordEnricher::new()),
        };
        Self {
            analyzer: Analyzer::new(Arc::clone(&gateway), completion.clone()),
            summarizer: Summarizer::new(Arc::clone(&gateway), completion),
            gateway,
            coordinator,
            enricher,
        }
    }

    #[must_use]
    pub fn with_enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enricher = enricher;
        self
    }

    #[must_use]
    pub fn gateway(&self) -> &Arc<dyn PersistenceGateway> {
        &self.gateway
    }

    /// Every stage in order.
    pub async fn run(&self, days_back: u32, trigger: TriggerSource) -> RunReport {
        self.execute(RunType::Full, days_back, trigger).await
    }

    /// Collect and Store only.
    pub async fn collect_only(&self, days_back: u32, trigger: TriggerSource) -> RunReport {
        self.execute(RunType::CollectOnly, days_back, trigger).await
    }

    async fn execute(&self, run_type: RunType, days_back: u32, trigger: TriggerSource) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();
        tracing::info!(%run_id, run_type = run_type.as_str(), trigger = trigger.as_str(), days_back, "pipeline: run started");

        let history_id = match self
            .gateway
            .record_run_started(&NewWorkflowRun {
                run_id,
                trigger,
                run_type,
                started_at,
            })
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(%run_id, error = %e, "pipeline: could not record run start");
                None
            }
        };

        let mut progress = Progress::default();
        let result = AssertUnwindSafe(self.stages(run_type, days_back, &mut progress))
            .catch_unwind()
            .await;
        let error = match result {
            Ok(Ok(())) => None,
            Ok(Err(message)) => Some(message),
            Err(payload) => {
                let message = format!("stage panicked: {}", panic_message(payload.as_ref()));
                tracing::error!(%run_id, error = %message, "pipeline: fatal fault");
                Some(message)
            }
        };

        let finished_at = Utc::now();
        let report = RunReport {
            run_id,
            trigger,
            run_type,
            days_back,
            started_at,
            finished_at,
            duration_ms: u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX),
            outcome: if error.is_some() {
                RunOutcome::Error
            } else {
                RunOutcome::Success
            },
            stages: progress.stages,
            collected: progress.collected,
            source_errors: progress.source_errors,
            stored: progress.stored,
            enriched: progress.enriched,
            briefing_date: progress.briefing_date,
            error,
        };

        if let Some(id) = history_id {
            if let Err(e) = self.gateway.record_run_finished(id, &report).await {
                tracing::warn!(%run_id, error = %e, "pipeline: could not record run result");
            }
        }

        tracing::info!(
            %run_id,
            outcome = ?report.outcome,
            duration_ms = report.duration_ms,
            enriched = report.enriched,
            "pipeline: run finished"
        );
        report
    }

    async fn stages(
        &self,
        run_type: RunType,
        days_back: u32,
        progress: &mut Progress,
    ) -> Result<(), String> {
        let results = self.collect(days_back, progress).await;
        self.store(results, progress).await;

        if run_type == RunType::CollectOnly {
            for stage in [Stage::Enrich, Stage::Analyze, Stage::Summarize, Stage::PersistBriefing] {
                progress.push(stage, StageStatus::Skipped, None);
            }
            return Ok(());
        }

        self.enrich(days_back, progress).await;

        let analysis = self.analyzer.analyze(days_back).await;
        progress.push(Stage::Analyze, analysis.status, analysis.detail.clone());

        let summary = self
            .summarizer
            .summarize(&analysis.payload, days_back, Utc::now())
            .await;
        progress.push(Stage::Summarize, summary.status, summary.detail.clone());

        match self.gateway.save_briefing(&summary.briefing).await {
            Ok(()) => {
                progress.briefing_date = Some(summary.briefing.briefing_date);
                progress.push(Stage::PersistBriefing, StageStatus::Ok, None);
                Ok(())
            }
            Err(e) => {
                let message = format!("briefing persistence failed: {e}");
                progress.push(Stage::PersistBriefing, StageStatus::Failed, Some(message.clone()));
                Err(message)
            }
        }
    }

    async fn collect(
        &self,
        days_back: u32,
        progress: &mut Progress,
    ) -> BTreeMap<String, SourceResult> {
        let results = self.coordinator.collect_all(days_back).await;
        for (name, result) in &results {
            progress.collected.insert(name.clone(), result.records.len());
            if let Some(e) = &result.error {
                progress.source_errors.insert(name.clone(), e.to_string());
            }
        }

        let failed: Vec<&str> = progress.source_errors.keys().map(String::as_str).collect();
        let status = if failed.is_empty() {
            StageStatus::Ok
        } else if failed.len() == results.len() {
            StageStatus::Failed
        } else {
            StageStatus::Degraded
        };
        let detail = (!failed.is_empty()).then(|| format!("failed sources: {}", failed.join(", ")));
        progress.push(Stage::Collect, status, detail);
        results
    }

    async fn store(&self, results: BTreeMap<String, SourceResult>, progress: &mut Progress) {
        let mut by_kind: BTreeMap<RecordKind, Vec<CollectedRecord>> = BTreeMap::new();
        for record in results.into_values().flat_map(|r| r.records) {
            by_kind.entry(record.kind()).or_default().push(record);
        }

        let mut problems = Vec::new();
        for (kind, records) in by_kind {
            match self.gateway.upsert_records(kind, &records).await {
                Ok(inserted) => {
                    let total = records.len() as u64;
                    let counts = StoreCounts {
                        inserted,
                        duplicates: total.saturating_sub(inserted),
                    };
                    tracing::debug!(kind = %kind, inserted, duplicates = counts.duplicates, "store: kind written");
                    progress.stored.insert(kind, counts);
                }
                Err(e) => {
                    tracing::warn!(kind = %kind, error = %e, "store: write failed");
                    problems.push(format!("{kind}: {e}"));
                }
            }
        }
        let (status, detail) = status_for(&problems);
        progress.push(Stage::Store, status, detail);
    }

    async fn enrich(&self, days_back: u32, progress: &mut Progress) {
        let mut problems = Vec::new();
        for kind in RecordKind::ALL {
            let pending = match self
                .gateway
                .query_recent(
                    kind,
                    RecentQuery::days(days_back)
                        .enriched(false)
                        .limit(ENRICH_BATCH_LIMIT),
                )
                .await
            {
                Ok(records) => records,
                Err(e) => {
                    problems.push(format!("{kind}: {e}"));
                    continue;
                }
            };
            if pending.is_empty() {
                continue;
            }

            let batch = self.enricher.enrich(kind, &pending).await;
            if let Some(reason) = batch.degraded {
                problems.push(format!("{kind}: {reason}"));
            }
            for (id, enrichment) in &batch.updates {
                match self.gateway.apply_enrichment(kind, *id, enrichment).await {
                    Ok(true) => progress.enriched += 1,
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(kind = %kind, id, error = %e, "enrich: write failed");
                        problems.push(format!("{kind} #{id}: {e}"));
                    }
                }
            }
        }
        let (status, detail) = status_for(&problems);
        progress.push(Stage::Enrich, status, detail);
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
