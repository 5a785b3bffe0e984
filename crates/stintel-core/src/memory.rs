//! In-process [`PersistenceGateway`] used by tests and the `--memory` CLI mode.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use crate::analysis::{AnalysisRecord, NewAnalysis};
use crate::briefing::Briefing;
use crate::gateway::{validate_days, validate_limit, GatewayError, PersistenceGateway, RecentQuery};
use crate::records::{CollectedRecord, Enrichment, RecordKind, StoredRecord};
use crate::workflow::{NewWorkflowRun, RunOutcome, RunReport, WorkflowRunRecord};

#[derive(Default)]
struct Inner {
    next_id: i64,
    records: Vec<StoredRecord>,
    keys: HashSet<(RecordKind, String)>,
    analyses: Vec<AnalysisRecord>,
    briefings: BTreeMap<NaiveDate, Briefing>,
    runs: Vec<WorkflowRunRecord>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryGateway {
    inner: Mutex<Inner>,
}

impl MemoryGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, GatewayError> {
        self.inner
            .lock()
            .map_err(|_| GatewayError::Backend("memory gateway lock poisoned".into()))
    }

    /// Total stored records of `kind`, regardless of age.
    ///
    /// # Errors
    ///
    /// Fails only if the internal lock is poisoned.
    pub fn record_count(&self, kind: RecordKind) -> Result<usize, GatewayError> {
        Ok(self
            .lock()?
            .records
            .iter()
            .filter(|r| r.kind() == kind)
            .count())
    }

    /// Number of stored briefings (one per date).
    ///
    /// # Errors
    ///
    /// Fails only if the internal lock is poisoned.
    pub fn briefing_count(&self) -> Result<usize, GatewayError> {
        Ok(self.lock()?.briefings.len())
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn upsert_records(
        &self,
        kind: RecordKind,
        records: &[CollectedRecord],
    ) -> Result<u64, GatewayError> {
        if let Some(other) = records.iter().find(|r| r.kind() != kind) {
            return Err(GatewayError::InvalidArgument(format!(
                "expected {kind} records, got {}",
                other.kind()
            )));
        }

        let now = Utc::now();
        let mut inner = self.lock()?;
        let mut inserted = 0_u64;
        for record in records {
            if !inner.keys.insert((kind, record.dedup_key())) {
                continue;
            }
            let id = inner.next_id();
            inner.records.push(StoredRecord {
                id,
                record: record.clone(),
                enrichment: None,
                is_enriched: false,
                occurred_at: record.occurred_at().unwrap_or(now),
                created_at: now,
                updated_at: now,
            });
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn query_recent(
        &self,
        kind: RecordKind,
        query: RecentQuery,
    ) -> Result<Vec<StoredRecord>, GatewayError> {
        query.validate()?;
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(query.days));
        let inner = self.lock()?;
        let mut rows: Vec<StoredRecord> = inner
            .records
            .iter()
            .filter(|r| r.kind() == kind && r.occurred_at >= cutoff)
            .filter(|r| query.enriched.is_none_or(|e| r.is_enriched == e))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at).then(b.id.cmp(&a.id)));
        if let Some(limit) = query.limit {
            rows.truncate(limit as usize);
        }
        Ok(rows)
    }

    async fn count_recent(
        &self,
        kind: RecordKind,
        days: u32,
        enriched: Option<bool>,
    ) -> Result<u64, GatewayError> {
        validate_days(days)?;
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days));
        let inner = self.lock()?;
        let count = inner
            .records
            .iter()
            .filter(|r| r.kind() == kind && r.occurred_at >= cutoff)
            .filter(|r| enriched.is_none_or(|e| r.is_enriched == e))
            .count();
        Ok(count as u64)
    }

    async fn apply_enrichment(
        &self,
        kind: RecordKind,
        id: i64,
        enrichment: &Enrichment,
    ) -> Result<bool, GatewayError> {
        let mut inner = self.lock()?;
        let Some(row) = inner
            .records
            .iter_mut()
            .find(|r| r.id == id && r.kind() == kind && !r.is_enriched)
        else {
            return Ok(false);
        };
        row.enrichment = Some(enrichment.clone());
        row.is_enriched = true;
        row.updated_at = Utc::now();
        Ok(true)
    }

    async fn save_analysis(&self, analysis: &NewAnalysis) -> Result<i64, GatewayError> {
        let mut inner = self.lock()?;
        let id = inner.next_id();
        inner.analyses.push(AnalysisRecord {
            id,
            analysis_type: analysis.analysis_type.clone(),
            period_start: analysis.period_start,
            period_end: analysis.period_end,
            payload: analysis.payload.clone(),
            model_used: analysis.model_used.clone(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn latest_analysis(&self) -> Result<Option<AnalysisRecord>, GatewayError> {
        Ok(self.lock()?.analyses.last().cloned())
    }

    async fn save_briefing(&self, briefing: &Briefing) -> Result<(), GatewayError> {
        self.lock()?
            .briefings
            .insert(briefing.briefing_date, briefing.clone());
        Ok(())
    }

    async fn latest_briefing(&self) -> Result<Option<Briefing>, GatewayError> {
        Ok(self.lock()?.briefings.values().next_back().cloned())
    }

    async fn briefing_by_date(&self, date: NaiveDate) -> Result<Option<Briefing>, GatewayError> {
        Ok(self.lock()?.briefings.get(&date).cloned())
    }

    async fn record_run_started(&self, run: &NewWorkflowRun) -> Result<i64, GatewayError> {
        let mut inner = self.lock()?;
        let id = inner.next_id();
        inner.runs.push(WorkflowRunRecord {
            id,
            run_id: run.run_id,
            trigger_source: run.trigger.as_str().to_string(),
            run_type: run.run_type.as_str().to_string(),
            status: "running".to_string(),
            stages: Vec::new(),
            records_collected: 0,
            records_inserted: 0,
            briefing_date: None,
            error_message: None,
            started_at: run.started_at,
            completed_at: None,
        });
        Ok(id)
    }

    async fn record_run_finished(&self, id: i64, report: &RunReport) -> Result<(), GatewayError> {
        let mut inner = self.lock()?;
        let Some(row) = inner
            .runs
            .iter_mut()
            .find(|r| r.id == id && r.status == "running")
        else {
            return Err(GatewayError::InvalidArgument(format!(
                "workflow run {id} is not running"
            )));
        };
        row.status = match report.outcome {
            RunOutcome::Success => "succeeded",
            RunOutcome::Error => "failed",
        }
        .to_string();
        row.stages.clone_from(&report.stages);
        row.records_collected = i64::try_from(report.collected.values().sum::<usize>()).unwrap_or(i64::MAX);
        row.records_inserted =
            i64::try_from(report.stored.values().map(|c| c.inserted).sum::<u64>()).unwrap_or(i64::MAX);
        row.briefing_date = report.briefing_date;
        row.error_message.clone_from(&report.error);
        row.completed_at = Some(report.finished_at);
        Ok(())
    }

    async fn list_runs(&self, limit: u32) -> Result<Vec<WorkflowRunRecord>, GatewayError> {
        validate_limit(limit)?;
        let inner = self.lock()?;
        Ok(inner
            .runs
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), GatewayError> {
        self.lock().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::briefing::{BriefingStatistics, DataPeriod};
    use crate::records::Article;

    fn article(url: &str, age_days: i64) -> CollectedRecord {
        CollectedRecord::Article(Article {
            url: url.into(),
            title: format!("title for {url}"),
            source: Some("techcrunch".into()),
            summary: None,
            author: None,
            published_at: Some(Utc::now() - Duration::days(age_days)),
            tags: vec![],
        })
    }

    fn briefing(date: NaiveDate, summary: &str) -> Briefing {
        let now = Utc::now();
        Briefing {
            briefing_date: date,
            generated_at: now,
            data_period: DataPeriod {
                start: now - Duration::days(7),
                end: now,
                days: 7,
            },
            summary: summary.into(),
            trends: vec![],
            funding_rounds: vec![],
            product_launches: vec![],
            competitor_moves: vec![],
            opportunities_for_founders: vec![],
            opportunities_for_investors: vec![],
            intelligence_threads: vec![],
            statistics: BriefingStatistics::default(),
        }
    }

    #[tokio::test]
    async fn duplicate_dedup_key_inserts_nothing() {
        let gw = MemoryGateway::new();
        let first = gw
            .upsert_records(RecordKind::Article, &[article("https://a", 0)])
            .await
            .unwrap();
        let again = gw
            .upsert_records(
                RecordKind::Article,
                &[article("https://a", 0), article("https://b", 0)],
            )
            .await
            .unwrap();
        assert_eq!(first, 1);
        assert_eq!(again, 1);
        assert_eq!(gw.record_count(RecordKind::Article).unwrap(), 2);
    }

    #[tokio::test]
    async fn mismatched_kind_is_rejected() {
        let gw = MemoryGateway::new();
        let err = gw
            .upsert_records(RecordKind::Launch, &[article("https://a", 0)])
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn query_recent_filters_by_window_and_enrichment() {
        let gw = MemoryGateway::new();
        gw.upsert_records(
            RecordKind::Article,
            &[article("https://new", 1), article("https://old", 40)],
        )
        .await
        .unwrap();

        let recent = gw
            .query_recent(RecordKind::Article, RecentQuery::days(7))
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);

        let id = recent[0].id;
        assert!(gw
            .apply_enrichment(RecordKind::Article, id, &Enrichment::default())
            .await
            .unwrap());
        assert!(!gw
            .apply_enrichment(RecordKind::Article, id, &Enrichment::default())
            .await
            .unwrap());

        let unenriched = gw
            .query_recent(RecordKind::Article, RecentQuery::days(365).enriched(false))
            .await
            .unwrap();
        assert_eq!(unenriched.len(), 1);
        assert_eq!(
            gw.count_recent(RecordKind::Article, 7, Some(true))
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn query_recent_rejects_out_of_range_arguments() {
        let gw = MemoryGateway::new();
        assert!(gw
            .query_recent(RecordKind::Article, RecentQuery::days(0))
            .await
            .is_err());
        assert!(gw
            .query_recent(RecordKind::Article, RecentQuery::days(7).limit(10_001))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn briefing_upsert_keeps_latest_content() {
        let gw = MemoryGateway::new();
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        gw.save_briefing(&briefing(date, "first")).await.unwrap();
        gw.save_briefing(&briefing(date, "second")).await.unwrap();

        assert_eq!(gw.briefing_count().unwrap(), 1);
        let stored = gw.briefing_by_date(date).await.unwrap().unwrap();
        assert_eq!(stored.summary, "second");
    }
}
