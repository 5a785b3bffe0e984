use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use stintel_core::{
    validate_days, validate_limit, AnalysisRecord, Briefing, CollectedRecord, Enrichment,
    GatewayError, NewAnalysis, NewWorkflowRun, PersistenceGateway, RecentQuery, RecordKind,
    RunOutcome, RunReport, StoredRecord, WorkflowRunRecord,
};

use crate::workflow_runs::RunTotals;

/// Postgres-backed [`PersistenceGateway`].
#[derive(Clone)]
pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PersistenceGateway for PgGateway {
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
        Ok(crate::insert_records(&self.pool, records).await?)
    }

    async fn query_recent(
        &self,
        kind: RecordKind,
        query: RecentQuery,
    ) -> Result<Vec<StoredRecord>, GatewayError> {
        query.validate()?;
        Ok(
            crate::list_recent_records(&self.pool, kind, query.days, query.enriched, query.limit)
                .await?,
        )
    }

    async fn count_recent(
        &self,
        kind: RecordKind,
        days: u32,
        enriched: Option<bool>,
    ) -> Result<u64, GatewayError> {
        validate_days(days)?;
        Ok(crate::count_recent_records(&self.pool, kind, days, enriched).await?)
    }

    async fn apply_enrichment(
        &self,
        kind: RecordKind,
        id: i64,
        enrichment: &Enrichment,
    ) -> Result<bool, GatewayError> {
        Ok(crate::mark_record_enriched(&self.pool, kind, id, enrichment).await?)
    }

    async fn save_analysis(&self, analysis: &NewAnalysis) -> Result<i64, GatewayError> {
        Ok(crate::insert_analysis(&self.pool, analysis).await?)
    }

    async fn latest_analysis(&self) -> Result<Option<AnalysisRecord>, GatewayError> {
        Ok(crate::latest_analysis(&self.pool).await?.map(Into::into))
    }

    async fn save_briefing(&self, briefing: &Briefing) -> Result<(), GatewayError> {
        Ok(crate::upsert_briefing(&self.pool, briefing).await?)
    }

    async fn latest_briefing(&self) -> Result<Option<Briefing>, GatewayError> {
        Ok(crate::get_latest_briefing(&self.pool).await?)
    }

    async fn briefing_by_date(&self, date: NaiveDate) -> Result<Option<Briefing>, GatewayError> {
        Ok(crate::get_briefing_by_date(&self.pool, date).await?)
    }

    async fn record_run_started(&self, run: &NewWorkflowRun) -> Result<i64, GatewayError> {
        Ok(crate::create_workflow_run(&self.pool, run).await?)
    }

    async fn record_run_finished(&self, id: i64, report: &RunReport) -> Result<(), GatewayError> {
        let totals = RunTotals {
            stages: &report.stages,
            records_collected: i64::try_from(report.collected.values().sum::<usize>())
                .unwrap_or(i64::MAX),
            records_inserted: i64::try_from(
                report.stored.values().map(|c| c.inserted).sum::<u64>(),
            )
            .unwrap_or(i64::MAX),
            briefing_date: report.briefing_date,
            completed_at: report.finished_at,
        };
        match report.outcome {
            RunOutcome::Success => crate::complete_workflow_run(&self.pool, id, &totals).await?,
            RunOutcome::Error => {
                let message = report.error.as_deref().unwrap_or("run failed");
                crate::fail_workflow_run(&self.pool, id, &totals, message).await?;
            }
        }
        Ok(())
    }

    async fn list_runs(&self, limit: u32) -> Result<Vec<WorkflowRunRecord>, GatewayError> {
        validate_limit(limit)?;
        let rows = crate::list_workflow_runs(&self.pool, i64::from(limit)).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn ping(&self) -> Result<(), GatewayError> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }
}
