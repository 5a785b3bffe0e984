//! Read-only workflow reports assembled from the gateway.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use stintel_core::{GatewayError, PersistenceGateway, RecordKind};

/// Below this share of enriched records the workflow counts as lagging.
const MIN_ENRICHMENT_RATE: f64 = 50.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindCounts {
    pub total: u64,
    pub enriched: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowSummary {
    pub period_days: u32,
    pub generated_at: DateTime<Utc>,
    pub counts: BTreeMap<RecordKind, KindCounts>,
    pub total_records: u64,
    pub enriched_records: u64,
    /// Percentage in `[0, 100]`, two decimals.
    pub enrichment_rate: f64,
    pub latest_analysis_at: Option<DateTime<Utc>>,
    pub latest_briefing_date: Option<NaiveDate>,
}

/// One day's collection and workflow snapshot.
///
/// Counts cover the 24 hours before `generated_at`; `report_date` selects the
/// briefing checked for availability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyReport {
    pub report_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub counts: BTreeMap<RecordKind, KindCounts>,
    pub total_items: u64,
    pub enriched_items: u64,
    pub briefing_available: bool,
    pub latest_briefing_date: Option<NaiveDate>,
    pub analysis_available: bool,
    pub latest_analysis_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowHealth {
    pub status: HealthStatus,
    pub checked_at: DateTime<Utc>,
    pub records_last_24h: u64,
    pub enrichment_rate_24h: f64,
    pub briefing_age_hours: Option<f64>,
    pub analysis_age_hours: Option<f64>,
    pub issues: Vec<String>,
}

fn rate(enriched: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let pct = enriched as f64 / total as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

fn age_hours(then: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let hours = (now - then).num_seconds() as f64 / 3600.0;
    (hours * 100.0).round() / 100.0
}

async fn kind_counts(
    gateway: &dyn PersistenceGateway,
    days: u32,
) -> Result<BTreeMap<RecordKind, KindCounts>, GatewayError> {
    let mut counts = BTreeMap::new();
    for kind in RecordKind::ALL {
        let total = gateway.count_recent(kind, days, None).await?;
        let enriched = gateway.count_recent(kind, days, Some(true)).await?;
        counts.insert(kind, KindCounts { total, enriched });
    }
    Ok(counts)
}

/// Per-kind totals and enrichment coverage over the last `days` days.
///
/// # Errors
///
/// Propagates [`GatewayError`], including `InvalidArgument` for an out of
/// range window.
pub async fn workflow_summary(
    gateway: &dyn PersistenceGateway,
    days: u32,
) -> Result<WorkflowSummary, GatewayError> {
    let counts = kind_counts(gateway, days).await?;
    let total_records = counts.values().map(|c| c.total).sum();
    let enriched_records = counts.values().map(|c| c.enriched).sum();
    let latest_analysis_at = gateway.latest_analysis().await?.map(|a| a.created_at);
    let latest_briefing_date = gateway.latest_briefing().await?.map(|b| b.briefing_date);

    Ok(WorkflowSummary {
        period_days: days,
        generated_at: Utc::now(),
        counts,
        total_records,
        enriched_records,
        enrichment_rate: rate(enriched_records, total_records),
        latest_analysis_at,
        latest_briefing_date,
    })
}

/// Daily snapshot labelled `date`.
///
/// # Errors
///
/// Propagates [`GatewayError`] from any storage read.
pub async fn daily_report(
    gateway: &dyn PersistenceGateway,
    date: NaiveDate,
) -> Result<DailyReport, GatewayError> {
    let counts = kind_counts(gateway, 1).await?;
    let total_items = counts.values().map(|c| c.total).sum();
    let enriched_items = counts.values().map(|c| c.enriched).sum();
    let briefing_available = gateway.briefing_by_date(date).await?.is_some();
    let latest_briefing_date = gateway.latest_briefing().await?.map(|b| b.briefing_date);
    let latest_analysis_at = gateway.latest_analysis().await?.map(|a| a.created_at);

    Ok(DailyReport {
        report_date: date,
        generated_at: Utc::now(),
        counts,
        total_items,
        enriched_items,
        briefing_available,
        latest_briefing_date,
        analysis_available: latest_analysis_at.is_some(),
        latest_analysis_at,
    })
}

/// Health verdict: `unhealthy` when storage cannot be read, `degraded` when
/// any freshness check fails, `healthy` otherwise. Never errors.
pub async fn workflow_health(gateway: &dyn PersistenceGateway) -> WorkflowHealth {
    let now = Utc::now();
    let mut health = WorkflowHealth {
        status: HealthStatus::Healthy,
        checked_at: now,
        records_last_24h: 0,
        enrichment_rate_24h: 0.0,
        briefing_age_hours: None,
        analysis_age_hours: None,
        issues: Vec::new(),
    };

    if let Err(e) = gateway.ping().await {
        tracing::warn!(error = %e, "health: storage unreachable");
        health.status = HealthStatus::Unhealthy;
        health.issues.push(format!("storage unreachable: {e}"));
        return health;
    }

    let checks = async {
        let counts = kind_counts(gateway, 1).await?;
        let briefing = gateway.latest_briefing().await?;
        let analysis = gateway.latest_analysis().await?;
        Ok::<_, GatewayError>((counts, briefing, analysis))
    };
    let (counts, briefing, analysis) = match checks.await {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(error = %e, "health: storage read failed");
            health.status = HealthStatus::Unhealthy;
            health.issues.push(format!("storage read failed: {e}"));
            return health;
        }
    };

    let total: u64 = counts.values().map(|c| c.total).sum();
    let enriched: u64 = counts.values().map(|c| c.enriched).sum();
    health.records_last_24h = total;
    health.enrichment_rate_24h = rate(enriched, total);
    health.analysis_age_hours = analysis.map(|a| age_hours(a.created_at, now));
    health.briefing_age_hours = briefing.as_ref().map(|b| age_hours(b.generated_at, now));

    if total == 0 {
        health.issues.push("no records collected in the last 24 hours".into());
    } else if health.enrichment_rate_24h < MIN_ENRICHMENT_RATE {
        health.issues.push(format!(
            "enrichment rate {:.2}% is below {MIN_ENRICHMENT_RATE}%",
            health.enrichment_rate_24h
        ));
    }
    if briefing.is_none_or(|b| b.briefing_date != now.date_naive()) {
        health.issues.push("no briefing generated today".into());
    }
    if !health.issues.is_empty() {
        health.status = HealthStatus::Degraded;
    }
    health
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use stintel_core::{
        Article, Briefing, BriefingStatistics, CollectedRecord, DataPeriod, Enrichment,
        MemoryGateway, RecentQuery,
    };

    use super::*;

    fn article(n: usize) -> CollectedRecord {
        CollectedRecord::Article(Article {
            url: format!("https://news.example/{n}"),
            title: format!("Story {n}"),
            source: None,
            summary: None,
            author: None,
            published_at: Some(Utc::now()),
            tags: vec![],
        })
    }

    fn briefing_for_today() -> Briefing {
        let now = Utc::now();
        Briefing {
            briefing_date: now.date_naive(),
            generated_at: now,
            data_period: DataPeriod {
                start: now - Duration::days(1),
                end: now,
                days: 1,
            },
            summary: "quiet day".into(),
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

    async fn seed(gateway: &MemoryGateway, total: usize, enriched: usize) {
        let records: Vec<CollectedRecord> = (0..total).map(article).collect();
        gateway
            .upsert_records(RecordKind::Article, &records)
            .await
            .unwrap();
        let stored = gateway
            .query_recent(RecordKind::Article, RecentQuery::days(1))
            .await
            .unwrap();
        for record in stored.iter().take(enriched) {
            gateway
                .apply_enrichment(RecordKind::Article, record.id, &Enrichment::default())
                .await
                .unwrap();
        }
    }

    #[test]
    fn rate_rounds_to_two_decimals() {
        assert!((rate(1, 3) - 33.33).abs() < f64::EPSILON);
        assert!(rate(0, 0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn summary_counts_and_rate() {
        let gateway = MemoryGateway::new();
        seed(&gateway, 4, 1).await;

        let summary = workflow_summary(&gateway, 7).await.unwrap();
        assert_eq!(summary.counts[&RecordKind::Article], KindCounts { total: 4, enriched: 1 });
        assert_eq!(summary.counts[&RecordKind::Launch], KindCounts::default());
        assert_eq!(summary.total_records, 4);
        assert!((summary.enrichment_rate - 25.0).abs() < f64::EPSILON);
        assert!(summary.latest_briefing_date.is_none());
    }

    #[tokio::test]
    async fn summary_rejects_bad_window() {
        let gateway = MemoryGateway::new();
        assert!(matches!(
            workflow_summary(&gateway, 0).await,
            Err(GatewayError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn daily_report_counts_last_day_and_checks_briefing_date() {
        let gateway = MemoryGateway::new();
        seed(&gateway, 3, 2).await;
        let briefing = briefing_for_today();
        let today = briefing.briefing_date;
        gateway.save_briefing(&briefing).await.unwrap();

        let report = daily_report(&gateway, today).await.unwrap();
        assert_eq!(report.report_date, today);
        assert_eq!(report.counts[&RecordKind::Article], KindCounts { total: 3, enriched: 2 });
        assert_eq!(report.counts.len(), RecordKind::ALL.len());
        assert_eq!((report.total_items, report.enriched_items), (3, 2));
        assert!(report.briefing_available);
        assert_eq!(report.latest_briefing_date, Some(today));
        assert!(!report.analysis_available);
        assert!(report.latest_analysis_at.is_none());

        let earlier = today - Duration::days(3);
        let report = daily_report(&gateway, earlier).await.unwrap();
        assert!(!report.briefing_available);
        assert_eq!(report.latest_briefing_date, Some(today));
    }

    #[tokio::test]
    async fn empty_store_is_degraded() {
        let gateway = MemoryGateway::new();
        let health = workflow_health(&gateway).await;
        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.issues.len(), 2);
        assert!(health.issues[0].contains("no records"));
    }

    #[tokio::test]
    async fn fresh_enriched_data_with_briefing_is_healthy() {
        let gateway = MemoryGateway::new();
        seed(&gateway, 2, 2).await;
        gateway.save_briefing(&briefing_for_today()).await.unwrap();

        let health = workflow_health(&gateway).await;
        assert_eq!(health.status, HealthStatus::Healthy, "{:?}", health.issues);
        assert_eq!(health.records_last_24h, 2);
        assert!(health.briefing_age_hours.is_some());
    }

    #[tokio::test]
    async fn low_enrichment_is_flagged() {
        let gateway = MemoryGateway::new();
        seed(&gateway, 4, 1).await;
        gateway.save_briefing(&briefing_for_today()).await.unwrap();

        let health = workflow_health(&gateway).await;
        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.issues.len(), 1);
        assert!(health.issues[0].contains("enrichment rate"));
    }
}
