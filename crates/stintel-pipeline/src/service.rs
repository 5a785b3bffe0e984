//! Control surface over the runner, guard and scheduler.
//!
//! Every trigger (HTTP, CLI, scheduler) goes through the same [`RunGuard`],
//! so at most one pipeline run is in flight per process.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use stintel_core::{
    Briefing, Frequency, GatewayError, PersistenceGateway, RunReport, RunType, ScheduleStatus,
    TriggerSource,
};
use thiserror::Error;

use crate::guard::{RunGuard, RunPermit};
use crate::runner::PipelineRunner;
use crate::scheduler::{JobError, ScheduledJob, Scheduler, SchedulerError};
use crate::status::{RunStatus, RunStatusBoard};

pub const MAX_DAYS_BACK: u32 = 30;
pub const DEFAULT_DAYS_BACK: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("{0}")]
    Conflict(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("scheduler is not running")]
    NotRunning,

    #[error("pipeline run failed: {0}")]
    RunFailed(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<GatewayError> for ControlError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidArgument(msg) => ControlError::InvalidArgument(msg),
            GatewayError::NotFound(msg) => ControlError::NotFound(msg),
            other => ControlError::Storage(other.to_string()),
        }
    }
}

impl From<SchedulerError> for ControlError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::InvalidArgument(e) => ControlError::InvalidArgument(e.to_string()),
            SchedulerError::AlreadyRunning => {
                ControlError::Conflict(SchedulerError::AlreadyRunning.to_string())
            }
            SchedulerError::NotRunning => ControlError::NotRunning,
            SchedulerError::Job(JobError::Conflict) => {
                ControlError::Conflict(JobError::Conflict.to_string())
            }
            SchedulerError::Job(JobError::Failed(msg)) => ControlError::RunFailed(msg),
        }
    }
}

/// Validate a requested look-back window.
///
/// # Errors
///
/// [`ControlError::InvalidArgument`] unless `1 <= days_back <= 30`.
pub fn validate_days_back(days_back: u32) -> Result<u32, ControlError> {
    if (1..=MAX_DAYS_BACK).contains(&days_back) {
        Ok(days_back)
    } else {
        Err(ControlError::InvalidArgument(format!(
            "days_back must be between 1 and {MAX_DAYS_BACK}, got {days_back}"
        )))
    }
}

/// Returned when a background run was started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunAccepted {
    pub run_type: RunType,
    pub days_back: u32,
}

/// The part of the service the scheduler loop also needs.
struct RunCore {
    runner: Arc<PipelineRunner>,
    guard: RunGuard,
    board: RunStatusBoard,
    scheduled_days_back: u32,
}

impl RunCore {
    async fn execute(
        &self,
        permit: RunPermit,
        run_type: RunType,
        days_back: u32,
        trigger: TriggerSource,
    ) -> RunReport {
        self.board.mark_started();
        let report = match run_type {
            RunType::Full => self.runner.run(days_back, trigger).await,
            RunType::CollectOnly => self.runner.collect_only(days_back, trigger).await,
        };
        // free the slot before status reads can observe `running = false`
        drop(permit);
        self.board.mark_finished(&report);
        report
    }
}

#[async_trait]
impl ScheduledJob for RunCore {
    async fn run_scheduled(&self) -> Result<(), JobError> {
        let Some(permit) = self.guard.try_permit() else {
            tracing::warn!("scheduler: run skipped, another run is in progress");
            return Err(JobError::Conflict);
        };
        let report = self
            .execute(permit, RunType::Full, self.scheduled_days_back, TriggerSource::Scheduled)
            .await;
        if report.is_success() {
            Ok(())
        } else {
            Err(JobError::Failed(report.error.unwrap_or_default()))
        }
    }
}

pub struct IntelligenceService {
    core: Arc<RunCore>,
    scheduler: Scheduler,
    default_days_back: u32,
}

impl std::fmt::Debug for IntelligenceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntelligenceService")
            .field("default_days_back", &self.default_days_back)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl IntelligenceService {
    /// `default_days_back` is used when a caller omits the window and by
    /// scheduled runs; values outside `1..=30` are clamped.
    #[must_use]
    pub fn new(runner: Arc<PipelineRunner>, default_days_back: u32) -> Self {
        Self::with_error_backoff(runner, default_days_back, crate::scheduler::DEFAULT_ERROR_BACKOFF)
    }

    #[must_use]
    pub fn with_error_backoff(
        runner: Arc<PipelineRunner>,
        default_days_back: u32,
        error_backoff: Duration,
    ) -> Self {
        let default_days_back = default_days_back.clamp(1, MAX_DAYS_BACK);
        let core = Arc::new(RunCore {
            runner,
            guard: RunGuard::new(),
            board: RunStatusBoard::new(),
            scheduled_days_back: default_days_back,
        });
        let job: Arc<dyn ScheduledJob> = core.clone();
        Self {
            scheduler: Scheduler::new(job).with_error_backoff(error_backoff),
            core,
            default_days_back,
        }
    }

    #[must_use]
    pub fn gateway(&self) -> &Arc<dyn PersistenceGateway> {
        self.core.runner.gateway()
    }

    #[must_use]
    pub fn default_days_back(&self) -> u32 {
        self.default_days_back
    }

    fn spawn_run(&self, run_type: RunType, days_back: Option<u32>) -> Result<RunAccepted, ControlError> {
        let days_back = validate_days_back(days_back.unwrap_or(self.default_days_back))?;
        let permit = self
            .core
            .guard
            .try_permit()
            .ok_or_else(|| ControlError::Conflict(JobError::Conflict.to_string()))?;

        tracing::info!(run_type = run_type.as_str(), days_back, "control: run accepted");
        let core = Arc::clone(&self.core);
        // visible to status reads as soon as Accepted is returned
        core.board.mark_started();
        tokio::spawn(async move {
            core.execute(permit, run_type, days_back, TriggerSource::Manual)
                .await;
        });
        Ok(RunAccepted {
            run_type,
            days_back,
        })
    }

    /// Start a full run in the background.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a bad window, `Conflict` when a run is in flight.
    pub fn start_run(&self, days_back: Option<u32>) -> Result<RunAccepted, ControlError> {
        self.spawn_run(RunType::Full, days_back)
    }

    /// Start a Collect + Store run in the background.
    ///
    /// # Errors
    ///
    /// Same as [`IntelligenceService::start_run`].
    pub fn collect_only(&self, days_back: Option<u32>) -> Result<RunAccepted, ControlError> {
        self.spawn_run(RunType::CollectOnly, days_back)
    }

    /// Run to completion on the caller's task, for one-shot binaries.
    ///
    /// # Errors
    ///
    /// Same as [`IntelligenceService::start_run`].
    pub async fn run_blocking(
        &self,
        run_type: RunType,
        days_back: Option<u32>,
    ) -> Result<RunReport, ControlError> {
        let days_back = validate_days_back(days_back.unwrap_or(self.default_days_back))?;
        let permit = self
            .core
            .guard
            .try_permit()
            .ok_or_else(|| ControlError::Conflict(JobError::Conflict.to_string()))?;
        Ok(self
            .core
            .execute(permit, run_type, days_back, TriggerSource::Manual)
            .await)
    }

    #[must_use]
    pub fn run_status(&self) -> RunStatus {
        self.core.board.snapshot()
    }

    /// The briefing for `date`, or the latest one.
    ///
    /// # Errors
    ///
    /// `NotFound` when no briefing exists, `Storage` on gateway failure.
    pub async fn briefing(&self, date: Option<NaiveDate>) -> Result<Briefing, ControlError> {
        let gateway = self.gateway();
        let found = match date {
            Some(d) => gateway.briefing_by_date(d).await?,
            None => gateway.latest_briefing().await?,
        };
        found.ok_or_else(|| match date {
            Some(d) => ControlError::NotFound(format!("no briefing for {d}")),
            None => ControlError::NotFound("no briefings generated yet".into()),
        })
    }

    /// # Errors
    ///
    /// `InvalidArgument` for a bad custom interval, `Conflict` when already
    /// running.
    pub fn start_scheduler(
        &self,
        frequency: Frequency,
        interval_seconds: Option<u64>,
        run_immediately: bool,
    ) -> Result<ScheduleStatus, ControlError> {
        Ok(self
            .scheduler
            .start(frequency, interval_seconds, run_immediately)?)
    }

    /// # Errors
    ///
    /// `NotRunning` when the scheduler is stopped.
    pub fn stop_scheduler(&self) -> Result<ScheduleStatus, ControlError> {
        self.scheduler.stop()?;
        Ok(ScheduleStatus::stopped())
    }

    #[must_use]
    pub fn scheduler_status(&self) -> ScheduleStatus {
        self.scheduler.status()
    }

    /// Execute one scheduled run now and wait for it.
    ///
    /// # Errors
    ///
    /// `NotRunning` when stopped, `Conflict` when another run holds the
    /// guard, `RunFailed` when the run ended in error.
    pub async fn trigger_scheduler_now(&self) -> Result<ScheduleStatus, ControlError> {
        let started = Utc::now();
        let status = self.scheduler.trigger_now().await?;
        tracing::info!(
            elapsed_ms = (Utc::now() - started).num_milliseconds(),
            "control: scheduler trigger finished"
        );
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use stintel_core::{
        Article, CollectedRecord, MemoryGateway, SourceCollector, SourceError,
    };
    use tokio::sync::Notify;

    use super::*;
    use crate::coordinator::CollectionCoordinator;

    /// Blocks until the test opens the gate.
    struct Gated {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl SourceCollector for Gated {
        fn name(&self) -> &str {
            "news"
        }
        async fn collect(&self, _days_back: u32) -> Result<Vec<CollectedRecord>, SourceError> {
            self.gate.notified().await;
            Ok(vec![CollectedRecord::Article(Article {
                url: "https://news.example/gated".into(),
                title: "Gated story".into(),
                source: None,
                summary: None,
                author: None,
                published_at: Some(Utc::now()),
                tags: vec![],
            })])
        }
    }

    fn service() -> (IntelligenceService, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let collector = Gated {
            gate: Arc::clone(&gate),
        };
        let coordinator =
            CollectionCoordinator::new(vec![Arc::new(collector)], Duration::from_secs(60));
        let runner = PipelineRunner::new(Arc::new(MemoryGateway::new()), coordinator, None);
        (IntelligenceService::new(Arc::new(runner), 7), gate)
    }

    async fn wait_idle(service: &IntelligenceService) -> RunStatus {
        for _ in 0..200 {
            let status = service.run_status();
            if !status.running {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("run did not finish");
    }

    #[test]
    fn days_back_bounds() {
        assert_eq!(validate_days_back(1), Ok(1));
        assert_eq!(validate_days_back(30), Ok(30));
        assert!(matches!(validate_days_back(0), Err(ControlError::InvalidArgument(_))));
        assert!(matches!(validate_days_back(31), Err(ControlError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn concurrent_starts_yield_one_accepted_one_conflict() {
        let (service, gate) = service();
        let (a, b) = tokio::join!(async { service.start_run(Some(7)) }, async {
            service.start_run(Some(7))
        });
        let accepted = [&a, &b].iter().filter(|r| r.is_ok()).count();
        let conflicts = [&a, &b]
            .iter()
            .filter(|r| matches!(r, Err(ControlError::Conflict(_))))
            .count();
        assert_eq!((accepted, conflicts), (1, 1));
        assert!(service.run_status().running);

        gate.notify_one();
        let status = wait_idle(&service).await;
        assert!(status.last_run.is_some());
        assert!(status.error.is_none());
        assert!(service.briefing(None).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn idle_status_means_next_start_is_accepted() {
        let (service, gate) = service();
        for _ in 0..5 {
            assert!(service.start_run(Some(1)).is_ok());
            gate.notify_one();
            wait_idle(&service).await;
            assert!(service.start_run(Some(1)).is_ok());
            gate.notify_one();
            wait_idle(&service).await;
        }
    }

    #[tokio::test]
    async fn invalid_window_does_not_take_the_guard() {
        let (service, gate) = service();
        assert!(matches!(
            service.start_run(Some(0)),
            Err(ControlError::InvalidArgument(_))
        ));
        assert!(!service.run_status().running);

        let accepted = service.collect_only(None).unwrap();
        assert_eq!(accepted.days_back, 7);
        assert_eq!(accepted.run_type, RunType::CollectOnly);
        gate.notify_one();
        let status = wait_idle(&service).await;
        assert_eq!(status.last_report.unwrap().run_type, RunType::CollectOnly);
    }

    #[tokio::test]
    async fn missing_briefing_is_not_found() {
        let (service, _gate) = service();
        assert!(matches!(
            service.briefing(None).await,
            Err(ControlError::NotFound(_))
        ));
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let err = service.briefing(Some(date)).await.unwrap_err();
        assert_eq!(err, ControlError::NotFound("no briefing for 2026-01-02".into()));
    }

    #[tokio::test]
    async fn scheduler_trigger_conflicts_with_manual_run() {
        let (service, gate) = service();
        service.start_scheduler(Frequency::Daily, None, false).unwrap();
        service.start_run(None).unwrap();

        assert!(matches!(
            service.trigger_scheduler_now().await,
            Err(ControlError::Conflict(_))
        ));
        gate.notify_one();
        wait_idle(&service).await;
        assert!(service.scheduler_status().last_run.is_none());
        service.stop_scheduler().unwrap();
    }

    #[tokio::test]
    async fn scheduler_control_errors() {
        let (service, _gate) = service();
        assert_eq!(service.stop_scheduler().unwrap_err(), ControlError::NotRunning);
        assert_eq!(
            service.trigger_scheduler_now().await.unwrap_err(),
            ControlError::NotRunning
        );
        assert!(matches!(
            service.start_scheduler(Frequency::Custom, Some(10), false),
            Err(ControlError::InvalidArgument(_))
        ));
        assert!(!service.scheduler_status().is_running);

        service.start_scheduler(Frequency::Hourly, None, false).unwrap();
        assert!(matches!(
            service.start_scheduler(Frequency::Hourly, None, false),
            Err(ControlError::Conflict(_))
        ));
        assert!(!service.stop_scheduler().unwrap().is_running);
    }
}
