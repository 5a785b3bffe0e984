//! Interval scheduler for recurring pipeline runs.
//!
//! One background task per running schedule sleeps until `next_run`, runs
//! the injected [`ScheduledJob`], and re-plans from the completion time.
//! Stopping cancels the pending sleep only; a run already in flight is left
//! to finish.
//!
//! Schedule times follow the tokio clock from a wall-clock anchor taken at
//! start, so a wall-clock jump does not move the cadence.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stintel_core::{Frequency, ScheduleError, ScheduleState, ScheduleStatus};
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("a pipeline run is already in progress")]
    Conflict,

    #[error("pipeline run failed: {0}")]
    Failed(String),
}

/// The unit of work a [`Scheduler`] repeats.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    async fn run_scheduled(&self) -> Result<(), JobError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    InvalidArgument(#[from] ScheduleError),

    #[error("scheduler is already running")]
    AlreadyRunning,

    #[error("scheduler is not running")]
    NotRunning,

    #[error(transparent)]
    Job(#[from] JobError),
}

/// State shared between the control handle and one loop task.
struct ActiveSchedule {
    started_at: DateTime<Utc>,
    started: Instant,
    state: Mutex<ScheduleState>,
    token: CancellationToken,
    replan: Notify,
}

impl ActiveSchedule {
    fn new(frequency: Frequency, interval_seconds: u64) -> Self {
        let started_at = Utc::now();
        Self {
            started_at,
            started: Instant::now(),
            state: Mutex::new(ScheduleState::new(frequency, interval_seconds, started_at)),
            token: CancellationToken::new(),
            replan: Notify::new(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.started.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.started_at + elapsed
    }

    fn state(&self) -> MutexGuard<'_, ScheduleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn until_next(&self) -> Duration {
        let now = self.now();
        (self.state().next_run - now)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Record a successful run and wake the loop to re-plan from it.
    fn complete(&self) {
        let now = self.now();
        self.state().record_completion(now);
        self.replan.notify_one();
    }

    fn defer(&self) {
        let now = self.now();
        self.state().defer(now);
    }

    fn status(&self) -> ScheduleStatus {
        let now = self.now();
        ScheduleStatus::from_state(&self.state(), now)
    }
}

pub struct Scheduler {
    job: Arc<dyn ScheduledJob>,
    error_backoff: Duration,
    active: Mutex<Option<Arc<ActiveSchedule>>>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("error_backoff", &self.error_backoff)
            .field("running", &self.active().is_some())
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    #[must_use]
    pub fn new(job: Arc<dyn ScheduledJob>) -> Self {
        Self {
            job,
            error_backoff: DEFAULT_ERROR_BACKOFF,
            active: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<ActiveSchedule>>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn active(&self) -> Option<Arc<ActiveSchedule>> {
        self.slot().clone()
    }

    /// Start the recurring loop. Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::InvalidArgument`] for a bad custom interval and
    /// [`SchedulerError::AlreadyRunning`] when a schedule is active; neither
    /// changes the current state.
    pub fn start(
        &self,
        frequency: Frequency,
        interval_seconds: Option<u64>,
        run_immediately: bool,
    ) -> Result<ScheduleStatus, SchedulerError> {
        let interval = frequency.interval_secs(interval_seconds)?;

        let mut slot = self.slot();
        if slot.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }
        let active = Arc::new(ActiveSchedule::new(frequency, interval));
        *slot = Some(Arc::clone(&active));
        drop(slot);

        tracing::info!(frequency = %frequency, interval_seconds = interval, run_immediately, "scheduler: started");
        tokio::spawn(drive(
            Arc::clone(&self.job),
            Arc::clone(&active),
            self.error_backoff,
        ));

        if run_immediately {
            let job = Arc::clone(&self.job);
            let immediate = Arc::clone(&active);
            tokio::spawn(async move {
                match job.run_scheduled().await {
                    Ok(()) => immediate.complete(),
                    Err(e) => tracing::warn!(error = %e, "scheduler: immediate run failed"),
                }
            });
        }

        Ok(active.status())
    }

    /// Cancel the pending wait and drop the schedule.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::NotRunning`] when no schedule is active.
    pub fn stop(&self) -> Result<(), SchedulerError> {
        let active = self.slot().take().ok_or(SchedulerError::NotRunning)?;
        active.token.cancel();
        tracing::info!("scheduler: stopped");
        Ok(())
    }

    #[must_use]
    pub fn status(&self) -> ScheduleStatus {
        self.active()
            .map_or_else(ScheduleStatus::stopped, |active| active.status())
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.active().is_some()
    }

    /// Run the job once now; on success the next run is measured from this
    /// completion and the loop re-plans its sleep.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::NotRunning`] when stopped, or the job's own error.
    pub async fn trigger_now(&self) -> Result<ScheduleStatus, SchedulerError> {
        let active = self.active().ok_or(SchedulerError::NotRunning)?;
        tracing::info!("scheduler: manual trigger");
        self.job.run_scheduled().await?;
        active.complete();
        Ok(active.status())
    }
}

async fn drive(job: Arc<dyn ScheduledJob>, active: Arc<ActiveSchedule>, error_backoff: Duration) {
    loop {
        let wait = active.until_next();
        tokio::select! {
            biased;
            () = active.token.cancelled() => break,
            () = active.replan.notified() => continue,
            () = tokio::time::sleep(wait) => {}
        }

        tracing::info!("scheduler: starting scheduled run");
        match job.run_scheduled().await {
            Ok(()) => {
                active.complete();
                tracing::info!(next_run = %active.state().next_run, "scheduler: scheduled run complete");
            }
            Err(JobError::Conflict) => {
                // Another run holds the guard; try again one interval from now.
                active.defer();
                tracing::info!(next_run = %active.state().next_run, "scheduler: run in progress, deferring");
            }
            Err(e) => {
                tracing::warn!(error = %e, backoff_secs = error_backoff.as_secs(), "scheduler: scheduled run failed");
                tokio::select! {
                    biased;
                    () = active.token.cancelled() => break,
                    () = active.replan.notified() => {}
                    () = tokio::time::sleep(error_backoff) => {}
                }
            }
        }
    }
    tracing::debug!("scheduler: loop exited");
}
