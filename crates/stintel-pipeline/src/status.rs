//! Last-known run status, readable without touching the run guard.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use stintel_core::RunReport;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStatus {
    pub running: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub last_report: Option<RunReport>,
}

#[derive(Debug, Clone, Default)]
pub struct RunStatusBoard {
    inner: Arc<Mutex<RunStatus>>,
}

impl RunStatusBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RunStatus> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Checkpoint: a run has started.
    pub fn mark_started(&self) {
        let mut state = self.state();
        state.running = true;
        state.error = None;
    }

    /// Checkpoint: a run finished (successfully or not).
    pub fn mark_finished(&self, report: &RunReport) {
        let mut state = self.state();
        state.running = false;
        state.last_run = Some(report.finished_at);
        state.error.clone_from(&report.error);
        state.last_report = Some(report.clone());
    }

    #[must_use]
    pub fn snapshot(&self) -> RunStatus {
        self.state().clone()
    }
}
