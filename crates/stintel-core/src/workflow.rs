use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::records::RecordKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    Manual,
    Scheduled,
}

impl TriggerSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerSource::Manual => "manual",
            TriggerSource::Scheduled => "scheduled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunType {
    Full,
    CollectOnly,
}

impl RunType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunType::Full => "full",
            RunType::CollectOnly => "collect_only",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Collect,
    Store,
    Enrich,
    Analyze,
    Summarize,
    PersistBriefing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Ok,
    /// Completed on a fallback path (missing collaborator or partial failure).
    Degraded,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: Stage,
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StageReport {
    #[must_use]
    pub fn new(stage: Stage, status: StageStatus, detail: Option<String>) -> Self {
        Self {
            stage,
            status,
            detail,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
    pub inserted: u64,
    pub duplicates: u64,
}

/// Structured result of one pipeline run. Always produced, even on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub trigger: TriggerSource,
    pub run_type: RunType,
    pub days_back: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub outcome: RunOutcome,
    pub stages: Vec<StageReport>,
    /// Records collected per source name.
    pub collected: BTreeMap<String, usize>,
    /// Error tag per failed source.
    pub source_errors: BTreeMap<String, String>,
    pub stored: BTreeMap<RecordKind, StoreCounts>,
    pub enriched: u64,
    pub briefing_date: Option<NaiveDate>,
    pub error: Option<String>,
}

impl RunReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == RunOutcome::Success
    }

    #[must_use]
    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWorkflowRun {
    pub run_id: Uuid,
    pub trigger: TriggerSource,
    pub run_type: RunType,
    pub started_at: DateTime<Utc>,
}

/// Persisted history row for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRunRecord {
    pub id: i64,
    pub run_id: Uuid,
    pub trigger_source: String,
    pub run_type: String,
    /// `running`, `succeeded` or `failed`.
    pub status: String,
    pub stages: Vec<StageReport>,
    pub records_collected: i64,
    pub records_inserted: i64,
    pub briefing_date: Option<NaiveDate>,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}
