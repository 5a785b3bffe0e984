//! Orchestration for the intelligence pipeline: collection fan-out, stage
//! sequencing, enrichment, analysis, briefing assembly, the run guard and
//! the interval scheduler.

pub mod analysis;
pub mod coordinator;
pub mod enrich;
pub mod extract;
pub mod guard;
mod lexicon;
pub mod reporting;
pub mod runner;
pub mod scheduler;
pub mod service;
pub mod status;
pub mod summarizer;

pub use analysis::{AnalysisOutcome, Analyzer};
pub use coordinator::{CollectionCoordinator, SourceResult};
pub use enrich::{Enricher, EnrichmentBatch, RecordEnricher};
pub use extract::{extract_json_object, normalize_payload, parse_analysis, ExtractionFailure};
pub use guard::{RunGuard, RunPermit};
pub use reporting::{
    daily_report, workflow_health, workflow_summary, DailyReport, HealthStatus, WorkflowHealth,
    WorkflowSummary,
};
pub use runner::PipelineRunner;
pub use scheduler::{JobError, ScheduledJob, Scheduler, SchedulerError};
pub use service::{
    validate_days_back, ControlError, IntelligenceService, RunAccepted, DEFAULT_DAYS_BACK,
    MAX_DAYS_BACK,
};
pub use status::{RunStatus, RunStatusBoard};
pub use summarizer::{SummaryOutcome, Summarizer};
