pub mod analysis;
pub mod app_config;
pub mod briefing;
pub mod collector;
pub mod completion;
pub mod config;
pub mod gateway;
pub mod memory;
pub mod records;
pub mod schedule;
pub mod workflow;

use thiserror::Error;

pub use analysis::{AnalysisItem, AnalysisLimits, AnalysisPayload, AnalysisRecord, NewAnalysis};
pub use app_config::{AppConfig, Environment, LlmProvider};
pub use briefing::{
    Briefing, BriefingFunding, BriefingLaunch, BriefingStatistics, BriefingTrend, DataPeriod,
    IntelligenceThread, ThreadArticle,
};
pub use collector::{SourceCollector, SourceError};
pub use completion::{CompletionError, CompletionRequest, TextCompletion};
pub use config::{build_app_config, load_app_config, load_app_config_from_env};
pub use gateway::{
    validate_days, validate_limit, GatewayError, PersistenceGateway, RecentQuery, MAX_DAYS,
    MAX_LIMIT,
};
pub use memory::MemoryGateway;
pub use records::{
    Article, CollectedRecord, Enrichment, FundingRound, Launch, RecordKind, RepoSignal, Repository,
    StoredRecord,
};
pub use schedule::{Frequency, ScheduleError, ScheduleState, ScheduleStatus, MIN_CUSTOM_INTERVAL_SECS};
pub use workflow::{
    NewWorkflowRun, RunOutcome, RunReport, RunType, Stage, StageReport, StageStatus, StoreCounts,
    TriggerSource, WorkflowRunRecord,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
