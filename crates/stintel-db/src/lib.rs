use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use stintel_core::{AppConfig, GatewayError};
use thiserror::Error;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Resolved relative to this crate's manifest.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    #[error("workflow run {id} is not in '{expected_status}' status")]
    InvalidWorkflowRunTransition {
        id: i64,
        expected_status: &'static str,
    },
    #[error("corrupt row in {table}: {reason}")]
    Decode { table: &'static str, reason: String },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<DbError> for GatewayError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => GatewayError::NotFound("record".into()),
            DbError::InvalidWorkflowRunTransition { .. } => {
                GatewayError::InvalidArgument(err.to_string())
            }
            DbError::Json(e) => GatewayError::Serialization(e),
            other => GatewayError::backend(other),
        }
    }
}

/// Open the Postgres pool behind [`PgGateway`].
///
/// # Errors
///
/// Returns [`sqlx::Error`] if no connection can be established within the
/// acquire timeout.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Apply pending migrations from `migrations/` and return how many ran.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    let before = successful_migrations(pool).await;
    MIGRATOR.run(pool).await?;
    let after = successful_migrations(pool).await;
    Ok(usize::try_from(after.saturating_sub(before)).unwrap_or(0))
}

// Zero when the bookkeeping table does not exist yet.
async fn successful_migrations(pool: &PgPool) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success")
        .fetch_one(pool)
        .await
        .unwrap_or(0)
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// [`ping`] with the error folded into [`DbError`].
///
/// # Errors
///
/// Returns [`DbError`] if the ping fails.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    ping(pool).await?;
    Ok(())
}

pub mod analysis;
pub mod briefings;
pub mod gateway;
pub mod records;
pub mod workflow_runs;

pub use analysis::{insert_analysis, latest_analysis, AnalysisRow};
pub use briefings::{get_briefing_by_date, get_latest_briefing, upsert_briefing};
pub use gateway::PgGateway;
pub use records::{
    count_recent_records, insert_records, list_recent_records, mark_record_enriched, RecordRow,
};
pub use workflow_runs::{
    complete_workflow_run, create_workflow_run, fail_workflow_run, get_workflow_run,
    list_workflow_runs, RunTotals, WorkflowRunRow,
};
