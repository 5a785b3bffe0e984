//! Database operations for `workflow_runs`.
//!
//! Runs are created directly in `running` status; the only legal transitions
//! are `running -> succeeded` and `running -> failed`.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use stintel_core::{NewWorkflowRun, StageReport, WorkflowRunRecord};
use uuid::Uuid;

use crate::DbError;

/// A row from the `workflow_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WorkflowRunRow {
    pub id: i64,
    pub run_id: Uuid,
    pub trigger_source: String,
    pub run_type: String,
    pub status: String,
    pub stages: Json<Vec<StageReport>>,
    pub records_collected: i64,
    pub records_inserted: i64,
    pub briefing_date: Option<NaiveDate>,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<WorkflowRunRow> for WorkflowRunRecord {
    fn from(row: WorkflowRunRow) -> Self {
        WorkflowRunRecord {
            id: row.id,
            run_id: row.run_id,
            trigger_source: row.trigger_source,
            run_type: row.run_type,
            status: row.status,
            stages: row.stages.0,
            records_collected: row.records_collected,
            records_inserted: row.records_inserted,
            briefing_date: row.briefing_date,
            error_message: row.error_message,
            started_at: row.started_at,
            completed_at: row.completed_at,
        }
    }
}

const RUN_COLUMNS: &str = "id, run_id, trigger_source, run_type, status, stages, \
                           records_collected, records_inserted, briefing_date, \
                           error_message, started_at, completed_at, created_at";

/// Inserts a new run in `running` status and returns its `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_workflow_run(pool: &PgPool, run: &NewWorkflowRun) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO workflow_runs (run_id, trigger_source, run_type, status, started_at) \
         VALUES ($1, $2, $3, 'running', $4) \
         RETURNING id",
    )
    .bind(run.run_id)
    .bind(run.trigger.as_str())
    .bind(run.run_type.as_str())
    .bind(run.started_at)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Final counters written when a run leaves `running`.
#[derive(Debug, Clone)]
pub struct RunTotals<'a> {
    pub stages: &'a [StageReport],
    pub records_collected: i64,
    pub records_inserted: i64,
    pub briefing_date: Option<NaiveDate>,
    pub completed_at: DateTime<Utc>,
}

/// Marks a run as `succeeded`.
///
/// # Errors
///
/// Returns [`DbError::InvalidWorkflowRunTransition`] if the run is not
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn complete_workflow_run(
    pool: &PgPool,
    id: i64,
    totals: &RunTotals<'_>,
) -> Result<(), DbError> {
    finish(pool, id, "succeeded", totals, None).await
}

/// Marks a run as `failed` with an error message.
///
/// # Errors
///
/// Returns [`DbError::InvalidWorkflowRunTransition`] if the run is not
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn fail_workflow_run(
    pool: &PgPool,
    id: i64,
    totals: &RunTotals<'_>,
    error_message: &str,
) -> Result<(), DbError> {
    finish(pool, id, "failed", totals, Some(error_message)).await
}

async fn finish(
    pool: &PgPool,
    id: i64,
    status: &str,
    totals: &RunTotals<'_>,
    error_message: Option<&str>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE workflow_runs \
         SET status = $1, stages = $2, records_collected = $3, records_inserted = $4, \
             briefing_date = $5, error_message = $6, completed_at = $7 \
         WHERE id = $8 AND status = 'running'",
    )
    .bind(status)
    .bind(Json(totals.stages))
    .bind(totals.records_collected)
    .bind(totals.records_inserted)
    .bind(totals.briefing_date)
    .bind(error_message)
    .bind(totals.completed_at)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidWorkflowRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_workflow_run(pool: &PgPool, id: i64) -> Result<WorkflowRunRow, DbError> {
    let sql = format!("SELECT {RUN_COLUMNS} FROM workflow_runs WHERE id = $1");
    sqlx::query_as::<_, WorkflowRunRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_workflow_runs(pool: &PgPool, limit: i64) -> Result<Vec<WorkflowRunRow>, DbError> {
    let sql = format!(
        "SELECT {RUN_COLUMNS} FROM workflow_runs ORDER BY started_at DESC, id DESC LIMIT $1"
    );
    let rows = sqlx::query_as::<_, WorkflowRunRow>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}
