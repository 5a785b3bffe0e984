//! Database operations for `analysis_results`.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use stintel_core::{AnalysisPayload, AnalysisRecord, NewAnalysis};

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnalysisRow {
    pub id: i64,
    pub analysis_type: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub payload: Json<AnalysisPayload>,
    pub model_used: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AnalysisRow> for AnalysisRecord {
    fn from(row: AnalysisRow) -> Self {
        AnalysisRecord {
            id: row.id,
            analysis_type: row.analysis_type,
            period_start: row.period_start,
            period_end: row.period_end,
            payload: row.payload.0,
            model_used: row.model_used,
            created_at: row.created_at,
        }
    }
}

/// Insert an analysis result and return its `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_analysis(pool: &PgPool, analysis: &NewAnalysis) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO analysis_results \
             (analysis_type, period_start, period_end, payload, model_used) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id",
    )
    .bind(&analysis.analysis_type)
    .bind(analysis.period_start)
    .bind(analysis.period_end)
    .bind(Json(&analysis.payload))
    .bind(analysis.model_used.as_deref())
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_analysis(pool: &PgPool) -> Result<Option<AnalysisRow>, DbError> {
    let row = sqlx::query_as::<_, AnalysisRow>(
        "SELECT id, analysis_type, period_start, period_end, payload, model_used, created_at \
         FROM analysis_results \
         ORDER BY created_at DESC, id DESC \
         LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
