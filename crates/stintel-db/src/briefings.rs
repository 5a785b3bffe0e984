//! Database operations for `briefings`.
//!
//! The full briefing is stored as one JSONB document keyed by
//! `briefing_date`; `summary` is duplicated into its own column for listing.

use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::PgPool;
use stintel_core::Briefing;

use crate::DbError;

/// Insert the briefing, or replace the existing one for the same date.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_briefing(pool: &PgPool, briefing: &Briefing) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO briefings (briefing_date, summary, content) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (briefing_date) DO UPDATE \
         SET summary = EXCLUDED.summary, \
             content = EXCLUDED.content, \
             updated_at = NOW()",
    )
    .bind(briefing.briefing_date)
    .bind(&briefing.summary)
    .bind(Json(briefing))
    .execute(pool)
    .await?;

    Ok(())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_latest_briefing(pool: &PgPool) -> Result<Option<Briefing>, DbError> {
    let row = sqlx::query_scalar::<_, Json<Briefing>>(
        "SELECT content FROM briefings ORDER BY briefing_date DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|Json(b)| b))
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_briefing_by_date(
    pool: &PgPool,
    date: NaiveDate,
) -> Result<Option<Briefing>, DbError> {
    let row = sqlx::query_scalar::<_, Json<Briefing>>(
        "SELECT content FROM briefings WHERE briefing_date = $1",
    )
    .bind(date)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|Json(b)| b))
}
