//! Database operations for `collected_records`.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use stintel_core::{CollectedRecord, Enrichment, RecordKind, StoredRecord};

use crate::DbError;

/// A row from the `collected_records` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecordRow {
    pub id: i64,
    pub kind: String,
    pub dedup_key: String,
    pub payload: Value,
    pub enrichment: Option<Json<Enrichment>>,
    pub is_enriched: bool,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecordRow {
    /// Rebuild the typed record from its stored kind and payload.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] if the kind is unknown or the payload does
    /// not match it.
    pub fn into_stored(self) -> Result<StoredRecord, DbError> {
        let kind = self.kind.parse::<RecordKind>().map_err(|reason| DbError::Decode {
            table: "collected_records",
            reason,
        })?;
        let record =
            CollectedRecord::from_payload(kind, self.payload).map_err(|e| DbError::Decode {
                table: "collected_records",
                reason: format!("row {}: {e}", self.id),
            })?;
        Ok(StoredRecord {
            id: self.id,
            record,
            enrichment: self.enrichment.map(|Json(e)| e),
            is_enriched: self.is_enriched,
            occurred_at: self.occurred_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const RECORD_COLUMNS: &str = "id, kind, dedup_key, payload, enrichment, is_enriched, \
                              occurred_at, created_at, updated_at";

/// Insert records inside one transaction, skipping existing `(kind, dedup_key)`
/// pairs. Returns the number of rows actually inserted.
///
/// Records without a source timestamp are dated at insertion time.
///
/// # Errors
///
/// Returns [`DbError::Json`] if a payload cannot be serialized, or
/// [`DbError::Sqlx`] on any database failure (the transaction is rolled back).
pub async fn insert_records(pool: &PgPool, records: &[CollectedRecord]) -> Result<u64, DbError> {
    if records.is_empty() {
        return Ok(0);
    }

    let now = Utc::now();
    let mut tx = pool.begin().await?;
    let mut inserted = 0_u64;

    for record in records {
        let result = sqlx::query(
            "INSERT INTO collected_records (kind, dedup_key, payload, occurred_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (kind, dedup_key) DO NOTHING",
        )
        .bind(record.kind().as_str())
        .bind(record.dedup_key())
        .bind(record.to_payload()?)
        .bind(record.occurred_at().unwrap_or(now))
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Records of `kind` whose `occurred_at` lies within the last `days` days,
/// newest first. `enriched = None` returns both states; `limit = None` is
/// unbounded.
///
/// Callers validate `days` and `limit`; this function trusts them.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or [`DbError::Decode`] for a
/// row whose payload no longer matches its kind.
pub async fn list_recent_records(
    pool: &PgPool,
    kind: RecordKind,
    days: u32,
    enriched: Option<bool>,
    limit: Option<u32>,
) -> Result<Vec<StoredRecord>, DbError> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} \
         FROM collected_records \
         WHERE kind = $1 \
           AND occurred_at >= NOW() - make_interval(days => $2) \
           AND ($3::boolean IS NULL OR is_enriched = $3) \
         ORDER BY occurred_at DESC, id DESC \
         LIMIT $4"
    );

    let rows = sqlx::query_as::<_, RecordRow>(&sql)
        .bind(kind.as_str())
        .bind(i32::try_from(days).unwrap_or(i32::MAX))
        .bind(enriched)
        .bind(limit.map(i64::from))
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(RecordRow::into_stored).collect()
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_recent_records(
    pool: &PgPool,
    kind: RecordKind,
    days: u32,
    enriched: Option<bool>,
) -> Result<u64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) \
         FROM collected_records \
         WHERE kind = $1 \
           AND occurred_at >= NOW() - make_interval(days => $2) \
           AND ($3::boolean IS NULL OR is_enriched = $3)",
    )
    .bind(kind.as_str())
    .bind(i32::try_from(days).unwrap_or(i32::MAX))
    .bind(enriched)
    .fetch_one(pool)
    .await?;

    Ok(u64::try_from(count).unwrap_or(0))
}

/// Attach enrichment to a record that has not been enriched yet.
///
/// Returns `false` when the row is missing or was already enriched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_record_enriched(
    pool: &PgPool,
    kind: RecordKind,
    id: i64,
    enrichment: &Enrichment,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE collected_records \
         SET enrichment = $1, is_enriched = TRUE, updated_at = NOW() \
         WHERE id = $2 AND kind = $3 AND is_enriched = FALSE",
    )
    .bind(Json(enrichment))
    .bind(id)
    .bind(kind.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
