use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use stintel_core::RecordKind;
use stintel_pipeline::{
    daily_report as build_daily_report, workflow_health, workflow_summary, DailyReport,
    HealthStatus, WorkflowHealth, WorkflowSummary,
};

use crate::middleware::RequestId;

use super::{map_gateway_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct DaysQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(super) struct DateQuery {
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct DataStats {
    days: u32,
    counts: BTreeMap<RecordKind, u64>,
    total: u64,
    timestamp: DateTime<Utc>,
}

pub(super) async fn data_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<ApiResponse<DataStats>>, ApiError> {
    let days = query.days.unwrap_or(7);
    let gateway = state.service.gateway();
    let mut counts = BTreeMap::new();
    for kind in RecordKind::ALL {
        let count = gateway
            .count_recent(kind, days, None)
            .await
            .map_err(|e| map_gateway_error(req_id.0.clone(), &e))?;
        counts.insert(kind, count);
    }
    let total = counts.values().sum();
    Ok(ApiResponse::new(
        req_id.0,
        DataStats {
            days,
            counts,
            total,
            timestamp: Utc::now(),
        },
    ))
}

pub(super) async fn report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<ApiResponse<WorkflowSummary>>, ApiError> {
    let summary = workflow_summary(state.service.gateway().as_ref(), query.days.unwrap_or(7))
        .await
        .map_err(|e| map_gateway_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(req_id.0, summary))
}

pub(super) async fn daily_report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<DateQuery>,
) -> Result<Json<ApiResponse<DailyReport>>, ApiError> {
    let date = match query.date.as_deref() {
        None => Utc::now().date_naive(),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            ApiError::new(
                req_id.0.clone(),
                "validation_error",
                format!("invalid date '{raw}', expected YYYY-MM-DD"),
            )
        })?,
    };
    let report = build_daily_report(state.service.gateway().as_ref(), date)
        .await
        .map_err(|e| map_gateway_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(req_id.0, report))
}

pub(super) async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> (StatusCode, Json<ApiResponse<WorkflowHealth>>) {
    let health = workflow_health(state.service.gateway().as_ref()).await;
    let status = if health.status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, ApiResponse::new(req_id.0, health))
}
