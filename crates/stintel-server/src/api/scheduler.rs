use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use stintel_core::{Frequency, ScheduleStatus};

use crate::middleware::RequestId;

use super::{map_control_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct StartQuery {
    pub frequency: Option<String>,
    pub interval_seconds: Option<u64>,
    pub run_immediately: Option<bool>,
}

pub(super) async fn start(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<StartQuery>,
) -> Result<Json<ApiResponse<ScheduleStatus>>, ApiError> {
    let frequency: Frequency = query
        .frequency
        .as_deref()
        .unwrap_or("daily")
        .parse()
        .map_err(|e: stintel_core::ScheduleError| {
            ApiError::new(req_id.0.clone(), "validation_error", e.to_string())
        })?;
    let status = state
        .service
        .start_scheduler(
            frequency,
            query.interval_seconds,
            query.run_immediately.unwrap_or(false),
        )
        .map_err(|e| map_control_error(req_id.0.clone(), e))?;
    Ok(ApiResponse::new(req_id.0, status))
}

pub(super) async fn stop(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<ScheduleStatus>>, ApiError> {
    let status = state
        .service
        .stop_scheduler()
        .map_err(|e| map_control_error(req_id.0.clone(), e))?;
    Ok(ApiResponse::new(req_id.0, status))
}

pub(super) async fn status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<ScheduleStatus>> {
    ApiResponse::new(req_id.0, state.service.scheduler_status())
}

/// Runs one pipeline execution and responds when it finishes.
pub(super) async fn trigger(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<ScheduleStatus>>, ApiError> {
    let status = state
        .service
        .trigger_scheduler_now()
        .await
        .map_err(|e| map_control_error(req_id.0.clone(), e))?;
    Ok(ApiResponse::new(req_id.0, status))
}
