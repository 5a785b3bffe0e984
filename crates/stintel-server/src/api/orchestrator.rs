use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use stintel_core::WorkflowRunRecord;
use stintel_pipeline::{RunAccepted, RunStatus};

use crate::middleware::RequestId;

use super::{map_control_error, map_gateway_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct RunQuery {
    pub days_back: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RunsQuery {
    pub limit: Option<u32>,
}

fn normalize_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(20).clamp(1, 200)
}

pub(super) async fn start_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RunQuery>,
) -> Result<(StatusCode, Json<ApiResponse<RunAccepted>>), ApiError> {
    let accepted = state
        .service
        .start_run(query.days_back)
        .map_err(|e| map_control_error(req_id.0.clone(), e))?;
    Ok((StatusCode::ACCEPTED, ApiResponse::new(req_id.0, accepted)))
}

pub(super) async fn collect_only(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RunQuery>,
) -> Result<(StatusCode, Json<ApiResponse<RunAccepted>>), ApiError> {
    let accepted = state
        .service
        .collect_only(query.days_back)
        .map_err(|e| map_control_error(req_id.0.clone(), e))?;
    Ok((StatusCode::ACCEPTED, ApiResponse::new(req_id.0, accepted)))
}

pub(super) async fn run_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<RunStatus>> {
    ApiResponse::new(req_id.0, state.service.run_status())
}

pub(super) async fn list_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<ApiResponse<Vec<WorkflowRunRecord>>>, ApiError> {
    let runs = state
        .service
        .gateway()
        .list_runs(normalize_limit(query.limit))
        .await
        .map_err(|e| map_gateway_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(req_id.0, runs))
}

#[cfg(test)]
mod tests {
    use super::normalize_limit;

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 20);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }
}
