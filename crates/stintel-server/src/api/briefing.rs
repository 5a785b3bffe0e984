use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::NaiveDate;
use stintel_core::Briefing;

use crate::middleware::RequestId;

use super::{map_control_error, ApiError, ApiResponse, AppState};

pub(super) async fn latest_briefing(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Briefing>>, ApiError> {
    let briefing = state
        .service
        .briefing(None)
        .await
        .map_err(|e| map_control_error(req_id.0.clone(), e))?;
    Ok(ApiResponse::new(req_id.0, briefing))
}

pub(super) async fn briefing_by_date(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(date): Path<String>,
) -> Result<Json<ApiResponse<Briefing>>, ApiError> {
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| {
        ApiError::new(
            req_id.0.clone(),
            "validation_error",
            format!("invalid date '{date}', expected YYYY-MM-DD"),
        )
    })?;
    let briefing = state
        .service
        .briefing(Some(date))
        .await
        .map_err(|e| map_control_error(req_id.0.clone(), e))?;
    Ok(ApiResponse::new(req_id.0, briefing))
}
