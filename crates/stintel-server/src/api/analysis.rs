use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stintel_core::{AnalysisItem, AnalysisPayload, AnalysisRecord};

use crate::middleware::RequestId;

use super::{map_gateway_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct LatestAnalysis {
    analysis_id: i64,
    analysis_type: String,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    model_used: Option<String>,
    created_at: DateTime<Utc>,
    results: AnalysisPayload,
}

#[derive(Debug, Serialize)]
pub(super) struct ItemList {
    count: usize,
    items: Vec<AnalysisItem>,
}

impl ItemList {
    fn new(items: Vec<AnalysisItem>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(super) enum Opportunities {
    One(ItemList),
    Both { founders: ItemList, investors: ItemList },
}

#[derive(Debug, Deserialize)]
pub(super) struct OpportunitiesQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

async fn latest(state: &AppState, req_id: &RequestId) -> Result<Option<AnalysisRecord>, ApiError> {
    state
        .service
        .gateway()
        .latest_analysis()
        .await
        .map_err(|e| map_gateway_error(req_id.0.clone(), &e))
}

pub(super) async fn latest_analysis(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<LatestAnalysis>>, ApiError> {
    let record = latest(&state, &req_id).await?.ok_or_else(|| {
        ApiError::new(req_id.0.clone(), "not_found", "no analysis results found")
    })?;
    Ok(ApiResponse::new(
        req_id.0,
        LatestAnalysis {
            analysis_id: record.id,
            analysis_type: record.analysis_type,
            period_start: record.period_start,
            period_end: record.period_end,
            model_used: record.model_used,
            created_at: record.created_at,
            results: record.payload,
        },
    ))
}

/// Trends from the latest analysis; empty before the first run.
pub(super) async fn trends(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<ItemList>>, ApiError> {
    let trends = latest(&state, &req_id)
        .await?
        .map(|a| a.payload.trends)
        .unwrap_or_default();
    Ok(ApiResponse::new(req_id.0, ItemList::new(trends)))
}

pub(super) async fn opportunities(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<OpportunitiesQuery>,
) -> Result<Json<ApiResponse<Opportunities>>, ApiError> {
    let kind = query.kind.as_deref().unwrap_or("all");
    if !matches!(kind, "all" | "founders" | "investors") {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!("type must be one of all, founders, investors; got '{kind}'"),
        ));
    }

    let payload = latest(&state, &req_id)
        .await?
        .map(|a| a.payload)
        .unwrap_or_default();
    let data = match kind {
        "founders" => Opportunities::One(ItemList::new(payload.opportunities_for_founders)),
        "investors" => Opportunities::One(ItemList::new(payload.opportunities_for_investors)),
        _ => Opportunities::Both {
            founders: ItemList::new(payload.opportunities_for_founders),
            investors: ItemList::new(payload.opportunities_for_investors),
        },
    };
    Ok(ApiResponse::new(req_id.0, data))
}
