mod analysis;
mod briefing;
mod orchestrator;
mod scheduler;
mod workflow;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use stintel_core::GatewayError;
use stintel_pipeline::{ControlError, IntelligenceService};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<IntelligenceService>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(request_id: String, data: T) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

fn status_for(code: &str) -> StatusCode {
    match code {
        "not_found" => StatusCode::NOT_FOUND,
        "unauthorized" => StatusCode::UNAUTHORIZED,
        "validation_error" => StatusCode::BAD_REQUEST,
        "conflict" | "not_running" => StatusCode::CONFLICT,
        "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (status_for(&self.error.code), Json(self)).into_response()
    }
}

pub(super) fn map_control_error(request_id: String, error: ControlError) -> ApiError {
    let code = match &error {
        ControlError::Conflict(_) => "conflict",
        ControlError::InvalidArgument(_) => "validation_error",
        ControlError::NotFound(_) => "not_found",
        ControlError::NotRunning => "not_running",
        ControlError::RunFailed(_) => "run_failed",
        ControlError::Storage(_) => {
            tracing::error!(error = %error, "control operation failed on storage");
            return ApiError::new(request_id, "internal_error", "storage query failed");
        }
    };
    ApiError::new(request_id, code, error.to_string())
}

pub(super) fn map_gateway_error(request_id: String, error: &GatewayError) -> ApiError {
    if let GatewayError::InvalidArgument(msg) = error {
        return ApiError::new(request_id, "validation_error", msg.clone());
    }
    tracing::error!(error = %error, "storage query failed");
    ApiError::new(request_id, "internal_error", "storage query failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

/// Everything except the liveness probe sits behind rate limiting and auth.
fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    let orchestrator = Router::new()
        .route("/run", post(orchestrator::start_run))
        .route("/collect", post(orchestrator::collect_only))
        .route("/status", get(orchestrator::run_status))
        .route("/runs", get(orchestrator::list_runs));
    let analysis = Router::new()
        .route("/latest", get(analysis::latest_analysis))
        .route("/trends", get(analysis::trends))
        .route("/opportunities", get(analysis::opportunities));
    let scheduler = Router::new()
        .route("/start", post(scheduler::start))
        .route("/stop", post(scheduler::stop))
        .route("/status", get(scheduler::status))
        .route("/trigger", post(scheduler::trigger));

    Router::new()
        .nest("/orchestrator", orchestrator)
        .nest("/analysis", analysis)
        .nest("/scheduler", scheduler)
        .route("/briefing", get(briefing::latest_briefing))
        .route("/briefing/{date}", get(briefing::briefing_by_date))
        .route("/data/stats", get(workflow::data_stats))
        .route("/workflow/report", get(workflow::report))
        .route("/workflow/daily-report", get(workflow::daily_report))
        .route("/workflow/health", get(workflow::health))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let v1 = Router::new()
        .route("/health", get(health))
        .merge(protected_router(auth, rate_limit));

    Router::new()
        .nest("/api/v1", v1)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    match state.service.gateway().ping().await {
        Ok(()) => (
            StatusCode::OK,
            ApiResponse::new(
                req_id.0,
                HealthData {
                    status: "ok",
                    database: "ok",
                },
            ),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: storage unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiResponse::new(
                    req_id.0,
                    HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                ),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
