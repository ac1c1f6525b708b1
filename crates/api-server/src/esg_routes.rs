//! ESG API Routes
//!
//! Refresh and read the snapshot-of-record, forecast it, and score
//! caller-supplied snapshots.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use esg_core::{CompositeScore, EsgSnapshot, Framework};
use esg_orchestrator::{EsgRecord, EsgRequest, ForecastReport, RefreshOutcome};
use esg_scoring::ScoreAggregator;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::request_id::RequestId;
use crate::{esg_error, orchestrator_error, ApiResponse, AppError, AppState};

#[derive(Deserialize, utoipa::IntoParams)]
pub struct CurrentQuery {
    /// Built-in framework to re-score under
    pub framework: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct ForecastQuery {
    /// Quarters to project (default 4)
    pub horizon: Option<usize>,
}

/// Snapshot to score, with either a built-in framework name or explicit weights
#[derive(Deserialize, utoipa::ToSchema)]
pub struct ScoreRequest {
    pub snapshot: EsgSnapshot,
    /// Built-in framework, or the label for `weights`
    pub framework: Option<String>,
    /// `{"E": .., "S": .., "G": ..}`
    pub weights: Option<HashMap<String, f64>>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ScoreResponse {
    pub framework: Framework,
    pub score: CompositeScore,
    /// Pillars whose sub-metric weights do not sum to 1.0
    pub warnings: Vec<String>,
}

pub fn esg_routes() -> Router<AppState> {
    Router::new()
        .route("/api/esg/refresh", post(refresh_esg))
        .route("/api/esg/current", get(get_current))
        .route("/api/esg/forecast", get(get_forecast))
        .route("/api/esg/score", post(score_snapshot))
}

/// Fetch, infer and score a company, publishing the result as the snapshot-of-record
#[utoipa::path(
    post,
    path = "/api/esg/refresh",
    request_body = EsgRequest,
    responses(
        (status = 200, description = "Published ESG record", body = EsgRecord),
        (status = 400, description = "Missing symbol or unknown framework"),
        (status = 409, description = "Superseded by a newer refresh")
    ),
    tag = "ESG"
)]
pub async fn refresh_esg(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(req): Json<EsgRequest>,
) -> Result<Json<ApiResponse<EsgRecord>>, AppError> {
    tracing::info!("ESG refresh for {} (request {})", req.symbol, request_id);

    match state.orchestrator.refresh(req).await.map_err(orchestrator_error)? {
        RefreshOutcome::Published(record) => Ok(Json(ApiResponse::success(record.as_ref().clone()))),
        RefreshOutcome::Superseded { generation, latest } => Err(AppError::with_status(
            StatusCode::CONFLICT,
            anyhow::anyhow!("refresh {} superseded by refresh {}", generation, latest),
        )),
    }
}

/// Current snapshot-of-record, optionally re-scored under another framework
#[utoipa::path(
    get,
    path = "/api/esg/current",
    params(CurrentQuery),
    responses(
        (status = 200, description = "Current ESG record", body = EsgRecord),
        (status = 400, description = "Unknown framework"),
        (status = 404, description = "Nothing published yet")
    ),
    tag = "ESG"
)]
pub async fn get_current(
    State(state): State<AppState>,
    Query(query): Query<CurrentQuery>,
) -> Result<Json<ApiResponse<EsgRecord>>, AppError> {
    let record = state
        .orchestrator
        .current(query.framework.as_deref())
        .await
        .map_err(orchestrator_error)?;
    Ok(Json(ApiResponse::success(record)))
}

/// Quarterly forecast for the snapshot-of-record
#[utoipa::path(
    get,
    path = "/api/esg/forecast",
    params(ForecastQuery),
    responses(
        (status = 200, description = "Forecast points", body = ForecastReport),
        (status = 404, description = "Nothing published yet")
    ),
    tag = "ESG"
)]
pub async fn get_forecast(
    State(state): State<AppState>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<ApiResponse<ForecastReport>>, AppError> {
    let report = state
        .orchestrator
        .forecast(query.horizon)
        .await
        .map_err(orchestrator_error)?;
    Ok(Json(ApiResponse::success(report)))
}

/// Score a caller-supplied snapshot without touching the snapshot-of-record
#[utoipa::path(
    post,
    path = "/api/esg/score",
    request_body = ScoreRequest,
    responses(
        (status = 200, description = "Composite score and rating", body = ScoreResponse),
        (status = 400, description = "Invalid or unknown framework")
    ),
    tag = "ESG"
)]
pub async fn score_snapshot(
    State(state): State<AppState>,
    Json(req): Json<ScoreRequest>,
) -> Result<Json<ApiResponse<ScoreResponse>>, AppError> {
    let framework = match &req.weights {
        Some(weights) => {
            let name = req.framework.as_deref().unwrap_or("Custom");
            Framework::from_weights(name, weights).map_err(esg_error)?
        }
        None => state
            .orchestrator
            .resolve_framework(req.framework.as_deref())
            .map_err(orchestrator_error)?,
    };

    let score = state
        .orchestrator
        .score_snapshot(&req.snapshot, &framework)
        .map_err(esg_error)?;
    let warnings = ScoreAggregator::check_weights(&req.snapshot)
        .into_iter()
        .map(|w| format!("{} sub-metric weights sum to {:.3}", w.pillar.as_str(), w.weight_sum))
        .collect();

    Ok(Json(ApiResponse::success(ScoreResponse {
        framework,
        score,
        warnings,
    })))
}
