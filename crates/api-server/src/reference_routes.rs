use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use esg_core::{builtin_frameworks, framework_description, industry_materiality, FrameworkWeights, Industry, MaterialityMap};
use serde::Serialize;

use crate::{ApiResponse, AppError, AppState};

#[derive(Serialize, utoipa::ToSchema)]
pub struct FrameworkInfo {
    pub name: String,
    pub description: String,
    pub weights: FrameworkWeights,
    pub is_default: bool,
}

pub fn reference_routes() -> Router<AppState> {
    Router::new()
        .route("/api/frameworks", get(list_frameworks))
        .route("/api/materiality/:industry", get(get_materiality))
}

/// Built-in reporting frameworks and their pillar weights
#[utoipa::path(
    get,
    path = "/api/frameworks",
    responses((status = 200, description = "Built-in frameworks")),
    tag = "Reference"
)]
pub async fn list_frameworks(State(state): State<AppState>) -> Json<ApiResponse<Vec<FrameworkInfo>>> {
    let default_name = &state.orchestrator.default_framework().name;
    let frameworks = builtin_frameworks()
        .into_iter()
        .map(|f| FrameworkInfo {
            description: framework_description(&f.name).to_string(),
            is_default: f.name.eq_ignore_ascii_case(default_name),
            name: f.name,
            weights: f.weights,
        })
        .collect();
    Json(ApiResponse::success(frameworks))
}

/// Most material topics per pillar for an industry
#[utoipa::path(
    get,
    path = "/api/materiality/{industry}",
    params(("industry" = String, Path, description = "technology, energy, finance, manufacturing or retail")),
    responses(
        (status = 200, description = "Materiality table", body = MaterialityMap),
        (status = 400, description = "Unknown industry")
    ),
    tag = "Reference"
)]
pub async fn get_materiality(Path(industry): Path<String>) -> Result<Json<ApiResponse<MaterialityMap>>, AppError> {
    let map = industry_materiality(Industry::from_name(&industry)).ok_or_else(|| {
        AppError::with_status(
            StatusCode::BAD_REQUEST,
            anyhow::anyhow!("Unknown industry: {}", industry),
        )
    })?;
    Ok(Json(ApiResponse::success(map)))
}
