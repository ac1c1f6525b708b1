//! ESG scoring HTTP API
//!
//! Wires the signal fetchers into an `EsgOrchestrator` and serves it over axum.

use anyhow::{Context, Result};
use axum::{
    error_handling::HandleErrorLayer,
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    BoxError, Json, Router,
};
use esg_core::EsgError;
use esg_orchestrator::{EsgOrchestrator, OrchestratorError};
use serde::Serialize;
use signal_fetchers::{EdgarClient, EpaClient, FinnhubClient, ForecastOverrides};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

pub mod config;
pub mod esg_routes;
pub mod reference_routes;
mod request_id;

pub use config::ServerConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Response envelope shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Handler error carrying the HTTP status to answer with
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: impl Into<anyhow::Error>) -> Self {
        Self {
            status,
            error: error.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(error: E) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.error);
        } else {
            tracing::debug!("Request rejected ({}): {:#}", self.status, self.error);
        }
        let body = ApiResponse::<()>::error(format!("{:#}", self.error));
        (self.status, Json(body)).into_response()
    }
}

/// Map scoring errors to client or upstream statuses
pub fn esg_error(e: EsgError) -> AppError {
    let status = match &e {
        EsgError::InvalidFramework(_) | EsgError::MalformedSignal(_) => StatusCode::BAD_REQUEST,
        EsgError::FetchError { .. } => StatusCode::BAD_GATEWAY,
    };
    AppError::with_status(status, e)
}

pub fn orchestrator_error(e: OrchestratorError) -> AppError {
    match e {
        OrchestratorError::Esg(inner) => esg_error(inner),
        OrchestratorError::UnknownFramework(_) | OrchestratorError::InvalidRequest(_) => {
            AppError::with_status(StatusCode::BAD_REQUEST, e)
        }
        OrchestratorError::NoRecord => AppError::with_status(StatusCode::NOT_FOUND, e),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<EsgOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: EsgOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "ESG Scoring API", description = "Composite ESG scores, ratings and forecasts"),
    paths(
        health,
        reference_routes::list_frameworks,
        reference_routes::get_materiality,
        esg_routes::refresh_esg,
        esg_routes::get_current,
        esg_routes::get_forecast,
        esg_routes::score_snapshot,
    ),
    components(schemas(
        esg_core::EsgSnapshot,
        esg_core::PillarMetrics,
        esg_core::SubMetric,
        esg_core::Trend,
        esg_core::Framework,
        esg_core::FrameworkWeights,
        esg_core::CompositeScore,
        esg_core::RatingGrade,
        esg_core::ForecastPoint,
        esg_core::Industry,
        esg_core::MaterialityMap,
        esg_orchestrator::EsgRequest,
        esg_orchestrator::EsgRecord,
        esg_orchestrator::SignalCoverage,
        esg_orchestrator::ForecastReport,
        esg_orchestrator::ForecastSource,
        esg_routes::ScoreRequest,
        esg_routes::ScoreResponse,
        reference_routes::FrameworkInfo,
    )),
    tags(
        (name = "ESG", description = "Scoring, snapshot-of-record and forecasts"),
        (name = "Reference", description = "Frameworks and industry materiality"),
        (name = "System", description = "Health"),
    )
)]
pub struct ApiDoc;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub has_record: bool,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "System"
)]
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthStatus>> {
    Json(ApiResponse::success(HealthStatus {
        status: "ok".to_string(),
        has_record: state.orchestrator.record().await.is_some(),
        timestamp: chrono::Utc::now(),
    }))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn handle_timeout(err: BoxError) -> (StatusCode, Json<ApiResponse<()>>) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, Json(ApiResponse::error("request timed out")))
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("unhandled error: {}", err))),
        )
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Full router with middleware. Kept separate from `run_server` so tests can drive it in-process.
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .merge(reference_routes::reference_routes())
        .merge(esg_routes::esg_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout))
                .timeout(REQUEST_TIMEOUT),
        )
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<axum::body::Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .layer(cors_layer(cors_origins))
}

/// Wire the configured providers into an orchestrator
pub fn build_orchestrator(config: &ServerConfig) -> Result<EsgOrchestrator> {
    let default_framework = esg_core::framework_by_name(&config.default_framework)
        .with_context(|| format!("unknown default framework {}", config.default_framework))?;
    let timeout = config.fetch_timeout;

    let mut orchestrator = EsgOrchestrator::new(default_framework).with_fetch_timeout(timeout);

    match &config.finnhub_api_key {
        Some(key) => {
            let mut finnhub = FinnhubClient::new(key.clone(), timeout);
            if let Some(url) = &config.finnhub_base_url {
                finnhub = finnhub.with_base_url(url.clone());
            }
            orchestrator = orchestrator.with_financial_provider(Arc::new(finnhub));
        }
        None => tracing::warn!("FINNHUB_API_KEY not set, financial ESG scores disabled"),
    }

    let mut edgar = EdgarClient::new(config.sec_user_agent.as_deref(), timeout);
    if config.sec_data_base_url.is_some() || config.sec_www_base_url.is_some() {
        edgar = edgar.with_base_urls(
            config
                .sec_data_base_url
                .clone()
                .unwrap_or_else(|| "https://data.sec.gov".to_string()),
            config
                .sec_www_base_url
                .clone()
                .unwrap_or_else(|| "https://www.sec.gov".to_string()),
        );
    }
    orchestrator = orchestrator.with_disclosure_provider(Arc::new(edgar));

    let mut epa = EpaClient::new(timeout);
    if let Some(url) = &config.epa_base_url {
        epa = epa.with_base_url(url.clone());
    }
    orchestrator = orchestrator.with_emissions_provider(Arc::new(epa));

    if let Some(path) = &config.forecast_file {
        let overrides = ForecastOverrides::from_path(path)
            .with_context(|| format!("failed to load forecast overrides from {}", path.display()))?;
        orchestrator = orchestrator.with_overrides(overrides);
    }

    Ok(orchestrator)
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

pub async fn run_server() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env().context("invalid server configuration")?;
    init_tracing(config.json_logging);

    tracing::info!("Starting ESG API server");
    let orchestrator = build_orchestrator(&config)?;
    let app = build_router(AppState::new(orchestrator), &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutting down");
        })
        .await
        .context("server error")
}
