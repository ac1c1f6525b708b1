use chrono::{DateTime, Utc};
use esg_core::{CompositeScore, EsgSnapshot, ForecastPoint, Framework, Industry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What to refresh. Only `symbol` is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EsgRequest {
    pub symbol: String,
    /// SEC CIK; resolved from the ticker when absent
    #[serde(default)]
    pub cik: Option<String>,
    /// Parent company name for the emissions lookup
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    /// Built-in framework name; the configured default when absent
    #[serde(default)]
    pub framework: Option<String>,
}

impl EsgRequest {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }
}

/// Which providers contributed to a snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SignalCoverage {
    pub financial: bool,
    pub disclosures: bool,
    pub emissions: bool,
}

/// The published snapshot-of-record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EsgRecord {
    pub symbol: String,
    pub company_name: String,
    pub cik: Option<String>,
    pub industry: Industry,
    pub framework: Framework,
    pub snapshot: EsgSnapshot,
    pub composite: CompositeScore,
    pub coverage: SignalCoverage,
    /// True when every sub-metric came from static defaults
    pub estimated: bool,
    pub generation: u64,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    Published(Arc<EsgRecord>),
    /// A later refresh started before this one finished; its result was dropped
    Superseded { generation: u64, latest: u64 },
}

impl RefreshOutcome {
    pub fn record(&self) -> Option<&Arc<EsgRecord>> {
        match self {
            RefreshOutcome::Published(record) => Some(record),
            RefreshOutcome::Superseded { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ForecastSource {
    /// Served from the precomputed override file
    Precomputed,
    Generated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ForecastReport {
    pub symbol: String,
    pub source: ForecastSource,
    pub points: Vec<ForecastPoint>,
}
