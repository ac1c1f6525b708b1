use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::EsgError;

/// Provenance label for values that did not come from any live provider.
pub const ESTIMATED_SOURCE: &str = "Estimated";

/// One of the three top-level ESG categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Pillar {
    Environmental,
    Social,
    Governance,
}

impl Pillar {
    pub const ALL: [Pillar; 3] = [Pillar::Environmental, Pillar::Social, Pillar::Governance];

    pub fn as_str(&self) -> &'static str {
        match self {
            Pillar::Environmental => "environmental",
            Pillar::Social => "social",
            Pillar::Governance => "governance",
        }
    }
}

/// Qualitative direction of a sub-metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

/// A single named, weighted, scored indicator within a pillar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SubMetric {
    pub name: String,
    pub score: f64,  // 0-100 once surfaced
    pub weight: f64, // relative weight within the pillar
    pub trend: Trend,
    pub source: String,
}

/// Sub-metrics for one pillar, with display-only counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PillarMetrics {
    pub metrics: Vec<SubMetric>,
    #[serde(default)]
    pub facility_count: Option<u32>,
    #[serde(default)]
    pub total_releases: Option<f64>,
    #[serde(default)]
    pub average_releases: Option<f64>,
}

impl PillarMetrics {
    pub fn new(metrics: Vec<SubMetric>) -> Self {
        Self {
            metrics,
            ..Default::default()
        }
    }

    /// Raw weighted sum. Weights are deliberately not renormalized.
    pub fn weighted_sum(&self) -> f64 {
        self.metrics.iter().map(|m| m.score * m.weight).sum()
    }

    pub fn weight_sum(&self) -> f64 {
        self.metrics.iter().map(|m| m.weight).sum()
    }
}

/// Everything inferred for one (company, industry, provider response) tuple.
/// Replaced wholesale on refetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EsgSnapshot {
    pub environmental: PillarMetrics,
    pub social: PillarMetrics,
    pub governance: PillarMetrics,
    pub controversies: u32,
}

impl EsgSnapshot {
    pub fn pillar(&self, pillar: Pillar) -> &PillarMetrics {
        match pillar {
            Pillar::Environmental => &self.environmental,
            Pillar::Social => &self.social,
            Pillar::Governance => &self.governance,
        }
    }

    /// True when no live provider contributed to any sub-metric
    pub fn is_estimated(&self) -> bool {
        Pillar::ALL
            .iter()
            .flat_map(|p| self.pillar(*p).metrics.iter())
            .all(|m| m.source == ESTIMATED_SOURCE)
    }
}

/// Pillar-to-composite weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FrameworkWeights {
    #[serde(rename = "E")]
    pub e: f64,
    #[serde(rename = "S")]
    pub s: f64,
    #[serde(rename = "G")]
    pub g: f64,
}

impl FrameworkWeights {
    pub fn sum(&self) -> f64 {
        self.e + self.s + self.g
    }
}

/// A named reporting-framework weighting scheme (GRI, SASB, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Framework {
    pub name: String,
    pub weights: FrameworkWeights,
}

impl Framework {
    pub fn new(name: impl Into<String>, e: f64, s: f64, g: f64) -> Self {
        Self {
            name: name.into(),
            weights: FrameworkWeights { e, s, g },
        }
    }

    /// Build from a loose key/value map (`E`/`S`/`G`, case-insensitive).
    pub fn from_weights(name: impl Into<String>, weights: &HashMap<String, f64>) -> Result<Self, EsgError> {
        let lookup = |key: &str| {
            weights
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| *v)
                .ok_or_else(|| EsgError::InvalidFramework(format!("missing weight for key '{}'", key)))
        };
        let framework = Self::new(name, lookup("E")?, lookup("S")?, lookup("G")?);
        framework.validate()?;
        Ok(framework)
    }

    /// Rejects negative or non-finite weights. A sum away from 1.0 is tolerated.
    pub fn validate(&self) -> Result<(), EsgError> {
        let w = &self.weights;
        for (key, value) in [("E", w.e), ("S", w.s), ("G", w.g)] {
            if !value.is_finite() || value < 0.0 {
                return Err(EsgError::InvalidFramework(format!(
                    "{}: weight {} = {} is not a finite non-negative number",
                    self.name, key, value
                )));
            }
        }
        Ok(())
    }
}

/// Letter grade. Variant order is worst to best so `Ord` follows grade order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum RatingGrade {
    #[serde(rename = "CCC")]
    Ccc,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "BB")]
    Bb,
    #[serde(rename = "BBB")]
    Bbb,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "AA")]
    Aa,
    #[serde(rename = "AAA")]
    Aaa,
}

impl RatingGrade {
    pub fn as_str(&self) -> &'static str {
        match self {
            RatingGrade::Aaa => "AAA",
            RatingGrade::Aa => "AA",
            RatingGrade::A => "A",
            RatingGrade::Bbb => "BBB",
            RatingGrade::Bb => "BB",
            RatingGrade::B => "B",
            RatingGrade::Ccc => "CCC",
        }
    }
}

impl fmt::Display for RatingGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite result, recomputed on demand from a snapshot and framework
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CompositeScore {
    pub total: f64,
    pub environmental: f64,
    pub social: f64,
    pub governance: f64,
    pub rating: RatingGrade,
}

/// One projected quarter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ForecastPoint {
    pub period: String,
    #[serde(default)]
    pub month: Option<String>,
    pub environmental: f64,
    pub social: f64,
    pub governance: f64,
    pub total: f64,
    pub confidence_percent: f64,
}

/// Industry category, used as a scoring modifier only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Industry {
    Technology,
    Energy,
    Finance,
    Manufacturing,
    Retail,
    Other,
}

impl Industry {
    pub const KNOWN: [Industry; 5] = [
        Industry::Technology,
        Industry::Energy,
        Industry::Finance,
        Industry::Manufacturing,
        Industry::Retail,
    ];

    /// Case-insensitive; anything unrecognized is `Other`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "technology" | "tech" => Industry::Technology,
            "energy" => Industry::Energy,
            "finance" | "financial" => Industry::Finance,
            "manufacturing" => Industry::Manufacturing,
            "retail" => Industry::Retail,
            _ => Industry::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Industry::Technology => "technology",
            Industry::Energy => "energy",
            Industry::Finance => "finance",
            Industry::Manufacturing => "manufacturing",
            Industry::Retail => "retail",
            Industry::Other => "other",
        }
    }
}

/// Pillar scores as returned by the financial-ESG provider (Finnhub field names)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialEsgScores {
    #[serde(default)]
    pub environment_score: Option<f64>,
    #[serde(default)]
    pub social_score: Option<f64>,
    #[serde(default)]
    pub governance_score: Option<f64>,
    #[serde(default, alias = "totalESGScore")]
    pub total_score: Option<f64>,
}

impl FinancialEsgScores {
    pub fn has_any(&self) -> bool {
        [self.environment_score, self.social_score, self.governance_score]
            .iter()
            .any(|s| s.map(f64::is_finite).unwrap_or(false))
    }
}

/// One facility row from the emissions provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacilityEmission {
    #[serde(default, rename = "facilityName", alias = "FACILITY_NAME")]
    pub facility_name: Option<String>,
    /// Usually a stringified number, occasionally a bare number or garbage
    #[serde(default, rename = "totalReleases", alias = "TOTAL_RELEASES")]
    pub total_releases: Option<serde_json::Value>,
}

impl FacilityEmission {
    pub fn releases(&self) -> Result<f64, EsgError> {
        let parsed = match &self.total_releases {
            Some(serde_json::Value::Number(n)) => n.as_f64(),
            Some(serde_json::Value::String(s)) => s.trim().replace(',', "").parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(v) if v.is_finite() && v >= 0.0 => Ok(v),
            _ => Err(EsgError::MalformedSignal(format!(
                "totalReleases {:?} for facility {}",
                self.total_releases,
                self.facility_name.as_deref().unwrap_or("<unnamed>")
            ))),
        }
    }
}

/// Whatever the providers returned for one fetch cycle. Any field may be absent.
#[derive(Debug, Clone, Default)]
pub struct RawSignals {
    pub financial: Option<FinancialEsgScores>,
    pub disclosures: Option<serde_json::Value>,
    pub emissions: Option<Vec<FacilityEmission>>,
}

/// Ticker → CIK resolution result from SEC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyIdentity {
    pub ticker: String,
    pub cik: String,
    pub title: String,
}
