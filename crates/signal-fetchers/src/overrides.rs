use esg_core::{EsgError, ForecastPoint};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Precomputed forecasts keyed by ticker, consulted before the on-the-fly generator.
#[derive(Debug, Clone, Default)]
pub struct ForecastOverrides {
    by_ticker: HashMap<String, Vec<ForecastPoint>>,
}

/// Row layout written by the offline forecasting script
#[derive(Debug, Deserialize)]
struct ScriptForecast {
    period: String,
    #[serde(default)]
    month: Option<String>,
    #[serde(rename = "E")]
    e: f64,
    #[serde(rename = "S")]
    s: f64,
    #[serde(rename = "G")]
    g: f64,
    #[serde(rename = "Total")]
    total: f64,
    confidence: f64,
}

#[derive(Debug, Deserialize)]
struct ScriptEntry {
    ticker: String,
    forecasts: Vec<ScriptForecast>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OverrideDocument {
    /// `[{ticker, company_name, forecasts: [...]}]`
    Script(Vec<ScriptEntry>),
    /// `{ "AAPL": [ForecastPoint, ...] }`
    Map(HashMap<String, Vec<ForecastPoint>>),
}

impl From<ScriptForecast> for ForecastPoint {
    fn from(f: ScriptForecast) -> Self {
        ForecastPoint {
            period: f.period,
            month: f.month,
            environmental: f.e,
            social: f.s,
            governance: f.g,
            total: f.total,
            confidence_percent: f.confidence,
        }
    }
}

impl ForecastOverrides {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, EsgError> {
        let doc: OverrideDocument = serde_json::from_str(json)
            .map_err(|e| EsgError::MalformedSignal(format!("forecast override document: {}", e)))?;

        let by_ticker = match doc {
            OverrideDocument::Script(entries) => entries
                .into_iter()
                .map(|entry| {
                    let points = entry.forecasts.into_iter().map(ForecastPoint::from).collect();
                    (entry.ticker.to_uppercase(), points)
                })
                .collect(),
            OverrideDocument::Map(map) => map
                .into_iter()
                .map(|(ticker, points)| (ticker.to_uppercase(), points))
                .collect(),
        };

        Ok(Self { by_ticker })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EsgError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            EsgError::MalformedSignal(format!("cannot read forecast overrides {}: {}", path.display(), e))
        })?;
        let overrides = Self::from_json_str(&contents)?;
        tracing::info!(
            "Loaded forecast overrides for {} tickers from {}",
            overrides.len(),
            path.display()
        );
        Ok(overrides)
    }

    /// Precomputed points for `ticker`, truncated to `horizon`
    pub fn get(&self, ticker: &str, horizon: usize) -> Option<Vec<ForecastPoint>> {
        self.by_ticker
            .get(&ticker.trim().to_uppercase())
            .filter(|points| !points.is_empty())
            .map(|points| points.iter().take(horizon).cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.by_ticker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ticker.is_empty()
    }
}
