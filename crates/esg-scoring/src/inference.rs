//! Turns raw provider responses into a complete `EsgSnapshot`.
//!
//! Never fails: each missing or malformed signal degrades to a static default,
//! and with no usable signal at all the fixed default snapshot is returned.

use esg_core::normalize::{clamp_score, normalize_score, round_to};
use esg_core::{
    EsgSnapshot, FacilityEmission, FinancialEsgScores, Industry, PillarMetrics, RandomSource, RawSignals,
    SubMetric, Trend, ESTIMATED_SOURCE,
};

pub const DEFAULT_ENVIRONMENTAL_BASE: f64 = 70.0;
pub const DEFAULT_SOCIAL_BASE: f64 = 75.0;
pub const DEFAULT_GOVERNANCE_BASE: f64 = 75.0;

/// Controversy count used when live signals exist but no emissions data does
pub const DEFAULT_CONTROVERSIES: u32 = 1;

const SOURCE_FINNHUB: &str = "Finnhub";
const SOURCE_EDGAR: &str = "SEC EDGAR";
const SOURCE_EPA: &str = "EPA Envirofacts";

const ENV_BASE_FLOOR: f64 = 50.0;
const ENV_BASE_CEILING: f64 = 95.0;
const MAX_FACILITY_PENALTY: f64 = 8.0;

/// Average releases below this mark the environmental fillers as improving
const IMPROVING_EMISSIONS_CUTOFF: f64 = 80_000.0;
const DECLINING_EMISSIONS_CUTOFF: f64 = 275_000.0;

/// Filler metric: seeded from the pillar base times a factor drawn from `[low, high)`
struct FillerMetric {
    name: &'static str,
    weight: f64,
    low: f64,
    high: f64,
}

const ENVIRONMENTAL_FILLERS: [FillerMetric; 3] = [
    FillerMetric { name: "Water Management", weight: 0.15, low: 0.92, high: 1.04 },
    FillerMetric { name: "Waste Reduction", weight: 0.20, low: 0.96, high: 1.08 },
    FillerMetric { name: "Biodiversity", weight: 0.20, low: 0.85, high: 0.95 },
];

const SOCIAL_FILLERS: [FillerMetric; 4] = [
    FillerMetric { name: "Diversity", weight: 0.20, low: 0.88, high: 1.00 },
    FillerMetric { name: "Employee Safety", weight: 0.15, low: 0.98, high: 1.08 },
    FillerMetric { name: "Community", weight: 0.20, low: 0.92, high: 1.02 },
    FillerMetric { name: "Human Rights", weight: 0.20, low: 0.95, high: 1.05 },
];

const GOVERNANCE_FILLERS: [FillerMetric; 4] = [
    FillerMetric { name: "Ethics", weight: 0.25, low: 0.95, high: 1.05 },
    FillerMetric { name: "Compensation", weight: 0.15, low: 0.85, high: 0.92 },
    FillerMetric { name: "Shareholder Rights", weight: 0.20, low: 0.94, high: 1.02 },
    FillerMetric { name: "Transparency", weight: 0.15, low: 0.90, high: 1.00 },
];

/// Valid facility rows, summarized
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionsSummary {
    pub facility_count: u32,
    pub total_releases: f64,
    pub average_releases: f64,
}

/// Disclosure keywords detected in the filing text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeywordSignals {
    pub climate: bool,
    pub renewable: bool,
    pub labor: bool,
    pub board: bool,
}

impl KeywordSignals {
    pub fn detect(document: &serde_json::Value) -> Self {
        let text = document.to_string().to_lowercase();
        Self {
            climate: text.contains("climate"),
            renewable: text.contains("renewable"),
            labor: text.contains("labor") || text.contains("labour"),
            board: text.contains("board"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PillarBase {
    value: f64,
    source: &'static str,
}

/// Keyword-driven metric: score offset by whether the keyword appeared
struct KeywordRule {
    name: &'static str,
    weight: f64,
    present_offset: f64,
    absent_offset: f64,
    present_trend: Trend,
    absent_trend: Trend,
}

const GHG_RULE: KeywordRule = KeywordRule {
    name: "GHG Emissions",
    weight: 0.25,
    present_offset: 0.0,
    absent_offset: -10.0,
    present_trend: Trend::Improving,
    absent_trend: Trend::Stable,
};

const RENEWABLE_RULE: KeywordRule = KeywordRule {
    name: "Renewable Energy",
    weight: 0.20,
    present_offset: 5.0,
    absent_offset: -5.0,
    present_trend: Trend::Improving,
    absent_trend: Trend::Stable,
};

const LABOR_RULE: KeywordRule = KeywordRule {
    name: "Labor Practices",
    weight: 0.25,
    present_offset: 0.0,
    absent_offset: -10.0,
    present_trend: Trend::Improving,
    absent_trend: Trend::Stable,
};

const BOARD_RULE: KeywordRule = KeywordRule {
    name: "Board Structure",
    weight: 0.25,
    present_offset: 0.0,
    absent_offset: -10.0,
    present_trend: Trend::Stable,
    absent_trend: Trend::Declining,
};

/// Score band for average releases per facility; lower emissions score higher
pub fn emissions_band_score(average_releases: f64) -> f64 {
    match average_releases {
        a if a < 25_000.0 => 88.0,
        a if a < 80_000.0 => 80.0,
        a if a < 275_000.0 => 72.0,
        a if a < 500_000.0 => 64.0,
        _ => 56.0,
    }
}

/// Diminishing penalty for operating many facilities, capped at 8 points
pub fn facility_penalty(facility_count: u32) -> f64 {
    ((facility_count as f64 + 1.0).log2() * 3.0)
        .round()
        .min(MAX_FACILITY_PENALTY)
}

pub fn industry_boost(industry: Industry) -> f64 {
    match industry {
        Industry::Technology => 8.0,
        Industry::Finance => 5.0,
        Industry::Retail => 3.0,
        _ => 0.0,
    }
}

pub fn environmental_base_from_emissions(summary: &EmissionsSummary, industry: Industry) -> f64 {
    let raw = emissions_band_score(summary.average_releases) - facility_penalty(summary.facility_count)
        + industry_boost(industry);
    raw.clamp(ENV_BASE_FLOOR, ENV_BASE_CEILING)
}

pub fn controversies_from_facilities(facility_count: u32) -> u32 {
    match facility_count {
        n if n > 5 => 2,
        n if n > 2 => 1,
        _ => 0,
    }
}

/// Drop rows with unparseable releases. `None` when nothing valid remains.
pub fn summarize_emissions(rows: &[FacilityEmission]) -> Option<EmissionsSummary> {
    let releases: Vec<f64> = rows
        .iter()
        .filter_map(|row| match row.releases() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!("Skipping facility row: {}", e);
                None
            }
        })
        .collect();

    if releases.is_empty() {
        return None;
    }

    let total_releases: f64 = releases.iter().sum();
    let facility_count = releases.len() as u32;
    Some(EmissionsSummary {
        facility_count,
        total_releases,
        average_releases: total_releases / facility_count as f64,
    })
}

fn surfaced(score: f64) -> f64 {
    round_to(clamp_score(score), 1)
}

fn static_metric(name: &str, score: f64, weight: f64, trend: Trend) -> SubMetric {
    SubMetric {
        name: name.to_string(),
        score,
        weight,
        trend,
        source: ESTIMATED_SOURCE.to_string(),
    }
}

fn keyword_metric(rule: &KeywordRule, base: PillarBase, present: Option<bool>) -> SubMetric {
    let (score, trend, source) = match present {
        Some(true) => (base.value + rule.present_offset, rule.present_trend, SOURCE_EDGAR),
        Some(false) => (base.value + rule.absent_offset, rule.absent_trend, SOURCE_EDGAR),
        None => (base.value, Trend::Stable, base.source),
    };
    SubMetric {
        name: rule.name.to_string(),
        score: surfaced(score),
        weight: rule.weight,
        trend,
        source: source.to_string(),
    }
}

fn filler_metrics<R: RandomSource + ?Sized>(
    fillers: &[FillerMetric],
    base: PillarBase,
    trend: Trend,
    rng: &mut R,
) -> Vec<SubMetric> {
    fillers
        .iter()
        .map(|filler| {
            let factor = filler.low + rng.next_f64() * (filler.high - filler.low);
            SubMetric {
                name: filler.name.to_string(),
                score: surfaced(base.value * factor),
                weight: filler.weight,
                trend,
                source: base.source.to_string(),
            }
        })
        .collect()
}

fn financial_base(score: Option<f64>, fallback: f64) -> PillarBase {
    match score {
        Some(s) if s.is_finite() => PillarBase {
            value: normalize_score(Some(s), fallback),
            source: SOURCE_FINNHUB,
        },
        _ => PillarBase {
            value: fallback,
            source: ESTIMATED_SOURCE,
        },
    }
}

fn base_trend(base: f64) -> Trend {
    if base >= 80.0 {
        Trend::Improving
    } else if base < 60.0 {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

fn emissions_trend(summary: Option<&EmissionsSummary>) -> Trend {
    match summary {
        Some(s) if s.average_releases < IMPROVING_EMISSIONS_CUTOFF => Trend::Improving,
        Some(s) if s.average_releases >= DECLINING_EMISSIONS_CUTOFF => Trend::Declining,
        _ => Trend::Stable,
    }
}

/// Metric Inference Engine
#[derive(Debug, Clone, Default)]
pub struct MetricInferenceEngine;

impl MetricInferenceEngine {
    pub fn new() -> Self {
        Self
    }

    /// Conservative static snapshot used when no provider returned anything usable.
    /// Weighted bases: environmental 70, social 75, governance 75.
    pub fn default_snapshot() -> EsgSnapshot {
        EsgSnapshot {
            environmental: PillarMetrics::new(vec![
                static_metric("GHG Emissions", 72.0, 0.25, Trend::Improving),
                static_metric("Renewable Energy", 65.0, 0.20, Trend::Stable),
                static_metric("Water Management", 74.0, 0.15, Trend::Improving),
                static_metric("Waste Reduction", 76.0, 0.20, Trend::Improving),
                static_metric("Biodiversity", 64.0, 0.20, Trend::Declining),
            ]),
            social: PillarMetrics::new(vec![
                static_metric("Labor Practices", 78.0, 0.25, Trend::Stable),
                static_metric("Diversity", 70.0, 0.20, Trend::Improving),
                static_metric("Employee Safety", 80.0, 0.15, Trend::Improving),
                static_metric("Community", 72.0, 0.20, Trend::Stable),
                static_metric("Human Rights", 76.0, 0.20, Trend::Stable),
            ]),
            governance: PillarMetrics::new(vec![
                static_metric("Board Structure", 80.0, 0.25, Trend::Stable),
                static_metric("Ethics", 78.0, 0.25, Trend::Improving),
                static_metric("Compensation", 66.0, 0.15, Trend::Stable),
                static_metric("Shareholder Rights", 74.0, 0.20, Trend::Improving),
                static_metric("Transparency", 72.0, 0.15, Trend::Stable),
            ]),
            controversies: 0,
        }
    }

    /// Build a snapshot from whatever signals arrived. `rng` only diversifies filler metrics.
    pub fn infer<R: RandomSource + ?Sized>(
        &self,
        signals: &RawSignals,
        industry: Industry,
        rng: &mut R,
    ) -> EsgSnapshot {
        let financial = signals.financial.as_ref().filter(|f| f.has_any());
        let disclosures = signals.disclosures.as_ref().filter(|d| !d.is_null());
        let emissions = signals.emissions.as_deref().and_then(summarize_emissions);

        if financial.is_none() && disclosures.is_none() && emissions.is_none() {
            tracing::debug!("No usable ESG signal, falling back to default snapshot");
            return Self::default_snapshot();
        }

        let empty = FinancialEsgScores::default();
        let financial = financial.unwrap_or(&empty);
        let keywords = disclosures.map(KeywordSignals::detect);

        let environmental_base = match &emissions {
            Some(summary) => PillarBase {
                value: environmental_base_from_emissions(summary, industry),
                source: SOURCE_EPA,
            },
            None => financial_base(financial.environment_score, DEFAULT_ENVIRONMENTAL_BASE),
        };
        let social_base = financial_base(financial.social_score, DEFAULT_SOCIAL_BASE);
        let governance_base = financial_base(financial.governance_score, DEFAULT_GOVERNANCE_BASE);

        tracing::debug!(
            "Inferred pillar bases E={:.1} ({}) S={:.1} ({}) G={:.1} ({}), keywords={:?}",
            environmental_base.value,
            environmental_base.source,
            social_base.value,
            social_base.source,
            governance_base.value,
            governance_base.source,
            keywords
        );

        let mut environmental_metrics = vec![
            keyword_metric(&GHG_RULE, environmental_base, keywords.map(|k| k.climate)),
            keyword_metric(&RENEWABLE_RULE, environmental_base, keywords.map(|k| k.renewable)),
        ];
        environmental_metrics.extend(filler_metrics(
            &ENVIRONMENTAL_FILLERS,
            environmental_base,
            emissions_trend(emissions.as_ref()),
            rng,
        ));

        let mut social_metrics = vec![keyword_metric(&LABOR_RULE, social_base, keywords.map(|k| k.labor))];
        social_metrics.extend(filler_metrics(
            &SOCIAL_FILLERS,
            social_base,
            base_trend(social_base.value),
            rng,
        ));

        let mut governance_metrics = vec![keyword_metric(&BOARD_RULE, governance_base, keywords.map(|k| k.board))];
        governance_metrics.extend(filler_metrics(
            &GOVERNANCE_FILLERS,
            governance_base,
            base_trend(governance_base.value),
            rng,
        ));

        let mut environmental = PillarMetrics::new(environmental_metrics);
        if let Some(summary) = &emissions {
            environmental.facility_count = Some(summary.facility_count);
            environmental.total_releases = Some(summary.total_releases);
            environmental.average_releases = Some(summary.average_releases);
        }

        let controversies = emissions
            .as_ref()
            .map(|s| controversies_from_facilities(s.facility_count))
            .unwrap_or(DEFAULT_CONTROVERSIES);

        EsgSnapshot {
            environmental,
            social: PillarMetrics::new(social_metrics),
            governance: PillarMetrics::new(governance_metrics),
            controversies,
        }
    }
}
