use chrono::{Datelike, Months, NaiveDate};
use esg_core::normalize::{clamp_score, mean, round_to};
use esg_core::{growth_rates_for, EsgSnapshot, ForecastPoint, GrowthRates, RandomSource};
use std::iter::FusedIterator;

use crate::aggregator::ScoreAggregator;

/// Quarters projected when the caller does not ask for a horizon
pub const DEFAULT_HORIZON: usize = 4;

const FORECAST_CEILING: f64 = 95.0;
const JITTER_SPAN: f64 = 0.5;
const MAX_CONFIDENCE: f64 = 92.0;
const MIN_CONFIDENCE: f64 = 82.0;
const CONFIDENCE_DECAY: f64 = 2.0;

/// Confidence for quarter `step` (1-based). Non-increasing in `step`.
pub fn confidence_for(step: usize) -> f64 {
    (MAX_CONFIDENCE - CONFIDENCE_DECAY * step as f64).max(MIN_CONFIDENCE)
}

/// `"Q3 2027"` and `"Jul 2027"` for a date
fn period_labels(date: NaiveDate) -> (String, String) {
    let quarter = (date.month() - 1) / 3 + 1;
    (
        format!("Q{} {}", quarter, date.year()),
        date.format("%b %Y").to_string(),
    )
}

/// Projects pillar scores forward one quarter at a time
#[derive(Debug, Clone, Default)]
pub struct ForecastGenerator;

impl ForecastGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Lazy projection of `horizon` quarters after `as_of`.
    ///
    /// Bases are the rounded pillar scores of `snapshot`; growth rates come from
    /// the per-ticker table. Nothing is computed until the iterator is advanced.
    pub fn forecast<'a, R: RandomSource + ?Sized>(
        &self,
        snapshot: &EsgSnapshot,
        ticker: &str,
        horizon: usize,
        as_of: NaiveDate,
        rng: &'a mut R,
    ) -> Forecast<'a, R> {
        Forecast {
            base_e: ScoreAggregator::pillar_score(&snapshot.environmental),
            base_s: ScoreAggregator::pillar_score(&snapshot.social),
            base_g: ScoreAggregator::pillar_score(&snapshot.governance),
            rates: growth_rates_for(ticker),
            as_of,
            step: 0,
            horizon,
            rng,
        }
    }
}

/// Iterator returned by [`ForecastGenerator::forecast`]
pub struct Forecast<'a, R: RandomSource + ?Sized> {
    base_e: f64,
    base_s: f64,
    base_g: f64,
    rates: GrowthRates,
    as_of: NaiveDate,
    step: usize,
    horizon: usize,
    rng: &'a mut R,
}

impl<R: RandomSource + ?Sized> Forecast<'_, R> {
    fn project(base: f64, rate: f64, step: usize, jitter: f64) -> f64 {
        clamp_score((base * (1.0 + rate * step as f64) + jitter).min(FORECAST_CEILING))
    }
}

impl<R: RandomSource + ?Sized> Iterator for Forecast<'_, R> {
    type Item = ForecastPoint;

    fn next(&mut self) -> Option<ForecastPoint> {
        if self.step >= self.horizon {
            return None;
        }
        self.step += 1;
        let i = self.step;

        // one draw per quarter, shared by all three pillars
        let jitter = (self.rng.next_f64() - 0.5) * JITTER_SPAN;
        let environmental = Self::project(self.base_e, self.rates.e, i, jitter);
        let social = Self::project(self.base_s, self.rates.s, i, jitter);
        let governance = Self::project(self.base_g, self.rates.g, i, jitter);
        let total = mean(&[environmental, social, governance]);

        let date = self
            .as_of
            .checked_add_months(Months::new(3 * i as u32))
            .unwrap_or(self.as_of);
        let (period, month) = period_labels(date);

        Some(ForecastPoint {
            period,
            month: Some(month),
            environmental: round_to(environmental, 1),
            social: round_to(social, 1),
            governance: round_to(governance, 1),
            total: round_to(total, 1),
            confidence_percent: confidence_for(i),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.horizon.saturating_sub(self.step);
        (remaining, Some(remaining))
    }
}

impl<R: RandomSource + ?Sized> ExactSizeIterator for Forecast<'_, R> {}

impl<R: RandomSource + ?Sized> FusedIterator for Forecast<'_, R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::MetricInferenceEngine;
    use esg_core::{FixedRandom, PillarMetrics, SeededRandom, SubMetric, Trend, ESTIMATED_SOURCE};

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2027, 4, 15).unwrap()
    }

    fn flat_snapshot(e: f64, s: f64, g: f64) -> EsgSnapshot {
        let pillar = |score: f64| {
            PillarMetrics::new(vec![SubMetric {
                name: "Metric".to_string(),
                score,
                weight: 1.0,
                trend: Trend::Stable,
                source: ESTIMATED_SOURCE.to_string(),
            }])
        };
        EsgSnapshot {
            environmental: pillar(e),
            social: pillar(s),
            governance: pillar(g),
            controversies: 0,
        }
    }

    #[test]
    fn test_confidence_schedule() {
        let schedule: Vec<f64> = (1..=8).map(confidence_for).collect();
        assert_eq!(schedule, vec![90.0, 88.0, 86.0, 84.0, 82.0, 82.0, 82.0, 82.0]);
        assert!(schedule.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_unknown_ticker_uses_default_growth() {
        let snapshot = MetricInferenceEngine::default_snapshot();
        let points: Vec<ForecastPoint> = ForecastGenerator::new()
            .forecast(&snapshot, "ZZZZ", 4, as_of(), &mut FixedRandom(0.5))
            .collect();

        assert_eq!(points.len(), 4);
        // bases 70/75/75, growth 0.5% per quarter, no jitter at 0.5
        assert_eq!(points[1].environmental, 70.7);
        assert_eq!(points[0].social, 75.4);
        assert_eq!(points[0].governance, 75.4);
        assert_eq!(points[3].environmental, 71.4);
        assert_eq!(points[3].social, 76.5);
        assert_eq!(points[0].confidence_percent, 90.0);
        assert_eq!(points[3].confidence_percent, 84.0);
    }

    #[test]
    fn test_total_is_mean_of_pillars() {
        let snapshot = flat_snapshot(60.0, 70.0, 90.0);
        let point = ForecastGenerator::new()
            .forecast(&snapshot, "ZZZZ", 1, as_of(), &mut FixedRandom(0.5))
            .next()
            .unwrap();
        // 60.3, 70.35, 90.45
        assert_eq!(point.total, 73.7);
    }

    #[test]
    fn test_projection_capped_at_95() {
        let snapshot = flat_snapshot(100.0, 94.0, 20.0);
        let points: Vec<ForecastPoint> = ForecastGenerator::new()
            .forecast(&snapshot, "NVDA", 8, as_of(), &mut FixedRandom(0.99))
            .collect();
        for p in &points {
            assert!(p.environmental <= 95.0);
            assert!(p.social <= 95.0);
            assert!(p.governance >= 0.0);
        }
        assert_eq!(points[0].environmental, 95.0);
    }

    #[test]
    fn test_jitter_shared_and_bounded() {
        let snapshot = flat_snapshot(60.0, 60.0, 60.0);
        let low: Vec<ForecastPoint> = ForecastGenerator::new()
            .forecast(&snapshot, "NFLX", 2, as_of(), &mut FixedRandom(0.0))
            .collect();
        // NFLX grows every pillar at 0.6%; shared jitter keeps them equal
        for p in &low {
            assert_eq!(p.environmental, p.social);
            assert_eq!(p.social, p.governance);
        }
        // 60 * 1.006 - 0.25
        assert_eq!(low[0].environmental, 60.1);
    }

    #[test]
    fn test_period_labels_advance_by_quarter() {
        let snapshot = MetricInferenceEngine::default_snapshot();
        let points: Vec<ForecastPoint> = ForecastGenerator::new()
            .forecast(&snapshot, "AAPL", 4, as_of(), &mut SeededRandom::new(3))
            .collect();
        let periods: Vec<&str> = points.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(periods, vec!["Q3 2027", "Q4 2027", "Q1 2028", "Q2 2028"]);
        assert_eq!(points[0].month.as_deref(), Some("Jul 2027"));
        assert_eq!(points[2].month.as_deref(), Some("Jan 2028"));
    }

    #[test]
    fn test_forecast_is_lazy_and_sized() {
        let snapshot = MetricInferenceEngine::default_snapshot();
        let mut rng = SeededRandom::new(11);
        let mut iter = ForecastGenerator::new().forecast(&snapshot, "MSFT", 3, as_of(), &mut rng);
        assert_eq!(iter.len(), 3);
        iter.next();
        assert_eq!(iter.size_hint(), (2, Some(2)));
        assert_eq!(iter.by_ref().count(), 2);
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());

        let mut fixed = FixedRandom(0.5);
        let empty = ForecastGenerator::new().forecast(&snapshot, "MSFT", 0, as_of(), &mut fixed);
        assert_eq!(empty.count(), 0);
    }
}
