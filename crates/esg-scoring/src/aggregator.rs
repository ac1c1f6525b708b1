use esg_core::normalize::clamp_score;
use esg_core::{CompositeScore, EsgError, EsgSnapshot, Framework, Pillar, PillarMetrics};
use serde::Serialize;

use crate::rating::RatingPolicy;

/// Points deducted from the composite per known controversy
pub const CONTROVERSY_PENALTY: f64 = 5.0;

const WEIGHT_TOLERANCE: f64 = 0.01;

/// Composite without a rating attached
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateScore {
    pub total: f64,
    pub environmental: f64,
    pub social: f64,
    pub governance: f64,
}

/// A pillar whose sub-metric weights do not sum to 1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightWarning {
    pub pillar: Pillar,
    pub weight_sum: f64,
}

/// Reduces pillars to scores and combines them under a framework
#[derive(Debug, Clone, Default)]
pub struct ScoreAggregator {
    policy: RatingPolicy,
}

impl ScoreAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: RatingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RatingPolicy {
        self.policy
    }

    /// Unrounded weighted pillar score, clamped to [0, 100]
    pub fn raw_pillar_score(metrics: &PillarMetrics) -> f64 {
        clamp_score(metrics.weighted_sum())
    }

    /// Pillar score as surfaced: weighted sum, clamped and rounded
    pub fn pillar_score(metrics: &PillarMetrics) -> f64 {
        Self::raw_pillar_score(metrics).round()
    }

    /// Pillars whose weights stray from 1.0 by more than the tolerance
    pub fn check_weights(snapshot: &EsgSnapshot) -> Vec<WeightWarning> {
        Pillar::ALL
            .iter()
            .filter_map(|&pillar| {
                let weight_sum = snapshot.pillar(pillar).weight_sum();
                ((weight_sum - 1.0).abs() > WEIGHT_TOLERANCE).then_some(WeightWarning { pillar, weight_sum })
            })
            .collect()
    }

    /// Weighted composite with controversy penalty. Pure: same inputs, same output.
    pub fn aggregate(&self, snapshot: &EsgSnapshot, framework: &Framework) -> Result<AggregateScore, EsgError> {
        framework.validate()?;

        let weight_sum = framework.weights.sum();
        if (weight_sum - 1.0).abs() > WEIGHT_TOLERANCE {
            tracing::warn!("Framework {} weights sum to {:.3}, not 1.0", framework.name, weight_sum);
        }
        for warning in Self::check_weights(snapshot) {
            tracing::warn!(
                "{} sub-metric weights sum to {:.3}, not 1.0",
                warning.pillar.as_str(),
                warning.weight_sum
            );
        }

        let environmental = Self::raw_pillar_score(&snapshot.environmental);
        let social = Self::raw_pillar_score(&snapshot.social);
        let governance = Self::raw_pillar_score(&snapshot.governance);

        let w = &framework.weights;
        let raw_total = environmental * w.e + social * w.s + governance * w.g;
        let penalty = snapshot.controversies as f64 * CONTROVERSY_PENALTY;
        let total = clamp_score(raw_total - penalty).round();

        Ok(AggregateScore {
            total,
            environmental: environmental.round(),
            social: social.round(),
            governance: governance.round(),
        })
    }

    /// Aggregate and classify
    pub fn score(&self, snapshot: &EsgSnapshot, framework: &Framework) -> Result<CompositeScore, EsgError> {
        let aggregate = self.aggregate(snapshot, framework)?;
        Ok(CompositeScore {
            total: aggregate.total,
            environmental: aggregate.environmental,
            social: aggregate.social,
            governance: aggregate.governance,
            rating: self.policy.classify(aggregate.total),
        })
    }
}
