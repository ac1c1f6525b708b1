//! ESG scoring pipeline: metric inference, pillar/composite aggregation,
//! letter-grade classification and quarterly forecasting.

pub mod aggregator;
pub mod forecast;
pub mod inference;
pub mod rating;

pub use aggregator::{AggregateScore, ScoreAggregator, WeightWarning, CONTROVERSY_PENALTY};
pub use forecast::{confidence_for, Forecast, ForecastGenerator, DEFAULT_HORIZON};
pub use inference::MetricInferenceEngine;
pub use rating::{classify, RatingPolicy};
