use esg_core::RatingGrade;
use serde::{Deserialize, Serialize};

/// Versioned breakpoint table for letter grades.
///
/// `V2` is authoritative. `Legacy` is the older 80/70/60/50/40/30 table, kept
/// so historical ratings can be reproduced side by side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatingPolicy {
    #[default]
    V2,
    Legacy,
}

impl RatingPolicy {
    /// Inclusive lower bounds, best grade first
    pub fn breakpoints(&self) -> [(f64, RatingGrade); 6] {
        match self {
            RatingPolicy::V2 => [
                (90.0, RatingGrade::Aaa),
                (80.0, RatingGrade::Aa),
                (70.0, RatingGrade::A),
                (60.0, RatingGrade::Bbb),
                (50.0, RatingGrade::Bb),
                (40.0, RatingGrade::B),
            ],
            RatingPolicy::Legacy => [
                (80.0, RatingGrade::Aaa),
                (70.0, RatingGrade::Aa),
                (60.0, RatingGrade::A),
                (50.0, RatingGrade::Bbb),
                (40.0, RatingGrade::Bb),
                (30.0, RatingGrade::B),
            ],
        }
    }

    pub fn classify(&self, total: f64) -> RatingGrade {
        if total.is_nan() {
            return RatingGrade::Ccc;
        }
        let total = total.clamp(0.0, 100.0);
        self.breakpoints()
            .iter()
            .find(|(floor, _)| total >= *floor)
            .map(|(_, grade)| *grade)
            .unwrap_or(RatingGrade::Ccc)
    }
}

/// Classify under the authoritative policy
pub fn classify(total: f64) -> RatingGrade {
    RatingPolicy::default().classify(total)
}
