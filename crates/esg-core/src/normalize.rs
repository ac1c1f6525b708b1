//! Score normalization helpers shared by the inference, aggregation and forecast stages.

/// Clamp to the surfaced score range [0, 100]. NaN maps to 0.
pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

/// Round to `decimals` places, half away from zero.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Bring a provider score onto the 0-100 scale.
///
/// Some providers and datasets report on a 0-20 scale; anything at or below 20
/// is treated as such and multiplied by 5. Missing or non-finite input yields `fallback`.
pub fn normalize_score(score: Option<f64>, fallback: f64) -> f64 {
    match score {
        Some(s) if s.is_finite() && s <= 20.0 => clamp_score(s * 5.0),
        Some(s) if s.is_finite() => clamp_score(s),
        _ => fallback,
    }
}

pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}
