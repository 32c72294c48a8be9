//! Path loss tier threshold sources.

use crate::{ModelError, Result};

/// Quantiles used to derive thresholds from the cached path loss population.
pub const TIER_QUANTILES: [f64; 6] = [0.15, 0.30, 0.45, 0.60, 0.75, 0.90];

/// Thresholds used when no path loss rows are available.
pub const FALLBACK_TIER_THRESHOLDS_DB: [f64; 6] = [112.0, 118.0, 124.0, 130.0, 136.0, 142.0];

/// Labels for the coarse tiers, best first. One more than the threshold count.
pub const TIER_LABELS: [&str; 7] = [
    "very strong",
    "strong",
    "good",
    "fair",
    "weak",
    "very weak",
    "barely",
];

/// Continuous percentile over ascending `sorted` values.
///
/// Interpolates linearly between the two closest ranks. Returns `None` for an
/// empty slice.
pub fn percentile_cont(sorted: &[f64], fraction: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let position = fraction.clamp(0.0, 1.0) * last as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Thresholds at [`TIER_QUANTILES`] over the given path losses.
///
/// Falls back to [`FALLBACK_TIER_THRESHOLDS_DB`] when there are no values.
pub fn quantile_thresholds(path_losses: impl IntoIterator<Item = f64>) -> Vec<f64> {
    let mut values: Vec<f64> = path_losses.into_iter().filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        return FALLBACK_TIER_THRESHOLDS_DB.to_vec();
    }
    values.sort_by(f64::total_cmp);

    TIER_QUANTILES
        .iter()
        .filter_map(|&q| percentile_cont(&values, q))
        .collect()
}

/// Parse a comma-separated threshold list such as `"110,115,120"`.
pub fn parse_thresholds(text: &str) -> Result<Vec<f64>> {
    text.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| ModelError::InvalidThresholds(format!("'{}' is not a number", part)))
        })
        .collect()
}
