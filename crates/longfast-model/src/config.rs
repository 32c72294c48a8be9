//! Animation configuration.

use serde::{Deserialize, Serialize};

use crate::thresholds::parse_thresholds;
use crate::{ModelError, Result};

/// Explicitly configured tier thresholds.
///
/// Accepts either a YAML list or a comma-separated string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThresholdSpec {
    /// `[110, 115, ...]`
    List(Vec<f64>),
    /// `"110,115,..."`
    Text(String),
}

impl ThresholdSpec {
    /// The thresholds as numbers, in configured order.
    pub fn values(&self) -> Result<Vec<f64>> {
        match self {
            ThresholdSpec::List(values) => Ok(values.clone()),
            ThresholdSpec::Text(text) => parse_thresholds(text),
        }
    }
}

/// Animation controls, pacing and tier thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Frames per simulated second.
    pub fps: u32,
    /// Maximum hop index to include; hop 0 is the seed.
    pub hop_limit: usize,
    /// Minimum gap after a wave in the contention-free schedule.
    pub wave_min_s: f64,
    /// Upper bound of the random gap after a wave.
    pub wave_max_s: f64,
    /// Upper bound of the uniform jitter added to each airtime.
    pub jitter_s: f64,
    /// Explicit thresholds; quantiles of the LOS cache are used when unset.
    pub tier_thresholds_db: Option<ThresholdSpec>,
    /// Number of coarse thresholds the tier styles expect.
    pub tier_count: usize,
    /// Seed for every random source in a run.
    pub rng_seed: u64,
    /// Optional cap on rendered frames.
    pub max_frames: Option<u64>,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            fps: 24,
            hop_limit: 12,
            wave_min_s: 0.5,
            wave_max_s: 1.0,
            jitter_s: 0.2,
            tier_thresholds_db: None,
            tier_count: 6,
            rng_seed: 42,
            max_frames: None,
        }
    }
}

impl AnimationConfig {
    /// Reject configurations the simulator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.fps == 0 {
            return Err(ModelError::InvalidConfig("fps must be positive".to_string()));
        }
        if !(self.jitter_s >= 0.0 && self.jitter_s.is_finite()) {
            return Err(ModelError::InvalidConfig(format!(
                "jitter_s must be a non-negative number, got {}",
                self.jitter_s
            )));
        }
        if !(self.wave_min_s >= 0.0 && self.wave_max_s.is_finite()) {
            return Err(ModelError::InvalidConfig(
                "wave pacing bounds must be non-negative numbers".to_string(),
            ));
        }
        if self.wave_min_s > self.wave_max_s {
            return Err(ModelError::InvalidConfig(format!(
                "wave_min_s ({}) exceeds wave_max_s ({})",
                self.wave_min_s, self.wave_max_s
            )));
        }
        if self.max_frames == Some(0) {
            return Err(ModelError::InvalidConfig(
                "max_frames must be positive when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Seconds of simulated time per frame.
    pub fn frame_duration_s(&self) -> f64 {
        1.0 / self.fps as f64
    }
}
