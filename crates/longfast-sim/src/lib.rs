//! # longfast-sim
//!
//! Flood propagation of a single LongFast broadcast across a tower mesh.
//!
//! The pieces, in the order a run uses them:
//! - [`build_waves`]: BFS hop waves from the seed tower, bounded by a hop limit
//! - [`TierThresholds`]: path loss to signal quality tier, with midpoint expansion
//! - [`build_schedule`]: the contention-free reference schedule
//! - [`dry_run`]: a frame-stepped pass that sizes the render
//! - [`RenderPass`]: the same propagation again, one [`Frame`] per step, with
//!   [`FrameStateCache`] marking frames that can reuse the previous render
//!
//! All inputs are borrowed from [`longfast_model`] and never modified.
//! Randomness comes from explicitly passed sources; given the same seed,
//! every pass selects the same transmissions at the same frames.
//!
//! ```rust
//! use longfast_model::{Coverage, Link, TowerRecord, VisibilityMap};
//! use longfast_sim::{build_waves, dry_run, hop_map, schedule_rng, PropagationInput, SimParams};
//!
//! let mut visibility = VisibilityMap::new();
//! visibility.insert("a".into(), vec![Link::new("b", 120.0)]);
//! visibility.insert("b".into(), vec![Link::new("a", 120.0)]);
//! let coverage = Coverage::new(
//!     ["a", "b"].map(TowerRecord::new),
//!     visibility,
//!     VisibilityMap::new(),
//!     Default::default(),
//! )
//! .unwrap();
//!
//! let waves = build_waves("a", &coverage.adjacency(), 12);
//! let hops = hop_map(&waves);
//! let input = PropagationInput {
//!     coverage: &coverage,
//!     hops: &hops,
//!     seed: "a",
//!     params: SimParams::new(24, 1.394688, 0.2).unwrap(),
//! };
//! let summary = dry_run(input, &mut schedule_rng(42)).unwrap();
//! assert_eq!(summary.transmissions, 2);
//! ```

pub mod error;
pub mod frame_cache;
pub mod propagation;
pub mod render;
pub mod schedule;
pub mod tiers;
pub mod waves;

pub use error::{Result, SimError};
pub use frame_cache::{FrameStateCache, FrameStateKey, RenderDecision};
pub use propagation::{
    dry_run, DryRunSummary, FrameStep, Propagation, PropagationInput, PropagationState,
    SimParams, TowerState, Transmission,
};
pub use render::{Frame, RenderPass};
pub use schedule::{build_schedule, ScheduledTransmission, WavePacing};
pub use tiers::{assign_tier, build_fine_thresholds, TierThresholds};
pub use waves::{build_waves, hop_map, HopMap, Wave};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Random source that drives transmission jitter and wave pacing.
pub fn schedule_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Presentation-only random source; same seed, separate stream.
pub fn cosmetic_rng(seed: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(1);
    rng
}

/// Round to a whole number with thousands separators, e.g. `1234567.4` -> `"1,234,567"`.
pub fn format_population(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{}", rounded.abs() as u64);
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_format_population() {
        assert_eq!(format_population(0.0), "0");
        assert_eq!(format_population(999.4), "999");
        assert_eq!(format_population(1000.0), "1,000");
        assert_eq!(format_population(1234567.6), "1,234,568");
        assert_eq!(format_population(-12345.0), "-12,345");
    }

    #[test]
    fn test_rng_streams_independent() {
        let mut first = schedule_rng(7);
        let mut second = schedule_rng(7);
        let mut cosmetic = cosmetic_rng(7);

        let a: Vec<u64> = (0..4).map(|_| first.gen()).collect();
        let b: Vec<u64> = (0..4).map(|_| second.gen()).collect();
        let c: Vec<u64> = (0..4).map(|_| cosmetic.gen()).collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
