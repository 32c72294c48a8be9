//! Contention-free schedule: one transmitter at a time, wave by wave.
//!
//! Towers within a wave transmit strictly in sequence, each holding the
//! channel for one airtime plus jitter. Between waves the clock is padded so
//! that a wave takes at least `min_wave_s`, or gets a random pad up to
//! `max_wave_s`. Nobody listens to anybody here: this is the idealised
//! reference the contention-aware simulator is compared against.

use rand::Rng;
use serde::{Deserialize, Serialize};

use longfast_model::{AnimationConfig, TowerId};

use crate::waves::Wave;

/// Per-wave timing bounds and airtime jitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WavePacing {
    /// Waves shorter than this are padded up to it.
    pub min_wave_s: f64,
    /// Waves shorter than this get a random pad up to it.
    pub max_wave_s: f64,
    /// Upper bound of the uniform jitter added to each airtime.
    pub jitter_s: f64,
}

impl From<&AnimationConfig> for WavePacing {
    fn from(config: &AnimationConfig) -> Self {
        Self {
            min_wave_s: config.wave_min_s,
            max_wave_s: config.wave_max_s,
            jitter_s: config.jitter_s,
        }
    }
}

/// One tower's slot in the contention-free schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledTransmission {
    pub tower: TowerId,
    pub start_s: f64,
    pub end_s: f64,
    /// Index of the wave, 0 for the seed. Same numbering as [`HopMap`](crate::HopMap)
    /// and [`Transmission::hop`](crate::Transmission::hop).
    pub hop: usize,
}

/// Lay transmissions out end to end.
///
/// Draws exactly one jitter value per tower, in wave order, then at most one
/// pad value per wave.
pub fn build_schedule<R: Rng + ?Sized>(
    waves: &[Wave],
    airtime_s: f64,
    pacing: &WavePacing,
    rng: &mut R,
) -> Vec<ScheduledTransmission> {
    let mut schedule = Vec::with_capacity(waves.iter().map(Vec::len).sum());
    let mut current_s = 0.0;

    for (hop, wave) in waves.iter().enumerate() {
        if wave.is_empty() {
            continue;
        }

        let wave_start_s = current_s;
        for tower in wave {
            let duration_s = airtime_s + rng.gen::<f64>() * pacing.jitter_s;
            schedule.push(ScheduledTransmission {
                tower: tower.clone(),
                start_s: current_s,
                end_s: current_s + duration_s,
                hop,
            });
            current_s += duration_s;
        }

        let wave_time_s = current_s - wave_start_s;
        if wave_time_s < pacing.min_wave_s {
            current_s += pacing.min_wave_s - wave_time_s;
        } else if wave_time_s < pacing.max_wave_s {
            current_s += rng.gen::<f64>() * (pacing.max_wave_s - wave_time_s);
        }
    }

    schedule
}
