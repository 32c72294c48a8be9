//! # longfast-runner library
//!
//! Runs a LongFast propagation animation from a loaded scenario: hop waves,
//! airtime, tier thresholds, the dry pass that sizes the render, and the
//! render pass that produces frames.
//!
//! The `longfast` binary is a thin clap front end over these functions.

use std::io::Write;

use clap::Args;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use longfast_lora::RadioConfig;
use longfast_model::{Scenario, ThresholdSpec};
use longfast_sim::{
    build_schedule, build_waves, cosmetic_rng, dry_run, format_population, hop_map,
    schedule_rng, HopMap, PropagationInput, RenderPass, ScheduledTransmission, SimParams,
    TierThresholds, WavePacing, Wave,
};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while running an animation.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Model error.
    #[error("Model error: {0}")]
    Model(#[from] longfast_model::ModelError),

    /// Simulation error.
    #[error("Simulation error: {0}")]
    Simulation(#[from] longfast_sim::SimError),

    /// Radio error.
    #[error("Radio error: {0}")]
    Radio(#[from] longfast_lora::LoraError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;

// ============================================================================
// Command-line Overrides
// ============================================================================

/// Radio flags layered over the scenario's `radio` section.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct RadioOverrides {
    /// Spreading factor (7-12)
    #[arg(long)]
    pub sf: Option<u8>,

    /// Bandwidth in kHz
    #[arg(long)]
    pub bandwidth_khz: Option<f64>,

    /// Coding rate denominator (5-8, representing 4/5 to 4/8)
    #[arg(long)]
    pub coding_rate: Option<u8>,

    /// Payload size in bytes
    #[arg(long)]
    pub payload_bytes: Option<u32>,

    /// Programmed preamble symbols
    #[arg(long)]
    pub preamble_symbols: Option<u32>,
}

impl RadioOverrides {
    /// Apply the set flags to `radio`.
    pub fn apply(&self, radio: &mut RadioConfig) {
        if let Some(sf) = self.sf {
            radio.spreading_factor = sf;
        }
        if let Some(bw) = self.bandwidth_khz {
            radio.bandwidth_khz = bw;
        }
        if let Some(cr) = self.coding_rate {
            radio.coding_rate = cr;
        }
        if let Some(bytes) = self.payload_bytes {
            radio.payload_bytes = bytes;
        }
        if let Some(symbols) = self.preamble_symbols {
            radio.preamble_symbols = symbols;
        }
    }
}

/// Scenario flags; anything left unset keeps the scenario's value.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ScenarioOverrides {
    /// Seed tower id or name substring
    #[arg(long)]
    pub seed: Option<String>,

    /// Frames per simulated second
    #[arg(long)]
    pub fps: Option<u32>,

    /// Maximum hop index to include
    #[arg(long)]
    pub hop_limit: Option<usize>,

    /// Upper bound of the per-transmission jitter in seconds
    #[arg(long)]
    pub jitter: Option<f64>,

    /// Minimum wave duration in the contention-free schedule
    #[arg(long)]
    pub wave_min: Option<f64>,

    /// Wave duration below which a random pad is added
    #[arg(long)]
    pub wave_max: Option<f64>,

    /// Comma-separated tier thresholds in dB, e.g. "112,118,124,130,136,142"
    #[arg(long, value_name = "LIST")]
    pub tier_thresholds: Option<String>,

    /// Seed for the random sources
    #[arg(long)]
    pub rng_seed: Option<u64>,

    /// Stop after this many frames
    #[arg(long)]
    pub max_frames: Option<u64>,

    #[command(flatten)]
    pub radio: RadioOverrides,
}

impl ScenarioOverrides {
    /// Apply the set flags to a loaded scenario and re-validate it.
    pub fn apply(&self, scenario: &mut Scenario) -> Result<()> {
        let animation = &mut scenario.animation;
        if let Some(fps) = self.fps {
            animation.fps = fps;
        }
        if let Some(hop_limit) = self.hop_limit {
            animation.hop_limit = hop_limit;
        }
        if let Some(jitter) = self.jitter {
            animation.jitter_s = jitter;
        }
        if let Some(wave_min) = self.wave_min {
            animation.wave_min_s = wave_min;
        }
        if let Some(wave_max) = self.wave_max {
            animation.wave_max_s = wave_max;
        }
        if let Some(thresholds) = &self.tier_thresholds {
            animation.tier_thresholds_db = Some(ThresholdSpec::Text(thresholds.clone()));
        }
        if let Some(rng_seed) = self.rng_seed {
            animation.rng_seed = rng_seed;
        }
        if self.max_frames.is_some() {
            animation.max_frames = self.max_frames;
        }
        animation.validate()?;

        self.radio.apply(&mut scenario.radio);
        scenario.radio.validate()?;

        if let Some(seed) = &self.seed {
            scenario.seed_tower = scenario.coverage.resolve_seed(seed)?.to_string();
        }
        Ok(())
    }
}

// ============================================================================
// Run Plan
// ============================================================================

/// Everything derived from a scenario before the first frame.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub waves: Vec<Wave>,
    pub hops: HopMap,
    pub airtime_s: f64,
    pub thresholds: TierThresholds,
    pub params: SimParams,
}

impl RunPlan {
    /// Build waves, airtime and validated thresholds.
    pub fn new(scenario: &Scenario) -> Result<Self> {
        let airtime_s = scenario.radio.airtime_s()?;
        let thresholds =
            TierThresholds::new(scenario.tier_thresholds()?, scenario.animation.tier_count)?;
        let params = SimParams::from_config(&scenario.animation, airtime_s)?;

        let waves = build_waves(
            &scenario.seed_tower,
            &scenario.coverage.adjacency(),
            scenario.animation.hop_limit,
        );
        let hops = hop_map(&waves);

        info!(
            seed = %scenario.seed_tower,
            waves = waves.len(),
            towers_in_range = hops.len(),
            airtime_s,
            "Planned run"
        );

        Ok(Self {
            waves,
            hops,
            airtime_s,
            thresholds,
            params,
        })
    }

    pub fn input<'a>(&'a self, scenario: &'a Scenario) -> PropagationInput<'a> {
        PropagationInput {
            coverage: &scenario.coverage,
            hops: &self.hops,
            seed: &scenario.seed_tower,
            params: self.params,
        }
    }
}

// ============================================================================
// Run Summary
// ============================================================================

/// Summary printed after a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub seed_tower: String,
    pub towers: usize,
    pub tower_links: usize,
    pub visibility_pairs: usize,
    pub waves: usize,
    pub airtime_s: f64,
    pub coarse_thresholds_db: Vec<f64>,
    pub fine_thresholds_db: Vec<f64>,
    /// Frames simulated by the dry pass, which ignores `max_frames`.
    pub dry_frames: u64,
    /// Frames produced by the render pass.
    pub total_frames: u64,
    pub transmissions: usize,
    pub peak_population: f64,
    pub total_population: f64,
    /// Population scale for progress displays: the larger of total and peak.
    pub display_max_population: f64,
    pub frames_rendered: u64,
    pub frames_reused: u64,
}

/// Run the dry and render passes.
///
/// When `frames_out` is given, every frame is written to it as one JSON
/// object per line.
pub fn run_animation(
    scenario: &Scenario,
    mut frames_out: Option<&mut dyn Write>,
) -> Result<RunSummary> {
    let plan = RunPlan::new(scenario)?;
    let input = plan.input(scenario);
    let animation = &scenario.animation;

    // The dry pass always runs to completion so the peak is stable under a frame cap.
    let dry = dry_run(input, &mut schedule_rng(animation.rng_seed))?;
    let total_frames = dry.render_frames(animation.max_frames);
    info!(
        dry_frames = dry.frames,
        total_frames,
        peak = %format_population(dry.peak_population),
        "Dry pass sized render"
    );

    let mut pass = RenderPass::new(
        input,
        &plan.thresholds,
        total_frames,
        schedule_rng(animation.rng_seed),
        cosmetic_rng(animation.rng_seed),
    )?;
    let mut transmissions = 0;
    for frame in pass.by_ref() {
        transmissions += usize::from(frame.started.is_some());
        if let Some(out) = frames_out.as_deref_mut() {
            serde_json::to_writer(&mut *out, &frame)?;
            out.write_all(b"\n")?;
        }
    }
    if let Some(out) = frames_out.as_deref_mut() {
        out.flush()?;
    }

    let coverage = &scenario.coverage;
    let total_population = coverage.total_population();
    let summary = RunSummary {
        seed_tower: scenario.seed_tower.clone(),
        towers: coverage.towers().len(),
        tower_links: coverage.link_count(),
        visibility_pairs: coverage.visibility_pair_count(),
        waves: plan.waves.len(),
        airtime_s: plan.airtime_s,
        coarse_thresholds_db: plan.thresholds.coarse().to_vec(),
        fine_thresholds_db: plan.thresholds.fine().to_vec(),
        dry_frames: dry.frames,
        total_frames,
        transmissions,
        peak_population: dry.peak_population,
        total_population,
        display_max_population: total_population.max(dry.peak_population),
        frames_rendered: pass.cache().rendered(),
        frames_reused: pass.cache().reused(),
    };

    info!(
        frames = summary.total_frames,
        rendered = summary.frames_rendered,
        reused = summary.frames_reused,
        population = %format_population(pass.state().population_reached),
        of = %format_population(summary.display_max_population),
        "Render pass complete"
    );

    Ok(summary)
}

/// The contention-free schedule for a scenario.
pub fn contention_free_schedule(scenario: &Scenario) -> Result<Vec<ScheduledTransmission>> {
    let plan = RunPlan::new(scenario)?;
    let pacing = WavePacing::from(&scenario.animation);
    Ok(build_schedule(
        &plan.waves,
        plan.airtime_s,
        &pacing,
        &mut schedule_rng(scenario.animation.rng_seed),
    ))
}

/// Airtime breakdown for a radio configuration.
#[derive(Debug, Clone, Serialize)]
pub struct AirtimeReport {
    pub radio: RadioConfig,
    pub symbol_duration_s: f64,
    pub low_data_rate_optimize: bool,
    pub payload_symbols: i64,
    pub airtime_s: f64,
}

impl AirtimeReport {
    pub fn new(radio: RadioConfig) -> Result<Self> {
        Ok(Self {
            airtime_s: radio.airtime_s()?,
            symbol_duration_s: radio.symbol_duration_s(),
            low_data_rate_optimize: radio.low_data_rate_optimize(),
            payload_symbols: radio.payload_symbols(),
            radio,
        })
    }
}
