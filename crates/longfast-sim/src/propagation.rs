//! Contention-aware flood propagation.
//!
//! Time advances in fixed frames of `1 / fps` seconds. Each frame:
//!
//! 1. Transmissions whose end time has passed are committed: their cells and
//!    audible towers become received.
//! 2. Towers audible to any active transmission are blocked (they would sense
//!    a busy channel).
//! 3. From frame 1 on, at most one eligible tower starts transmitting: the one
//!    with the highest received quality, ties broken by id.
//!
//! A tower is eligible once it has received the packet, has a hop assignment,
//! and is neither done, on air, nor blocked. Each tower transmits at most once.
//! The run is over once nothing is on air and every received tower has either
//! transmitted or lies beyond the hop limit.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use longfast_metrics::{metric_defs, metrics, SimPass};
use longfast_model::{AnimationConfig, Coverage, Link, VisibilityMap};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::frame_cache::FrameStateKey;
use crate::waves::HopMap;
use crate::{Result, SimError};

/// Frame rate and transmission timing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimParams {
    pub fps: u32,
    /// Time on air for one packet, before jitter.
    pub airtime_s: f64,
    /// Upper bound of the uniform jitter added per transmission.
    pub jitter_s: f64,
}

impl SimParams {
    pub fn new(fps: u32, airtime_s: f64, jitter_s: f64) -> Result<Self> {
        if fps == 0 {
            return Err(SimError::InvalidParams("fps must be positive".to_string()));
        }
        if !(airtime_s.is_finite() && airtime_s >= 0.0) {
            return Err(SimError::InvalidParams(format!(
                "airtime must be a non-negative number, got {}",
                airtime_s
            )));
        }
        if !(jitter_s.is_finite() && jitter_s >= 0.0) {
            return Err(SimError::InvalidParams(format!(
                "jitter must be a non-negative number, got {}",
                jitter_s
            )));
        }
        Ok(Self {
            fps,
            airtime_s,
            jitter_s,
        })
    }

    pub fn from_config(config: &AnimationConfig, airtime_s: f64) -> Result<Self> {
        Self::new(config.fps, airtime_s, config.jitter_s)
    }

    /// Simulated time at the start of `frame`.
    pub fn frame_time_s(&self, frame: u64) -> f64 {
        frame as f64 / self.fps as f64
    }
}

/// Read-only inputs shared by the dry and render passes.
#[derive(Debug, Clone, Copy)]
pub struct PropagationInput<'a> {
    pub coverage: &'a Coverage,
    pub hops: &'a HopMap,
    pub seed: &'a str,
    pub params: SimParams,
}

/// A tower on air.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transmission<'a> {
    pub tower: &'a str,
    pub hop: usize,
    pub start_s: f64,
    pub end_s: f64,
    /// Cells covered, with path loss from this tower.
    #[serde(skip)]
    pub cells: &'a [Link],
    /// Towers that hear this one.
    #[serde(skip)]
    pub audible: &'a [Link],
}

impl Transmission<'_> {
    pub fn duration_s(&self) -> f64 {
        self.end_s - self.start_s
    }
}

/// Lifecycle of a single tower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TowerState {
    Unreached,
    /// Heard the packet, has not started its own transmission.
    Reached,
    Transmitting,
    /// Transmission committed.
    Done,
}

/// Mutable simulation state. Collections are ordered so that iteration,
/// and with it every float sum, is reproducible.
#[derive(Debug, Clone, Default)]
pub struct PropagationState<'a> {
    /// Cell -> best (lowest) committed path loss.
    pub received_cells: BTreeMap<&'a str, f64>,
    /// Hop -> cells first committed by a transmission at that hop.
    pub hop_reached: BTreeMap<usize, BTreeSet<&'a str>>,
    pub received_towers: BTreeSet<&'a str>,
    /// Tower -> highest path loss heard so far; the scheduler prefers higher.
    pub received_quality: BTreeMap<&'a str, f64>,
    pub transmitted: BTreeSet<&'a str>,
    /// On-air transmissions in start order.
    pub active: Vec<Transmission<'a>>,
    /// (transmitter, receiver) links drawn so far.
    pub seen_links: BTreeSet<(&'a str, &'a str)>,
    /// Incremented on every commit.
    pub received_version: u64,
    /// Incremented when `seen_links` grows.
    pub seen_links_version: u64,
    /// Population of `received_cells`.
    pub population_reached: f64,
}

impl<'a> PropagationState<'a> {
    fn new(seed: &'a str) -> Self {
        let mut state = Self::default();
        state.received_towers.insert(seed);
        state.received_quality.insert(seed, 0.0);
        state
    }

    pub fn tower_state(&self, tower: &str) -> TowerState {
        if self.transmitted.contains(tower) {
            TowerState::Done
        } else if self.active.iter().any(|tx| tx.tower == tower) {
            TowerState::Transmitting
        } else if self.received_towers.contains(tower) {
            TowerState::Reached
        } else {
            TowerState::Unreached
        }
    }

    /// Sorted towers currently on air.
    pub fn active_towers(&self) -> Vec<&'a str> {
        let mut towers: Vec<&'a str> = self.active.iter().map(|tx| tx.tower).collect();
        towers.sort_unstable();
        towers
    }

    /// Sorted links from active towers to audible towers that have not transmitted.
    pub fn pending_links(&self) -> Vec<(&'a str, &'a str)> {
        let mut links: Vec<(&'a str, &'a str)> = self
            .active
            .iter()
            .flat_map(|tx| {
                let tower = tx.tower;
                let audible: &'a [Link] = tx.audible;
                audible
                    .iter()
                    .map(move |link| (tower, link.target.as_str()))
            })
            .filter(|(_, neighbor)| !self.transmitted.contains(neighbor))
            .collect();
        links.sort_unstable();
        links
    }

    pub fn frame_state_key(&self) -> FrameStateKey<'a> {
        FrameStateKey {
            active_towers: self.active_towers(),
            received_version: self.received_version,
            pending_links: self.pending_links(),
            seen_links_version: self.seen_links_version,
        }
    }
}

/// What happened in one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameStep<'a> {
    pub frame: u64,
    pub time_s: f64,
    /// Committed at the start of the frame, in start order.
    pub finished: Vec<Transmission<'a>>,
    pub started: Option<Transmission<'a>>,
}

/// The frame-stepped propagation engine.
#[derive(Debug, Clone)]
pub struct Propagation<'a> {
    coverage: &'a Coverage,
    hops: &'a HopMap,
    params: SimParams,
    pass: SimPass,
    frame: u64,
    state: PropagationState<'a>,
}

impl<'a> Propagation<'a> {
    pub fn new(input: PropagationInput<'a>, pass: SimPass) -> Result<Self> {
        if !input.coverage.contains_tower(input.seed) {
            return Err(SimError::SeedNotFound(input.seed.to_string()));
        }
        if !input.hops.contains_key(input.seed) {
            return Err(SimError::SeedWithoutHop(input.seed.to_string()));
        }

        Ok(Self {
            coverage: input.coverage,
            hops: input.hops,
            params: input.params,
            pass,
            frame: 0,
            state: PropagationState::new(input.seed),
        })
    }

    /// Index of the next frame to simulate.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn state(&self) -> &PropagationState<'a> {
        &self.state
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn coverage(&self) -> &'a Coverage {
        self.coverage
    }

    /// Nothing on air, and every received tower is done or beyond the hop limit.
    pub fn is_finished(&self) -> bool {
        self.frame > 0
            && self.state.active.is_empty()
            && self
                .state
                .received_towers
                .iter()
                .all(|t| self.state.transmitted.contains(t) || !self.hops.contains_key(*t))
    }

    /// Simulate one frame. Draws one value from `rng` per started transmission.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> FrameStep<'a> {
        let frame = self.frame;
        let time_s = self.params.frame_time_s(frame);
        let labels = self.pass.labels();

        let (finished, active): (Vec<_>, Vec<_>) = std::mem::take(&mut self.state.active)
            .into_iter()
            .partition(|tx| time_s >= tx.end_s);
        self.state.active = active;
        for tx in &finished {
            self.commit(tx);
        }

        let started = if frame > 0 {
            self.select_next()
                .map(|tower| self.start(tower, time_s, rng))
        } else {
            None
        };

        self.frame += 1;

        metrics::counter!(metric_defs::FRAMES_SIMULATED.name, &labels).increment(1);
        metrics::gauge!(metric_defs::TX_ACTIVE.name, &labels).set(self.state.active.len() as f64);
        metrics::gauge!(metric_defs::POPULATION_REACHED.name, &labels)
            .set(self.state.population_reached);
        metrics::gauge!(metric_defs::TOWERS_REACHED.name, &labels)
            .set(self.state.received_towers.len() as f64);

        FrameStep {
            frame,
            time_s,
            finished,
            started,
        }
    }

    /// Highest-quality eligible tower, larger id winning ties.
    fn select_next(&self) -> Option<&'a str> {
        let state = &self.state;
        let on_air: BTreeSet<&str> = state.active.iter().map(|tx| tx.tower).collect();
        let blocked: BTreeSet<&str> = state
            .active
            .iter()
            .flat_map(|tx| tx.audible.iter().map(|link| link.target.as_str()))
            .collect();
        let quality = |tower: &str| {
            state
                .received_quality
                .get(tower)
                .copied()
                .unwrap_or(f64::NEG_INFINITY)
        };

        state
            .received_towers
            .iter()
            .copied()
            .filter(|tower| {
                self.hops.contains_key(*tower)
                    && !state.transmitted.contains(tower)
                    && !on_air.contains(tower)
                    && !blocked.contains(tower)
            })
            .max_by(|a, b| quality(*a).total_cmp(&quality(*b)).then_with(|| a.cmp(b)))
    }

    fn start<R: Rng + ?Sized>(
        &mut self,
        tower: &'a str,
        time_s: f64,
        rng: &mut R,
    ) -> Transmission<'a> {
        let coverage: &'a Coverage = self.coverage;
        let duration_s = self.params.airtime_s + rng.gen::<f64>() * self.params.jitter_s;
        let tx = Transmission {
            tower,
            hop: self.hops.get(tower).copied().unwrap_or_default(),
            start_s: time_s,
            end_s: time_s + duration_s,
            cells: links_of(coverage.visible_cells(), tower),
            audible: links_of(coverage.tower_visibility(), tower),
        };

        let labels = self.pass.labels();
        metrics::counter!(metric_defs::TX_STARTED.name, &labels).increment(1);
        metrics::histogram!(metric_defs::TX_DURATION.name, &labels).record(duration_s);
        debug!(
            pass = self.pass.as_label(),
            tower,
            hop = tx.hop,
            start_s = tx.start_s,
            end_s = tx.end_s,
            cells = tx.cells.len(),
            "Transmission started"
        );

        self.state.active.push(tx.clone());
        tx
    }

    fn commit(&mut self, tx: &Transmission<'a>) {
        let state = &mut self.state;

        for link in tx.cells {
            let cell = link.target.as_str();
            match state.received_cells.entry(cell) {
                Entry::Vacant(entry) => {
                    entry.insert(link.path_loss_db);
                    state.hop_reached.entry(tx.hop).or_default().insert(cell);
                    state.population_reached += self.coverage.population_of(cell);
                }
                Entry::Occupied(mut entry) => {
                    if link.path_loss_db < *entry.get() {
                        entry.insert(link.path_loss_db);
                    }
                }
            }
        }

        state.transmitted.insert(tx.tower);
        state.received_version += 1;

        for link in tx.audible {
            let neighbor = link.target.as_str();
            if state.received_towers.insert(neighbor) {
                state.received_quality.insert(neighbor, link.path_loss_db);
            } else {
                let quality = state
                    .received_quality
                    .entry(neighbor)
                    .or_insert(link.path_loss_db);
                *quality = quality.max(link.path_loss_db);
            }
            if !state.transmitted.contains(neighbor)
                && state.seen_links.insert((tx.tower, neighbor))
            {
                state.seen_links_version += 1;
            }
        }

        metrics::counter!(metric_defs::TX_FINISHED.name, &self.pass.labels()).increment(1);
        debug!(
            pass = self.pass.as_label(),
            tower = tx.tower,
            towers_reached = state.received_towers.len(),
            cells_reached = state.received_cells.len(),
            "Transmission committed"
        );
    }
}

fn links_of<'a>(map: &'a VisibilityMap, tower: &str) -> &'a [Link] {
    map.get(tower).map(Vec::as_slice).unwrap_or(&[])
}

/// Outcome of a dry pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DryRunSummary {
    /// Frames simulated, including the terminating frame.
    pub frames: u64,
    /// Highest committed population seen at the end of any frame.
    pub peak_population: f64,
    pub transmissions: usize,
    pub towers_reached: usize,
    pub cells_reached: usize,
}

impl DryRunSummary {
    /// Frames for the render pass: at least one, capped by `max_frames`.
    pub fn render_frames(&self, max_frames: Option<u64>) -> u64 {
        let frames = self.frames.max(1);
        max_frames.map_or(frames, |cap| frames.min(cap))
    }
}

/// Run the whole propagation without producing frames, to size the render pass.
///
/// There is no frame cap: the peak population must not depend on how much of
/// the run is rendered. `rng` must be seeded the same way as the render pass's
/// schedule source for both passes to select identical transmissions.
pub fn dry_run<R: Rng + ?Sized>(
    input: PropagationInput<'_>,
    rng: &mut R,
) -> Result<DryRunSummary> {
    let mut engine = Propagation::new(input, SimPass::Dry)?;
    let mut peak_population: f64 = 0.0;

    while !engine.is_finished() {
        engine.step(rng);
        peak_population = peak_population.max(engine.state().population_reached);
    }

    let state = engine.state();
    let summary = DryRunSummary {
        frames: engine.frame(),
        peak_population,
        transmissions: state.transmitted.len() + state.active.len(),
        towers_reached: state.received_towers.len(),
        cells_reached: state.received_cells.len(),
    };
    info!(
        frames = summary.frames,
        peak_population = %crate::format_population(summary.peak_population),
        transmissions = summary.transmissions,
        "Dry pass complete"
    );

    Ok(summary)
}
