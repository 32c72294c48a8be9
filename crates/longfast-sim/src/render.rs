//! Render pass: replays the propagation and describes every frame.
//!
//! The render pass selects exactly the transmissions the dry pass selected,
//! provided its schedule source is seeded the same way. A second, independent
//! source is consumed only for presentation (highlight phases) and never
//! influences scheduling.

use std::collections::{BTreeMap, BTreeSet};

use longfast_metrics::{metric_defs, metrics, SimPass};
use longfast_model::Coverage;
use rand::Rng;
use serde::Serialize;
use tracing::{info, trace};

use crate::frame_cache::{FrameStateCache, FrameStateKey, RenderDecision};
use crate::propagation::{Propagation, PropagationInput, PropagationState, Transmission};
use crate::tiers::TierThresholds;
use crate::Result;

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame<'a> {
    pub index: u64,
    pub time_s: f64,
    pub finished: Vec<Transmission<'a>>,
    pub started: Option<Transmission<'a>>,
    /// Sorted towers on air.
    pub active_towers: Vec<&'a str>,
    pub towers_reached: usize,
    pub towers_transmitted: usize,
    /// Population of committed cells.
    pub cumulative_population: f64,
    /// Committed population plus cells currently covered by an active transmission.
    pub population_reached: f64,
    /// Hop -> population first reached at that hop, on-air cells included. Zero hops omitted.
    pub hop_population: BTreeMap<usize, f64>,
    /// Fine tier -> committed cells at that tier.
    pub received_by_tier: BTreeMap<usize, Vec<&'a str>>,
    /// Fine tier -> cells covered by active transmissions at that tier.
    pub transmitting_by_tier: BTreeMap<usize, BTreeSet<&'a str>>,
    /// Links from active towers to towers still to transmit.
    pub pending_links: Vec<(&'a str, &'a str)>,
    /// Links drawn so far.
    pub past_links: Vec<(&'a str, &'a str)>,
    /// Highlight phase in `[0, 1)` per active tower.
    pub highlight_phase: BTreeMap<&'a str, f64>,
    pub state_key: FrameStateKey<'a>,
    pub render: RenderDecision,
}

impl Frame<'_> {
    pub fn needs_render(&self) -> bool {
        self.render.needs_render()
    }
}

/// Frame iterator over a full propagation run.
pub struct RenderPass<'a, R> {
    engine: Propagation<'a>,
    coverage: &'a Coverage,
    thresholds: &'a TierThresholds,
    total_frames: u64,
    schedule_rng: R,
    cosmetic_rng: R,
    cache: FrameStateCache<'a>,
    highlight_phase: BTreeMap<&'a str, f64>,
}

impl<'a, R: Rng> RenderPass<'a, R> {
    /// `total_frames` normally comes from
    /// [`DryRunSummary::render_frames`](crate::DryRunSummary::render_frames).
    pub fn new(
        input: PropagationInput<'a>,
        thresholds: &'a TierThresholds,
        total_frames: u64,
        schedule_rng: R,
        cosmetic_rng: R,
    ) -> Result<Self> {
        Ok(Self {
            engine: Propagation::new(input, SimPass::Render)?,
            coverage: input.coverage,
            thresholds,
            total_frames,
            schedule_rng,
            cosmetic_rng,
            cache: FrameStateCache::new(),
            highlight_phase: BTreeMap::new(),
        })
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn state(&self) -> &PropagationState<'a> {
        self.engine.state()
    }

    pub fn cache(&self) -> &FrameStateCache<'a> {
        &self.cache
    }

    /// Presentation-only random source.
    pub fn cosmetic_rng(&mut self) -> &mut R {
        &mut self.cosmetic_rng
    }

    fn describe(
        &mut self,
        index: u64,
        time_s: f64,
        finished: Vec<Transmission<'a>>,
        started: Option<Transmission<'a>>,
    ) -> Frame<'a> {
        let state = self.engine.state();
        let coverage = self.coverage;
        let thresholds = self.thresholds;

        let mut population_reached = state.population_reached;
        let mut hop_population: BTreeMap<usize, f64> = state
            .hop_reached
            .iter()
            .map(|(hop, cells)| {
                let people: f64 = cells.iter().map(|c| coverage.population_of(c)).sum();
                (*hop, people)
            })
            .collect();
        let mut on_air: BTreeSet<&str> = BTreeSet::new();
        for tx in &state.active {
            for link in tx.cells {
                let cell = link.target.as_str();
                if state.received_cells.contains_key(cell) || !on_air.insert(cell) {
                    continue;
                }
                let people = coverage.population_of(cell);
                population_reached += people;
                *hop_population.entry(tx.hop).or_default() += people;
            }
        }
        hop_population.retain(|_, people| *people > 0.0);

        let mut received_by_tier: BTreeMap<usize, Vec<&'a str>> = BTreeMap::new();
        for (cell, loss) in &state.received_cells {
            received_by_tier
                .entry(thresholds.classify(*loss))
                .or_default()
                .push(*cell);
        }

        let mut transmitting_by_tier: BTreeMap<usize, BTreeSet<&'a str>> = BTreeMap::new();
        for tx in &state.active {
            for link in tx.cells {
                transmitting_by_tier
                    .entry(thresholds.classify(link.path_loss_db))
                    .or_default()
                    .insert(link.target.as_str());
            }
        }

        let key = state.frame_state_key();
        let active_towers = key.active_towers.clone();
        let pending_links = key.pending_links.clone();
        let past_links: Vec<(&'a str, &'a str)> = state.seen_links.iter().copied().collect();
        let towers_reached = state.received_towers.len();
        let towers_transmitted = state.transmitted.len();
        let cumulative_population = state.population_reached;

        let render = self.cache.observe(index, key.clone());
        if let RenderDecision::Reuse { frame } = render {
            trace!(index, reuse = frame, "Frame unchanged");
        }

        Frame {
            index,
            time_s,
            finished,
            started,
            active_towers,
            towers_reached,
            towers_transmitted,
            cumulative_population,
            population_reached,
            hop_population,
            received_by_tier,
            transmitting_by_tier,
            pending_links,
            past_links,
            highlight_phase: self.highlight_phase.clone(),
            state_key: key,
            render,
        }
    }
}

impl<'a, R: Rng> Iterator for RenderPass<'a, R> {
    type Item = Frame<'a>;

    fn next(&mut self) -> Option<Frame<'a>> {
        if self.engine.frame() >= self.total_frames {
            return None;
        }

        let step = self.engine.step(&mut self.schedule_rng);
        for tx in &step.finished {
            self.highlight_phase.remove(tx.tower);
        }
        if let Some(tx) = &step.started {
            let phase = self.cosmetic_rng.gen::<f64>();
            self.highlight_phase.insert(tx.tower, phase);
            if self.engine.state().active.len() > 1 {
                info!(
                    frame = step.frame,
                    time_s = step.time_s,
                    active = ?self.engine.state().active_towers(),
                    "Concurrent transmissions"
                );
            }
        }

        let frame = self.describe(step.frame, step.time_s, step.finished, step.started);

        let labels = SimPass::Render.labels();
        if frame.needs_render() {
            metrics::counter!(metric_defs::FRAMES_RENDERED.name, &labels).increment(1);
        } else {
            metrics::counter!(metric_defs::FRAMES_REUSED.name, &labels).increment(1);
        }

        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total_frames.saturating_sub(self.engine.frame()) as usize;
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cosmetic_rng, schedule_rng, HopMap, SimParams};
    use longfast_model::{Link, PopulationMap, TowerRecord, VisibilityMap};

    /// A hears B; A covers c1, B covers c1 (better) and c2.
    fn pair() -> (Coverage, HopMap) {
        let mut tower_visibility = VisibilityMap::new();
        tower_visibility.insert("A".into(), vec![Link::new("B", 112.0)]);
        tower_visibility.insert("B".into(), vec![Link::new("A", 112.0)]);
        let mut visible_cells = VisibilityMap::new();
        visible_cells.insert("A".into(), vec![Link::new("c1", 125.0)]);
        visible_cells.insert("B".into(), vec![Link::new("c1", 101.0), Link::new("c2", 135.0)]);
        let population: PopulationMap = [("c1".to_string(), 7.0), ("c2".to_string(), 5.0)]
            .into_iter()
            .collect();
        let coverage = Coverage::new(
            ["A", "B"].map(TowerRecord::new),
            tower_visibility,
            visible_cells,
            population,
        )
        .unwrap();
        let hops = [("A".to_string(), 0), ("B".to_string(), 1)].into_iter().collect();
        (coverage, hops)
    }

    fn thresholds() -> TierThresholds {
        TierThresholds::new(vec![100.0, 110.0, 120.0, 130.0, 140.0, 150.0], 6).unwrap()
    }

    #[test]
    fn test_frames_describe_propagation() {
        let (coverage, hops) = pair();
        let tiers = thresholds();
        let input = PropagationInput {
            coverage: &coverage,
            hops: &hops,
            seed: "A",
            params: SimParams::new(4, 0.9, 0.0).unwrap(),
        };
        let pass = RenderPass::new(input, &tiers, 100, schedule_rng(1), cosmetic_rng(1)).unwrap();
        let frames: Vec<Frame<'_>> = pass.collect();

        // 0: idle, 1: A starts (ends 1.15), 5: A commits and B starts (ends 2.15),
        // 9: B commits. Later frames idle until the frame limit.
        assert_eq!(frames.len(), 100);
        assert_eq!(frames[1].started.as_ref().unwrap().tower, "A");
        assert_eq!(frames[1].active_towers, vec!["A"]);
        assert_eq!(frames[1].pending_links, vec![("A", "B")]);
        assert_eq!(frames[1].population_reached, 7.0);
        assert_eq!(frames[1].cumulative_population, 0.0);
        assert_eq!(frames[1].hop_population[&0], 7.0);
        // c1 at 125 dB: fine thresholds are 5 dB apart from 100.
        assert_eq!(frames[1].transmitting_by_tier[&5], ["c1"].into_iter().collect());
        assert!(frames[1].highlight_phase.contains_key("A"));

        let commit = &frames[5];
        assert_eq!(commit.finished.len(), 1);
        assert_eq!(commit.started.as_ref().unwrap().tower, "B");
        assert_eq!(commit.cumulative_population, 7.0);
        assert_eq!(commit.population_reached, 12.0);
        assert_eq!(commit.hop_population[&0], 7.0);
        assert_eq!(commit.hop_population[&1], 5.0);
        assert_eq!(commit.received_by_tier[&5], vec!["c1"]);
        assert_eq!(commit.past_links, vec![("A", "B")]);
        assert!(!commit.highlight_phase.contains_key("A"));

        let done = &frames[9];
        assert!(done.active_towers.is_empty());
        assert_eq!(done.cumulative_population, 12.0);
        // B's better path loss to c1 replaces A's.
        assert_eq!(done.received_by_tier[&1], vec!["c1"]);
        assert_eq!(done.received_by_tier[&7], vec!["c2"]);
        assert_eq!(done.towers_transmitted, 2);
    }

    #[test]
    fn test_unchanged_frames_reuse_render() {
        let (coverage, hops) = pair();
        let tiers = thresholds();
        let input = PropagationInput {
            coverage: &coverage,
            hops: &hops,
            seed: "A",
            params: SimParams::new(4, 0.9, 0.0).unwrap(),
        };
        let mut pass =
            RenderPass::new(input, &tiers, 12, schedule_rng(1), cosmetic_rng(1)).unwrap();
        let frames: Vec<Frame<'_>> = pass.by_ref().collect();
        assert_eq!(frames.len(), 12);

        let rendered: Vec<u64> = frames
            .iter()
            .filter(|f| f.needs_render())
            .map(|f| f.index)
            .collect();
        assert_eq!(rendered, vec![0, 1, 5, 9]);
        assert_eq!(frames[3].render, RenderDecision::Reuse { frame: 1 });
        assert_eq!(frames[11].render, RenderDecision::Reuse { frame: 9 });
        assert_eq!(pass.cache().rendered(), 4);
        assert_eq!(pass.cache().reused(), 8);
        assert!(pass.next().is_none());
    }
}
