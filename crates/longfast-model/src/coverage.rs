//! Tower coverage data.
//!
//! A [`Coverage`] holds the tower set, the directional visibility lists
//! (tower to tower and tower to cell, each with path loss) and population
//! per cell. All maps are ordered so that iteration and floating point
//! summation are reproducible.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ModelError, Result};

/// Tower identifier (hexagonal cell index).
pub type TowerId = String;

/// Cell identifier (hexagonal cell index).
pub type CellId = String;

/// Tower -> ordered list of visible targets with path loss.
pub type VisibilityMap = BTreeMap<TowerId, Vec<Link>>;

/// Tower -> neighbouring towers. Symmetric.
pub type AdjacencyMap = BTreeMap<TowerId, Vec<TowerId>>;

/// Cell -> population. Cells absent from the map count as zero.
pub type PopulationMap = BTreeMap<CellId, f64>;

/// A directional visibility entry: the target heard from a tower and the path loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Receiving tower or cell.
    pub target: String,
    /// Path loss in dB; lower is better.
    pub path_loss_db: f64,
}

impl Link {
    /// Create a new link entry.
    pub fn new(target: impl Into<String>, path_loss_db: f64) -> Self {
        Self {
            target: target.into(),
            path_loss_db,
        }
    }
}

/// A tower as listed in a scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TowerRecord {
    /// Hexagonal cell index of the tower.
    pub id: TowerId,
    /// Human-readable name, used for seed lookup.
    #[serde(default)]
    pub name: Option<String>,
    /// Placement source (e.g. "existing", "greedy").
    #[serde(default)]
    pub source: Option<String>,
}

impl TowerRecord {
    /// A tower with only an id.
    pub fn new(id: impl Into<TowerId>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Set the tower name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the placement source.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// One row of the cached line-of-sight table.
///
/// Profile columns are optional; absent columns are not filtered on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LosRow {
    /// First endpoint.
    pub src: String,
    /// Second endpoint.
    pub dst: String,
    /// Path loss between the endpoints in dB.
    pub path_loss_db: f64,
    /// Fresnel clearance; the link is usable when positive.
    #[serde(default)]
    pub clearance: Option<f64>,
    /// Endpoint distance in meters.
    #[serde(default)]
    pub distance_m: Option<f64>,
    /// Antenna height at `src` in meters.
    #[serde(default)]
    pub mast_height_src: Option<f64>,
    /// Antenna height at `dst` in meters.
    #[serde(default)]
    pub mast_height_dst: Option<f64>,
    /// Carrier frequency the row was computed for.
    #[serde(default)]
    pub frequency_hz: Option<u64>,
}

impl LosRow {
    /// A row with only endpoints and path loss.
    pub fn new(src: impl Into<String>, dst: impl Into<String>, path_loss_db: f64) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            path_loss_db,
            clearance: None,
            distance_m: None,
            mast_height_src: None,
            mast_height_dst: None,
            frequency_hz: None,
        }
    }
}

/// The link profile a cached LOS row must match to be used.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LosProfile {
    /// Rows need clearance strictly above this value.
    pub min_clearance: f64,
    /// Maximum endpoint distance in meters (inclusive).
    pub max_distance_m: f64,
    /// Required antenna height at both endpoints in meters.
    pub mast_height_m: f64,
    /// Required carrier frequency.
    pub frequency_hz: u64,
}

impl Default for LosProfile {
    fn default() -> Self {
        Self {
            min_clearance: 0.0,
            max_distance_m: 70_000.0,
            mast_height_m: 28.0,
            frequency_hz: 868_000_000,
        }
    }
}

impl LosProfile {
    /// Whether a row matches this profile.
    pub fn accepts(&self, row: &LosRow) -> bool {
        row.clearance.map_or(true, |c| c > self.min_clearance)
            && row.distance_m.map_or(true, |d| d <= self.max_distance_m)
            && row.mast_height_src.map_or(true, |h| h == self.mast_height_m)
            && row.mast_height_dst.map_or(true, |h| h == self.mast_height_m)
            && row.frequency_hz.map_or(true, |f| f == self.frequency_hz)
    }
}

/// Towers, their visibility lists and population per cell.
#[derive(Debug, Clone, Default)]
pub struct Coverage {
    towers: BTreeMap<TowerId, TowerRecord>,
    tower_visibility: VisibilityMap,
    visible_cells: VisibilityMap,
    population: PopulationMap,
}

impl Coverage {
    /// Build coverage from pre-split visibility lists.
    ///
    /// Every tower gets a (possibly empty) entry in both visibility maps.
    /// Visibility keys and tower-to-tower targets must be known towers.
    pub fn new(
        towers: impl IntoIterator<Item = TowerRecord>,
        tower_visibility: VisibilityMap,
        visible_cells: VisibilityMap,
        population: PopulationMap,
    ) -> Result<Self> {
        let towers: BTreeMap<TowerId, TowerRecord> =
            towers.into_iter().map(|t| (t.id.clone(), t)).collect();

        for (tower, links) in &tower_visibility {
            if !towers.contains_key(tower) {
                return Err(ModelError::UnknownTower(tower.clone()));
            }
            for link in links {
                if !towers.contains_key(&link.target) {
                    return Err(ModelError::UnknownTower(link.target.clone()));
                }
                check_path_loss(tower, &link.target, link.path_loss_db)?;
            }
        }
        for (tower, links) in &visible_cells {
            if !towers.contains_key(tower) {
                return Err(ModelError::UnknownTower(tower.clone()));
            }
            for link in links {
                check_path_loss(tower, &link.target, link.path_loss_db)?;
            }
        }
        for (cell, &value) in &population {
            if !value.is_finite() || value < 0.0 {
                return Err(ModelError::InvalidPopulation {
                    cell: cell.clone(),
                    value,
                });
            }
        }

        let mut coverage = Self {
            towers,
            tower_visibility,
            visible_cells,
            population,
        };
        for tower in coverage.towers.keys() {
            coverage.tower_visibility.entry(tower.clone()).or_default();
            coverage.visible_cells.entry(tower.clone()).or_default();
        }

        Ok(coverage)
    }

    /// Build coverage from cached line-of-sight rows.
    ///
    /// Rows failing the profile are skipped. Rows between two towers are used
    /// in both directions for tower visibility; rows with exactly one tower
    /// endpoint become a visible cell of that tower. Rows touching no tower are
    /// ignored.
    pub fn from_los_rows<'r>(
        towers: impl IntoIterator<Item = TowerRecord>,
        rows: impl IntoIterator<Item = &'r LosRow>,
        profile: &LosProfile,
        population: PopulationMap,
    ) -> Result<Self> {
        let towers: Vec<TowerRecord> = towers.into_iter().collect();
        let ids: BTreeSet<&str> = towers.iter().map(|t| t.id.as_str()).collect();

        let mut tower_visibility = VisibilityMap::new();
        let mut visible_cells = VisibilityMap::new();
        let mut skipped = 0usize;

        for row in rows {
            if !profile.accepts(row) {
                skipped += 1;
                continue;
            }
            check_path_loss(&row.src, &row.dst, row.path_loss_db)?;

            let src_is_tower = ids.contains(row.src.as_str());
            let dst_is_tower = ids.contains(row.dst.as_str());
            match (src_is_tower, dst_is_tower) {
                (true, true) => {
                    if row.src == row.dst {
                        continue;
                    }
                    tower_visibility
                        .entry(row.src.clone())
                        .or_default()
                        .push(Link::new(row.dst.clone(), row.path_loss_db));
                    tower_visibility
                        .entry(row.dst.clone())
                        .or_default()
                        .push(Link::new(row.src.clone(), row.path_loss_db));
                }
                (true, false) => visible_cells
                    .entry(row.src.clone())
                    .or_default()
                    .push(Link::new(row.dst.clone(), row.path_loss_db)),
                (false, true) => visible_cells
                    .entry(row.dst.clone())
                    .or_default()
                    .push(Link::new(row.src.clone(), row.path_loss_db)),
                (false, false) => skipped += 1,
            }
        }
        debug!(skipped, "Filtered cached LOS rows");

        Self::new(towers, tower_visibility, visible_cells, population)
    }

    /// All towers keyed by id.
    pub fn towers(&self) -> &BTreeMap<TowerId, TowerRecord> {
        &self.towers
    }

    /// Whether `id` is a known tower.
    pub fn contains_tower(&self, id: &str) -> bool {
        self.towers.contains_key(id)
    }

    /// Tower-to-tower visibility with path loss.
    pub fn tower_visibility(&self) -> &VisibilityMap {
        &self.tower_visibility
    }

    /// Tower-to-cell visibility with path loss.
    pub fn visible_cells(&self) -> &VisibilityMap {
        &self.visible_cells
    }

    /// Population per cell.
    pub fn population(&self) -> &PopulationMap {
        &self.population
    }

    /// Population of a single cell; zero when unknown.
    pub fn population_of(&self, cell: &str) -> f64 {
        self.population.get(cell).copied().unwrap_or(0.0)
    }

    /// Sum of all known population.
    pub fn total_population(&self) -> f64 {
        self.population.values().sum()
    }

    /// Symmetric tower adjacency derived from tower visibility.
    ///
    /// Neighbours keep first-seen order and are de-duplicated.
    pub fn adjacency(&self) -> AdjacencyMap {
        let mut adjacency: AdjacencyMap =
            self.towers.keys().map(|t| (t.clone(), Vec::new())).collect();

        let add = |adjacency: &mut AdjacencyMap, from: &str, to: &str| {
            if let Some(neighbors) = adjacency.get_mut(from) {
                if !neighbors.iter().any(|n| n == to) {
                    neighbors.push(to.to_string());
                }
            }
        };
        for (tower, links) in &self.tower_visibility {
            for link in links {
                add(&mut adjacency, tower, &link.target);
                add(&mut adjacency, &link.target, tower);
            }
        }

        adjacency
    }

    /// Number of distinct undirected tower links.
    pub fn link_count(&self) -> usize {
        self.adjacency().values().map(Vec::len).sum::<usize>() / 2
    }

    /// Number of tower-to-cell visibility pairs.
    pub fn visibility_pair_count(&self) -> usize {
        self.visible_cells.values().map(Vec::len).sum()
    }

    /// Resolve a seed by exact tower id, then by case-insensitive name substring.
    ///
    /// Name matches are tried in ascending id order; the first match wins.
    pub fn resolve_seed(&self, seed: &str) -> Result<&str> {
        if let Some((id, _)) = self.towers.get_key_value(seed) {
            return Ok(id.as_str());
        }

        let needle = seed.to_lowercase();
        if !needle.is_empty() {
            let by_name = self.towers.values().find(|t| {
                t.name
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase().contains(&needle))
            });
            if let Some(tower) = by_name {
                return Ok(tower.id.as_str());
            }
        }

        Err(ModelError::SeedNotFound(seed.to_string()))
    }
}

fn check_path_loss(src: &str, dst: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ModelError::InvalidPathLoss {
            src: src.to_string(),
            dst: dst.to_string(),
            value,
        })
    }
}
