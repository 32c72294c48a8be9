//! Hop waves: breadth-first expansion from the seed tower.

use std::collections::{BTreeMap, BTreeSet};

use longfast_model::{AdjacencyMap, TowerId};

/// Towers first reached at the same hop.
pub type Wave = Vec<TowerId>;

/// Tower -> index of the wave containing it.
pub type HopMap = BTreeMap<TowerId, usize>;

/// Build BFS waves from `seed` up to and including `hop_limit`.
///
/// `waves[0]` is `[seed]`. A tower is marked visited as soon as it is queued,
/// so it appears only in the first wave that reaches it. Expansion stops early
/// when a frontier is empty, giving at most `hop_limit + 1` waves. Towers
/// missing from `adjacency` are treated as having no neighbours.
pub fn build_waves(seed: &str, adjacency: &AdjacencyMap, hop_limit: usize) -> Vec<Wave> {
    let mut waves = Vec::new();
    let mut visited: BTreeSet<&str> = BTreeSet::new();
    visited.insert(seed);
    let mut current: Vec<&str> = vec![seed];

    for _ in 0..=hop_limit {
        waves.push(current.iter().map(|t| t.to_string()).collect());

        let mut next = Vec::new();
        for tower in &current {
            for neighbor in adjacency.get(*tower).into_iter().flatten() {
                if visited.insert(neighbor.as_str()) {
                    next.push(neighbor.as_str());
                }
            }
        }

        if next.is_empty() {
            break;
        }
        current = next;
    }

    waves
}

/// Invert waves into a tower -> hop index map.
pub fn hop_map(waves: &[Wave]) -> HopMap {
    waves
        .iter()
        .enumerate()
        .flat_map(|(hop, wave)| wave.iter().map(move |tower| (tower.clone(), hop)))
        .collect()
}
