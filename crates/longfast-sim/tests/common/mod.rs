//! Synthetic coverage shared by the integration tests.

#![allow(dead_code)]

use longfast_model::{Coverage, Link, PopulationMap, TowerRecord, VisibilityMap};

const NEIGHBOURS: [(i64, i64); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

pub fn tower_id(row: usize, col: usize) -> String {
    format!("t{:02}{:02}", row, col)
}

/// `size` x `size` towers. Each tower hears its 8 neighbours and covers a
/// 2x2 block of cells, overlapping its right and lower neighbours' blocks.
/// Path losses vary deterministically with position.
pub fn grid_coverage(size: usize) -> Coverage {
    let mut towers = Vec::new();
    let mut tower_visibility = VisibilityMap::new();
    let mut visible_cells = VisibilityMap::new();
    let mut population = PopulationMap::new();

    for row in 0..size {
        for col in 0..size {
            let id = tower_id(row, col);
            towers.push(TowerRecord::new(id.clone()));

            let mut links = Vec::new();
            for (dr, dc) in NEIGHBOURS {
                let (r, c) = (row as i64 + dr, col as i64 + dc);
                if r < 0 || c < 0 || r >= size as i64 || c >= size as i64 {
                    continue;
                }
                let (r, c) = (r as usize, c as usize);
                // Symmetric in the two endpoints.
                let key = (row + r) * 7 + (col + c) * 13;
                links.push(Link::new(tower_id(r, c), 100.0 + (key % 37) as f64));
            }
            tower_visibility.insert(id.clone(), links);

            let mut cells = Vec::new();
            for (dr, dc) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
                let cell = format!("c{:02}{:02}", row + dr, col + dc);
                let loss = 95.0 + ((row * 11 + col * 5 + dr * 17 + dc * 3) % 60) as f64;
                let people = ((row + dr) * 31 + (col + dc) * 17) as f64 % 50.0;
                population.insert(cell.clone(), people);
                cells.push(Link::new(cell, loss));
            }
            visible_cells.insert(id, cells);
        }
    }

    Coverage::new(towers, tower_visibility, visible_cells, population).unwrap()
}
