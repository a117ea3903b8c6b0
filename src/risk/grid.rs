//! Uniform-grid bucketing for the near-miss scan.
//!
//! With cell side equal to the proximity threshold, any two vehicles within
//! the threshold sit in the same or adjacent cells, so only those cells need
//! comparing.

use std::collections::HashMap;

use super::VehicleSnapshot;

type Cell = (i64, i64);

/// Returns `true` if `cell_size` can be used as a grid cell side.
#[must_use]
pub fn usable_cell_size(cell_size: f64) -> bool {
    cell_size.is_finite() && cell_size > 0.0
}

#[allow(clippy::cast_possible_truncation)]
fn cell_of(v: &VehicleSnapshot, cell_size: f64) -> Cell {
    (
        (v.position.x / cell_size).floor() as i64,
        (v.position.y / cell_size).floor() as i64,
    )
}

/// Calls `visit` once for every unordered pair of vehicles in the same or
/// adjacent cells.
///
/// Pairs are visited with the lower input index first.
pub fn for_each_candidate_pair<F>(vehicles: &[VehicleSnapshot], cell_size: f64, mut visit: F)
where
    F: FnMut(&VehicleSnapshot, &VehicleSnapshot),
{
    let cells: Vec<Cell> = vehicles.iter().map(|v| cell_of(v, cell_size)).collect();
    let mut buckets: HashMap<Cell, Vec<usize>> = HashMap::new();
    for (i, cell) in cells.iter().enumerate() {
        buckets.entry(*cell).or_default().push(i);
    }

    for (i, &(cx, cy)) in cells.iter().enumerate() {
        for dx in -1..=1 {
            for dy in -1..=1 {
                let neighbour = (cx.saturating_add(dx), cy.saturating_add(dy));
                let Some(members) = buckets.get(&neighbour) else {
                    continue;
                };
                for &j in members {
                    if j > i {
                        visit(&vehicles[i], &vehicles[j]);
                    }
                }
            }
        }
    }
}
