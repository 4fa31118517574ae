use rayon::prelude::*;

use crate::grid::wrapped_dist_sq;
use crate::world::WorldState;

/// Index of the seed nearest to `(x, y)` by wrapped distance. Ties go to the earlier seed.
#[inline]
pub fn nearest_seed(x: f64, y: f64, seeds: &[(f64, f64)], w: f64, h: f64) -> usize {
    let mut best = 0;
    let mut best_sq = f64::INFINITY;
    for (i, &(sx, sy)) in seeds.iter().enumerate() {
        let d = wrapped_dist_sq(x, y, sx, sy, w, h);
        if d < best_sq {
            best_sq = d;
            best = i;
        }
    }
    best
}

/// Wrapped Voronoi partition of a `w × h` grid: nearest seed index per cell, row-major.
pub fn voronoi_owners(w: usize, h: usize, seeds: &[(f64, f64)]) -> Vec<usize> {
    let mut owners = vec![0usize; w * h];
    if seeds.is_empty() {
        return owners;
    }
    let (wf, hf) = (w as f64, h as f64);
    owners.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for (x, owner) in row.iter_mut().enumerate() {
            *owner = nearest_seed(x as f64, y as f64, seeds, wf, hf);
        }
    });
    owners
}

/// Give every cell to its nearest plate and copy that plate's crust profile onto it.
pub fn assign_cells(state: &mut WorldState) {
    let seeds: Vec<(f64, f64)> = state.plates.iter().map(|p| (p.seed_x, p.seed_y)).collect();
    if seeds.is_empty() {
        return;
    }
    let owners = voronoi_owners(state.width, state.height, &seeds);
    let plates = &state.plates;
    state
        .grid
        .data
        .par_iter_mut()
        .zip(owners.par_iter())
        .for_each(|(cell, &owner)| {
            let plate = &plates[owner];
            cell.plate_id = plate.id;
            cell.crust_type = plate.crust_type;
            cell.height = plate.base_height;
            cell.crust_thickness = plate.base_thickness;
        });
}
