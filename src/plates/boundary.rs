use rayon::prelude::*;

use crate::grid::{Cell, Grid, neighbors8_wrap};

/// Flag cells sitting on a plate boundary.
///
/// A cell is on a boundary when the plate about to influence it differs from its current
/// owner, or when any of its 8 wrapped neighbors belongs to another plate.
/// `influence` holds the influencing plate id per cell, row-major.
pub fn detect_boundaries(grid: &Grid<Cell>, influence: &[i32]) -> Vec<bool> {
    let w = grid.w;
    let h = grid.h;
    let mut boundary = vec![false; w * h];

    boundary.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for (x, flag) in row.iter_mut().enumerate() {
            let owner = grid.get(x, y).plate_id;
            *flag = influence[y * w + x] != owner
                || neighbors8_wrap(x, y, w, h).any(|(nx, ny)| grid.get(nx, ny).plate_id != owner);
        }
    });

    boundary
}
