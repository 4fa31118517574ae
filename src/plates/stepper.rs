use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::ProcessingError;
use crate::grid::CrustType;
use crate::progress::{CancelToken, Phase, StepProgress, should_report};
use crate::rng::phase_rng;
use crate::world::WorldState;

use super::assign::{assign_cells, voronoi_owners};
use super::boundary::detect_boundaries;
use super::seed::create_plates;

const SALT_PLATES: u64 = 0x91A7_E500_CAFE_0001;

/// Wrap a continuous coordinate into `[0, extent)`.
#[inline]
fn wrap_coord(v: f64, extent: f64) -> f64 {
    let r = v.rem_euclid(extent);
    // rem_euclid can round up to `extent` for tiny negative inputs.
    if r >= extent { 0.0 } else { r }
}

/// Create the configured plates and hand every cell to its nearest one.
pub fn initialize_plates(state: &mut WorldState) {
    let cfg = state.config.tectonics.clone();
    let mut rng = phase_rng(state.seed(), SALT_PLATES);
    state.plates = create_plates(
        state.width,
        state.height,
        cfg.plate_count as usize,
        cfg.oceanic_chance,
        cfg.base_speed,
        &mut rng,
    );
    assign_cells(state);

    let oceanic = state
        .plates
        .iter()
        .filter(|p| p.crust_type == CrustType::Oceanic)
        .count();
    debug!(
        plates = state.plates.len(),
        oceanic,
        continental = state.plates.len() - oceanic,
        "plates assigned"
    );
}

/// Advance every plate by one velocity step and rebuild cell ownership.
/// Returns the number of boundary cells that were uplifted.
pub fn tectonic_step(state: &mut WorldState) -> usize {
    if state.plates.is_empty() {
        return 0;
    }
    let w = state.width as f64;
    let h = state.height as f64;
    let uplift = state.config.tectonics.boundary_uplift;

    let theoretical: Vec<(f64, f64)> = state
        .plates
        .iter()
        .map(|p| (wrap_coord(p.seed_x + p.velocity_x, w), wrap_coord(p.seed_y + p.velocity_y, h)))
        .collect();

    let influence_idx = voronoi_owners(state.width, state.height, &theoretical);
    let influence: Vec<i32> = influence_idx.iter().map(|&i| state.plates[i].id).collect();
    let boundary = detect_boundaries(&state.grid, &influence);

    let plates = &state.plates;
    state
        .grid
        .data
        .par_iter_mut()
        .zip(influence_idx.par_iter())
        .zip(boundary.par_iter())
        .for_each(|((cell, &owner), &on_boundary)| {
            if on_boundary {
                cell.height += uplift;
            }
            let plate = &plates[owner];
            cell.plate_id = plate.id;
            cell.crust_type = plate.crust_type;
        });

    for (plate, (x, y)) in state.plates.iter_mut().zip(theoretical) {
        plate.seed_x = x;
        plate.seed_y = y;
    }

    boundary.iter().filter(|&&b| b).count()
}

/// Full tectonic phase: plate creation and assignment, then the configured number of steps.
pub fn run_tectonics(
    state: &mut WorldState,
    cancel: &CancelToken,
    mut on_step: impl FnMut(StepProgress),
) -> Result<(), ProcessingError> {
    let start = Instant::now();
    initialize_plates(state);

    let total = state.config.tectonics.steps;
    let interval = state.config.progress_interval;
    for step in 1..=total {
        if cancel.is_cancelled() {
            return Err(ProcessingError::Cancelled {
                phase: Phase::Tectonics,
            });
        }
        let uplifted = tectonic_step(state);
        if should_report(step, total, interval) {
            debug!(step, total, uplifted, "tectonic step");
            on_step(StepProgress {
                phase: Phase::Tectonics,
                current_step: step,
                total_steps: total,
            });
        }
    }

    info!(
        steps = total,
        ms = start.elapsed().as_secs_f64() * 1000.0,
        "tectonics finished"
    );
    Ok(())
}
