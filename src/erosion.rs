//! Grid-based hydraulic erosion.
//!
//! Every iteration is a sequence of full-grid sweeps. Each sweep reads only the output of the
//! previous one and writes per-cell results, and cross-cell transfers are gathered from the
//! neighbors' per-direction outputs. That keeps the sweeps row-parallel while the result stays
//! independent of thread scheduling, and makes water and sediment transfers exactly mirrored.

use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::ErosionConfig;
use crate::error::ProcessingError;
use crate::grid::{Cell, Grid, neighbor, opposite};
use crate::progress::{CancelToken, Phase, StepProgress, should_report};
use crate::world::WorldState;

/// Water below this depth evaporates completely.
pub const WATER_EPSILON: f64 = 1e-9;

/// Per-cell outflow computed by one flow sweep.
#[derive(Clone, Debug)]
pub struct FlowField {
    /// Water sent in each `OFFSETS8` direction.
    pub out: Vec<[f64; 8]>,
    /// Sum of `out` per cell.
    pub total_out: Vec<f64>,
    /// Largest head drop to a neighbor, 0 when no neighbor is lower.
    pub slope: Vec<f64>,
}

/// Per-cell outcome of the erosion/transport sweep.
#[derive(Clone, Copy, Debug, Default)]
struct Transport {
    height_delta: f64,
    kept: f64,
    send: [f64; 8],
}

pub fn rainfall(grid: &mut Grid<Cell>, amount: f64) {
    grid.data.par_iter_mut().for_each(|c| c.water += amount);
}

/// Distribute each cell's water to its lower neighbors in proportion to the head drop.
///
/// Outflow is capped at half the largest drop so the cell's head cannot fall below its lowest
/// downhill neighbor's head in one step (the receiver rises by the same amount).
pub fn compute_flow(grid: &Grid<Cell>) -> FlowField {
    let w = grid.w;
    let h = grid.h;
    let n = w * h;
    let mut out = vec![[0.0f64; 8]; n];
    let mut total_out = vec![0.0f64; n];
    let mut slope = vec![0.0f64; n];

    out.par_chunks_mut(w)
        .zip(total_out.par_chunks_mut(w))
        .zip(slope.par_chunks_mut(w))
        .enumerate()
        .for_each(|(y, ((out_row, total_row), slope_row))| {
            for x in 0..w {
                let cell = grid.get(x, y);
                let head = cell.height + cell.water;

                let mut drops = [0.0f64; 8];
                let mut sum = 0.0;
                let mut max_drop = 0.0f64;
                for (dir, drop) in drops.iter_mut().enumerate() {
                    let (nx, ny) = neighbor(x, y, dir, w, h);
                    let other = grid.get(nx, ny);
                    let d = head - (other.height + other.water);
                    if d > 0.0 {
                        *drop = d;
                        sum += d;
                        max_drop = max_drop.max(d);
                    }
                }
                slope_row[x] = max_drop;

                if cell.water <= 0.0 || sum <= 0.0 {
                    continue;
                }
                let outflow = cell.water.min(max_drop * 0.5);
                let mut sent = 0.0;
                for dir in 0..8 {
                    let f = outflow * drops[dir] / sum;
                    out_row[x][dir] = f;
                    sent += f;
                }
                total_row[x] = sent;
            }
        });

    FlowField {
        out,
        total_out,
        slope,
    }
}

/// Water each cell receives from its neighbors under `flow`.
pub fn gather_inflow(flow: &FlowField, w: usize, h: usize) -> Vec<f64> {
    let mut inflow = vec![0.0f64; w * h];
    inflow.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for (x, v) in row.iter_mut().enumerate() {
            *v = (0..8)
                .map(|dir| {
                    let (nx, ny) = neighbor(x, y, dir, w, h);
                    flow.out[ny * w + nx][opposite(dir)]
                })
                .sum();
        }
    });
    inflow
}

/// Move water along `flow`. Returns the inflow per cell.
pub fn apply_water_flow(grid: &mut Grid<Cell>, flow: &FlowField) -> Vec<f64> {
    let inflow = gather_inflow(flow, grid.w, grid.h);
    grid.data
        .par_iter_mut()
        .zip(flow.total_out.par_iter())
        .zip(inflow.par_iter())
        .for_each(|((cell, &out), &inn)| {
            cell.water = (cell.water - out + inn).max(0.0);
        });
    inflow
}

/// Erode where water drains away, carry sediment downstream, deposit where it pools.
pub fn erode_and_transport(
    grid: &mut Grid<Cell>,
    flow: &FlowField,
    inflow: &[f64],
    cfg: &ErosionConfig,
) {
    let w = grid.w;
    let h = grid.h;
    let mut transport = vec![Transport::default(); w * h];

    transport
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, t)| {
            let cell = &grid.data[i];
            let out = flow.total_out[i];
            let capacity =
                out * cfg.sediment_capacity_factor * flow.slope[i].max(cfg.min_slope);

            if out > 0.0 && inflow[i] < out {
                let eroded = (out * cfg.erosion_factor).min(cell.height.max(0.0));
                let mut carried = cell.sediment + eroded;
                let deposit = (carried - capacity).max(0.0);
                carried -= deposit;

                let mut sent = 0.0;
                for dir in 0..8 {
                    let s = carried * flow.out[i][dir] / out;
                    t.send[dir] = s;
                    sent += s;
                }
                t.kept = (carried - sent).max(0.0);
                t.height_delta = deposit - eroded;
            } else if cell.sediment > capacity {
                let deposit = (cell.sediment - capacity) * cfg.deposition_factor;
                t.height_delta = deposit;
                t.kept = cell.sediment - deposit;
            } else {
                t.kept = cell.sediment;
            }
        });

    grid.data
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, cell) in row.iter_mut().enumerate() {
                let i = y * w + x;
                let received: f64 = (0..8)
                    .map(|dir| {
                        let (nx, ny) = neighbor(x, y, dir, w, h);
                        transport[ny * w + nx].send[opposite(dir)]
                    })
                    .sum();
                cell.height += transport[i].height_delta;
                cell.sediment = (transport[i].kept + received).max(0.0);
            }
        });
}

pub fn evaporate(grid: &mut Grid<Cell>, rate: f64) {
    let keep = 1.0 - rate;
    grid.data.par_iter_mut().for_each(|c| {
        c.water *= keep;
        if c.water < WATER_EPSILON {
            c.water = 0.0;
        }
    });
}

/// One full erosion iteration.
pub fn erosion_step(grid: &mut Grid<Cell>, cfg: &ErosionConfig) {
    rainfall(grid, cfg.rainfall);
    let flow = compute_flow(grid);
    let inflow = apply_water_flow(grid, &flow);
    erode_and_transport(grid, &flow, &inflow, cfg);
    evaporate(grid, cfg.evaporation_rate);
}

/// Drop all suspended sediment back onto the terrain.
pub fn settle_sediment(grid: &mut Grid<Cell>) {
    grid.data.par_iter_mut().for_each(|c| {
        c.height += c.sediment;
        c.sediment = 0.0;
    });
}

/// Full erosion phase. Water and sediment start at zero; leftover sediment settles at the end.
pub fn run_erosion(
    state: &mut WorldState,
    cancel: &CancelToken,
    mut on_step: impl FnMut(StepProgress),
) -> Result<(), ProcessingError> {
    let start = Instant::now();
    let cfg = state.config.erosion.clone();
    let interval = state.config.progress_interval;

    state.grid.data.par_iter_mut().for_each(|c| {
        c.water = 0.0;
        c.sediment = 0.0;
    });

    let total = cfg.iterations;
    for step in 1..=total {
        if cancel.is_cancelled() {
            return Err(ProcessingError::Cancelled {
                phase: Phase::Erosion,
            });
        }
        erosion_step(&mut state.grid, &cfg);
        if should_report(step, total, interval) {
            debug!(
                step,
                total,
                water = state.total_water(),
                sediment = state.total_sediment(),
                "erosion step"
            );
            on_step(StepProgress {
                phase: Phase::Erosion,
                current_step: step,
                total_steps: total,
            });
        }
    }

    settle_sediment(&mut state.grid);
    info!(
        iterations = total,
        height = state.total_height(),
        ms = start.elapsed().as_secs_f64() * 1000.0,
        "erosion finished"
    );
    Ok(())
}
