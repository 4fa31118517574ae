use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};
use rayon::prelude::*;

use crate::error::ProcessingError;
use crate::grid::{Cell, Grid};
use crate::rng::splitmix32;

/// Height ranges at or below this are treated as flat.
pub const FLAT_EPSILON: f64 = 1e-9;
/// Gray level of the lowest land.
pub const LAND_MIN: u8 = 50;
pub const WATER_GRAY: u8 = 0;

/// Rescale heights linearly into [0, 1]. A flat grid becomes uniformly 0.5.
///
/// Passes after the first are no-ops on an already normalized grid.
pub fn normalize_heights(grid: &mut Grid<Cell>, iterations: u32) -> Result<(), ProcessingError> {
    if grid.is_empty() {
        return Err(ProcessingError::EmptyGrid);
    }
    if let Some(i) = grid.data.iter().position(|c| !c.height.is_finite()) {
        return Err(ProcessingError::NonFiniteHeight {
            x: i % grid.w,
            y: i / grid.w,
            value: grid.data[i].height,
        });
    }

    for _ in 0..iterations.max(1) {
        let min_h = grid.data.iter().map(|c| c.height).fold(f64::INFINITY, f64::min);
        let max_h = grid.data.iter().map(|c| c.height).fold(f64::NEG_INFINITY, f64::max);
        let range = max_h - min_h;
        if range <= FLAT_EPSILON {
            grid.data.par_iter_mut().for_each(|c| c.height = 0.5);
            return Ok(());
        }
        grid.data
            .par_iter_mut()
            .for_each(|c| c.height = ((c.height - min_h) / range).clamp(0.0, 1.0));
    }
    Ok(())
}

/// Mark cells below `sea_level` as water. Heights are left untouched.
pub fn set_water_mask(grid: &mut Grid<Cell>, sea_level: f64) {
    grid.data
        .par_iter_mut()
        .for_each(|c| c.is_water = c.height < sea_level);
}

/// Gray level of one normalized height.
#[inline]
pub fn land_gray(height: f64, sea_level: f64) -> u8 {
    let t = if sea_level >= 1.0 {
        1.0
    } else {
        ((height - sea_level) / (1.0 - sea_level)).clamp(0.0, 1.0)
    };
    (LAND_MIN as f64 + t * (255 - LAND_MIN) as f64).round() as u8
}

/// Render the finalized grid: water black, land graded from `LAND_MIN` to white.
///
/// Land/water comes from the heights directly, so the mask and the raster always agree.
pub fn render_grayscale(grid: &Grid<Cell>, sea_level: f64) -> RgbaImage {
    let w = grid.w;
    let mut img = RgbaImage::new(w as u32, grid.h as u32);

    let buf: &mut [u8] = &mut img;
    buf.par_chunks_mut(w * 4)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let cell = grid.get(x, y);
                let v = if cell.height < sea_level {
                    WATER_GRAY
                } else {
                    land_gray(cell.height, sea_level)
                };
                px.copy_from_slice(&[v, v, v, 255]);
            }
        });
    img
}

/// Diagnostic: plates as flat colors, water darkened.
pub fn render_plates(grid: &Grid<Cell>) -> RgbaImage {
    let mut img = RgbaImage::new(grid.w as u32, grid.h as u32);
    for (x, y, px) in img.enumerate_pixels_mut() {
        let cell = grid.get(x as usize, y as usize);
        let color = if cell.plate_id < 0 {
            [128, 128, 128]
        } else {
            let hsh = splitmix32(cell.plate_id as u32 * 7 + 123);
            [
                (hsh & 0xFF) as u8 | 60,
                ((hsh >> 8) & 0xFF) as u8 | 60,
                ((hsh >> 16) & 0xFF) as u8 | 60,
            ]
        };
        let shade = if cell.is_water { 2 } else { 1 };
        *px = Rgba([color[0] / shade, color[1] / shade, color[2] / shade, 255]);
    }
    img
}

pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}
