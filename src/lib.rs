pub mod config;
pub mod elevation;
pub mod erosion;
pub mod error;
pub mod grid;
pub mod noise;
pub mod plates;
pub mod progress;
pub mod render;
pub mod rng;
pub mod world;
pub mod worker;

use std::time::Instant;

use image::RgbaImage;
use tracing::{error, info};

pub use config::{GenerationConfig, Seed};
pub use error::{ConfigError, GenerationError, ProcessingError};
pub use progress::{CancelToken, Phase, PhaseStatus, ProgressEvent, StepProgress};
pub use world::{Plate, WorldState};

use worker::{PhaseRequest, run_isolated};

/// A finished run: the finalized world and its rendered heightmap.
#[derive(Debug)]
pub struct GeneratedMap {
    pub world: WorldState,
    pub image: RgbaImage,
}

/// Generate a heightmap image from `config`, reporting progress through `on_progress`.
pub fn generate_map(
    config: &GenerationConfig,
    on_progress: impl FnMut(ProgressEvent<'_>),
) -> Result<RgbaImage, GenerationError> {
    generate_map_with_cancel(config, &CancelToken::new(), on_progress)
}

pub fn generate_map_with_cancel(
    config: &GenerationConfig,
    cancel: &CancelToken,
    on_progress: impl FnMut(ProgressEvent<'_>),
) -> Result<RgbaImage, GenerationError> {
    generate_world(config, cancel, on_progress).map(|map| map.image)
}

/// Run the whole pipeline and keep the finalized world alongside the image.
///
/// Exactly one terminal event (`Complete` or `Error`) is delivered before returning.
pub fn generate_world(
    config: &GenerationConfig,
    cancel: &CancelToken,
    mut on_progress: impl FnMut(ProgressEvent<'_>),
) -> Result<GeneratedMap, GenerationError> {
    let total_start = Instant::now();
    match run_pipeline(config, cancel, &mut on_progress) {
        Ok(map) => {
            info!(
                width = map.world.width,
                height = map.world.height,
                ms = total_start.elapsed().as_secs_f64() * 1000.0,
                "map generated"
            );
            on_progress(ProgressEvent::Complete { image: &map.image });
            Ok(map)
        }
        Err(e) => {
            error!(error = %e, "map generation failed");
            on_progress(ProgressEvent::Error {
                message: e.to_string(),
            });
            Err(e)
        }
    }
}

fn status(on_progress: &mut impl FnMut(ProgressEvent<'_>), phase: Phase, status: PhaseStatus) {
    on_progress(ProgressEvent::Status { phase, status });
}

fn run_pipeline(
    config: &GenerationConfig,
    cancel: &CancelToken,
    on_progress: &mut impl FnMut(ProgressEvent<'_>),
) -> Result<GeneratedMap, GenerationError> {
    // 1. Setup
    status(on_progress, Phase::Setup, PhaseStatus::Started);
    config.validate()?;
    let mut world = WorldState::new(config)?;
    info!(
        width = world.width,
        height = world.height,
        seed = world.seed(),
        "world initialized"
    );
    status(on_progress, Phase::Setup, PhaseStatus::Finished);

    // 2. Tectonics (worker thread)
    if config.tectonics.enabled {
        status(on_progress, Phase::Tectonics, PhaseStatus::Started);
        world = run_isolated(PhaseRequest::StartTectonics(world), cancel, |p| {
            on_progress(ProgressEvent::Step(p))
        })?;
        status(on_progress, Phase::Tectonics, PhaseStatus::Finished);
    } else {
        status(on_progress, Phase::Tectonics, PhaseStatus::Skipped);
    }

    // 3. Detail noise (this thread)
    if config.noise.enabled {
        status(on_progress, Phase::Noise, PhaseStatus::Started);
        elevation::apply_detail_noise(&mut world);
        status(on_progress, Phase::Noise, PhaseStatus::Finished);
    } else {
        status(on_progress, Phase::Noise, PhaseStatus::Skipped);
    }

    // 4. Erosion (worker thread)
    if config.erosion.enabled {
        status(on_progress, Phase::Erosion, PhaseStatus::Started);
        world = run_isolated(PhaseRequest::StartErosion(world), cancel, |p| {
            on_progress(ProgressEvent::Step(p))
        })?;
        status(on_progress, Phase::Erosion, PhaseStatus::Finished);
    } else {
        status(on_progress, Phase::Erosion, PhaseStatus::Skipped);
    }

    // 5. Finalize
    status(on_progress, Phase::Finalization, PhaseStatus::Started);
    let image = finalize(&mut world)?;
    status(on_progress, Phase::Finalization, PhaseStatus::Finished);

    Ok(GeneratedMap { world, image })
}

/// Normalize, classify water and rasterize. Safe to repeat on an already finalized world.
pub fn finalize(world: &mut WorldState) -> Result<RgbaImage, ProcessingError> {
    let start = Instant::now();
    let sea_level = world.config.finalize.sea_level;
    render::normalize_heights(&mut world.grid, world.config.finalize.normalize_passes)?;
    render::set_water_mask(&mut world.grid, sea_level);
    let image = render::render_grayscale(&world.grid, sea_level);

    let water = world.grid.data.iter().filter(|c| c.is_water).count();
    info!(
        water_fraction = water as f64 / world.cell_count() as f64,
        ms = start.elapsed().as_secs_f64() * 1000.0,
        "finalized"
    );
    Ok(image)
}
