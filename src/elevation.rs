use std::time::Instant;

use rayon::prelude::*;
use tracing::info;

use crate::config::NoiseConfig;
use crate::noise::NoiseContext;
use crate::rng::derive_seed;
use crate::world::WorldState;

const SALT_DETAIL: u64 = 0xE1E7_DE7A_1100_FACE;

/// Seed of the detail noise field: the explicit noise seed, or one derived from the world seed.
pub fn detail_seed(noise: &NoiseConfig, world_seed: u64) -> u64 {
    match &noise.seed {
        Some(seed) => seed.to_u64(),
        None => derive_seed(world_seed, SALT_DETAIL),
    }
}

/// Add fractal detail to every cell's height.
///
/// Coordinates are normalized to the unit square before sampling, so `frequency` counts
/// features across the whole map regardless of resolution.
pub fn apply_detail_noise(state: &mut WorldState) {
    let start = Instant::now();
    let cfg = state.config.noise.clone();
    let ctx = NoiseContext::new(detail_seed(&cfg, state.seed()));
    let w = state.width;
    let (wf, hf) = (state.width as f64, state.height as f64);

    state
        .grid
        .data
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, cell) in row.iter_mut().enumerate() {
                let u = x as f64 / wf;
                let v = y as f64 / hf;
                let n = ctx.fbm(u, v, cfg.octaves, cfg.persistence, cfg.lacunarity, cfg.frequency);
                cell.height += n * cfg.strength;
            }
        });

    info!(ms = start.elapsed().as_secs_f64() * 1000.0, "detail noise applied");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GenerationConfig, Seed};

    fn world(seed: u64) -> WorldState {
        let config = GenerationConfig {
            width: 32,
            height: 16,
            seed: Seed::Unsigned(seed),
            ..Default::default()
        };
        WorldState::new(&config).unwrap()
    }

    #[test]
    fn detail_is_bounded_by_strength() {
        let mut state = world(9);
        apply_detail_noise(&mut state);
        let strength = state.config.noise.strength;
        assert!(state.grid.data.iter().all(|c| c.height.abs() <= strength));
        assert!(state.grid.data.iter().any(|c| c.height != 0.0));
    }

    #[test]
    fn zero_strength_is_identity() {
        let mut state = world(9);
        state.config.noise.strength = 0.0;
        apply_detail_noise(&mut state);
        assert!(state.grid.data.iter().all(|c| c.height == 0.0));
    }

    #[test]
    fn explicit_noise_seed_overrides_world_seed() {
        let mut a = world(1);
        let mut b = world(2);
        a.config.noise.seed = Some(Seed::Text("hills".into()));
        b.config.noise.seed = Some(Seed::Text("hills".into()));
        apply_detail_noise(&mut a);
        apply_detail_noise(&mut b);
        assert_eq!(a.grid, b.grid);
    }
}
