use rand::Rng;

use crate::grid::CrustType;
use crate::world::Plate;

pub const OCEANIC_BASE_HEIGHT: f64 = 0.1;
pub const OCEANIC_BASE_THICKNESS: f64 = 7.0;
pub const CONTINENTAL_BASE_HEIGHT: f64 = 0.6;
pub const CONTINENTAL_BASE_THICKNESS: f64 = 35.0;

/// Base (height, thickness) of a crust type.
pub fn crust_profile(crust: CrustType) -> (f64, f64) {
    match crust {
        CrustType::Oceanic => (OCEANIC_BASE_HEIGHT, OCEANIC_BASE_THICKNESS),
        CrustType::Continental => (CONTINENTAL_BASE_HEIGHT, CONTINENTAL_BASE_THICKNESS),
        CrustType::Unset => (0.0, 0.0),
    }
}

/// Uniformly scattered plates with random velocities and weighted crust types.
///
/// Each velocity component is uniform in `[-base_speed, base_speed]`. Plate ids are the
/// indices into the returned vector.
pub fn create_plates<R: Rng>(
    w: usize,
    h: usize,
    count: usize,
    oceanic_chance: f64,
    base_speed: f64,
    rng: &mut R,
) -> Vec<Plate> {
    (0..count)
        .map(|i| {
            let seed_x = rng.gen_range(0.0..w as f64);
            let seed_y = rng.gen_range(0.0..h as f64);
            let velocity_x = rng.gen_range(-1.0f64..=1.0) * base_speed;
            let velocity_y = rng.gen_range(-1.0f64..=1.0) * base_speed;
            let crust_type = if rng.gen_bool(oceanic_chance) {
                CrustType::Oceanic
            } else {
                CrustType::Continental
            };
            let (base_height, base_thickness) = crust_profile(crust_type);
            Plate {
                id: i as i32,
                seed_x,
                seed_y,
                velocity_x,
                velocity_y,
                crust_type,
                base_height,
                base_thickness,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::phase_rng;

    #[test]
    fn plates_start_inside_the_grid() {
        let mut rng = phase_rng(5, 1);
        let plates = create_plates(40, 20, 30, 0.5, 1.5, &mut rng);
        assert_eq!(plates.len(), 30);
        for (i, p) in plates.iter().enumerate() {
            assert_eq!(p.id, i as i32);
            assert!((0.0..40.0).contains(&p.seed_x));
            assert!((0.0..20.0).contains(&p.seed_y));
            assert!(p.velocity_x.abs() <= 1.5 && p.velocity_y.abs() <= 1.5);
            assert_eq!((p.base_height, p.base_thickness), crust_profile(p.crust_type));
        }
    }

    #[test]
    fn oceanic_chance_extremes() {
        let mut rng = phase_rng(5, 2);
        let all_ocean = create_plates(10, 10, 16, 1.0, 1.0, &mut rng);
        assert!(all_ocean.iter().all(|p| p.crust_type == CrustType::Oceanic));
        let all_land = create_plates(10, 10, 16, 0.0, 1.0, &mut rng);
        assert!(all_land.iter().all(|p| p.crust_type == CrustType::Continental));
    }

    #[test]
    fn continental_crust_is_higher_and_thicker() {
        let (oh, ot) = crust_profile(CrustType::Oceanic);
        let (ch, ct) = crust_profile(CrustType::Continental);
        assert!(ch > oh && ct > ot);
    }
}
