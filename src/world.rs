use crate::config::{GenerationConfig, MAX_CELLS};
use crate::error::ConfigError;
use crate::grid::{Cell, CrustType, Grid};

/// A rigid tectonic unit. Only the seed position changes after creation.
#[derive(Clone, Debug, PartialEq)]
pub struct Plate {
    pub id: i32,
    pub seed_x: f64,
    pub seed_y: f64,
    pub velocity_x: f64,
    pub velocity_y: f64,
    pub crust_type: CrustType,
    pub base_height: f64,
    pub base_thickness: f64,
}

/// Everything one generation run simulates. Moved wholesale between phases and threads.
#[derive(Clone, Debug)]
pub struct WorldState {
    pub width: usize,
    pub height: usize,
    pub config: GenerationConfig,
    pub grid: Grid<Cell>,
    pub plates: Vec<Plate>,
}

impl WorldState {
    /// Fresh world: flat, unassigned, dry.
    pub fn new(config: &GenerationConfig) -> Result<Self, ConfigError> {
        if config.width == 0 || config.height == 0 {
            return Err(ConfigError::InvalidDimensions {
                width: config.width,
                height: config.height,
            });
        }
        let cells = config.width as u64 * config.height as u64;
        if cells > MAX_CELLS {
            return Err(ConfigError::OutOfRange {
                field: "width * height",
                value: cells as f64,
                expected: "<= 16777216 cells",
            });
        }
        let width = config.width as usize;
        let height = config.height as usize;
        Ok(Self {
            width,
            height,
            config: config.clone(),
            grid: Grid::new(width, height),
            plates: Vec::new(),
        })
    }

    pub fn cell_count(&self) -> usize {
        self.grid.len()
    }

    pub fn seed(&self) -> u64 {
        self.config.seed.to_u64()
    }

    pub fn total_height(&self) -> f64 {
        self.grid.data.iter().map(|c| c.height).sum()
    }

    pub fn total_water(&self) -> f64 {
        self.grid.data.iter().map(|c| c.water).sum()
    }

    pub fn total_sediment(&self) -> f64 {
        self.grid.data.iter().map(|c| c.sediment).sum()
    }

    /// Height + water + sediment over the whole grid.
    pub fn total_mass(&self) -> f64 {
        self.grid
            .data
            .iter()
            .map(|c| c.height + c.water + c.sediment)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_world_is_blank() {
        let config = GenerationConfig {
            width: 8,
            height: 5,
            ..Default::default()
        };
        let world = WorldState::new(&config).unwrap();
        assert_eq!(world.cell_count(), 40);
        assert!(world.plates.is_empty());
        assert!(world.grid.data.iter().all(|c| *c == Cell::default()));
        assert_eq!(world.total_mass(), 0.0);
        assert_eq!(world.total_height(), 0.0);
    }

    #[test]
    fn rejects_grids_past_the_cell_cap() {
        let config = GenerationConfig {
            width: u32::MAX,
            height: u32::MAX,
            ..Default::default()
        };
        assert!(matches!(
            WorldState::new(&config),
            Err(ConfigError::OutOfRange { field: "width * height", .. })
        ));
    }

    #[test]
    fn rejects_empty_dimensions() {
        let config = GenerationConfig {
            width: 8,
            height: 0,
            ..Default::default()
        };
        assert!(matches!(
            WorldState::new(&config),
            Err(ConfigError::InvalidDimensions { height: 0, .. })
        ));
    }
}
