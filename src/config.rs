use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::rng::{hash_str, splitmix64};

/// Largest grid a run will allocate (4096 x 4096 cells).
pub const MAX_CELLS: u64 = 1 << 24;

/// Random seed: any number or string. Strings are hashed, so `"archipelago"` is a valid seed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seed {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Text(String),
}

impl Seed {
    /// Stable 64-bit value of the seed.
    pub fn to_u64(&self) -> u64 {
        match self {
            Seed::Unsigned(v) => *v,
            Seed::Signed(v) => *v as u64,
            Seed::Float(v) => splitmix64(v.to_bits()),
            Seed::Text(s) => hash_str(s),
        }
    }
}

impl Default for Seed {
    fn default() -> Self {
        Seed::Unsigned(42)
    }
}

impl From<u64> for Seed {
    fn from(v: u64) -> Self {
        Seed::Unsigned(v)
    }
}

impl From<&str> for Seed {
    fn from(s: &str) -> Self {
        Seed::Text(s.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TectonicsConfig {
    pub enabled: bool,
    pub plate_count: u32,
    /// Probability that a new plate carries oceanic crust.
    pub oceanic_chance: f64,
    pub steps: u32,
    /// Velocity magnitude in cells per step.
    pub base_speed: f64,
    /// Height added to every boundary cell per step.
    pub boundary_uplift: f64,
}

impl Default for TectonicsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            plate_count: 12,
            oceanic_chance: 0.6,
            steps: 40,
            base_speed: 1.0,
            boundary_uplift: 0.02,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub enabled: bool,
    /// Falls back to a value derived from the world seed.
    pub seed: Option<Seed>,
    pub frequency: f64,
    pub octaves: u32,
    pub persistence: f64,
    pub lacunarity: f64,
    pub strength: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            seed: None,
            frequency: 4.0,
            octaves: 6,
            persistence: 0.5,
            lacunarity: 2.0,
            strength: 0.25,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErosionConfig {
    pub enabled: bool,
    pub iterations: u32,
    /// Water added to every cell per iteration.
    pub rainfall: f64,
    /// Fraction of standing water removed per iteration.
    pub evaporation_rate: f64,
    pub erosion_factor: f64,
    pub deposition_factor: f64,
    pub min_slope: f64,
    pub sediment_capacity_factor: f64,
}

impl Default for ErosionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            iterations: 50,
            rainfall: 0.01,
            evaporation_rate: 0.05,
            erosion_factor: 0.05,
            deposition_factor: 0.3,
            min_slope: 0.01,
            sediment_capacity_factor: 4.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalizeConfig {
    /// Normalized height below which a cell is water.
    pub sea_level: f64,
    pub normalize_passes: u32,
}

impl Default for FinalizeConfig {
    fn default() -> Self {
        Self {
            sea_level: 0.35,
            normalize_passes: 1,
        }
    }
}

/// All tunable parameters. Every field is optional in serialized form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub width: u32,
    pub height: u32,
    pub seed: Seed,
    pub tectonics: TectonicsConfig,
    pub noise: NoiseConfig,
    pub erosion: ErosionConfig,
    pub finalize: FinalizeConfig,
    /// Simulation steps between progress events.
    pub progress_interval: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 256,
            seed: Seed::default(),
            tectonics: TectonicsConfig::default(),
            noise: NoiseConfig::default(),
            erosion: ErosionConfig::default(),
            finalize: FinalizeConfig::default(),
            progress_interval: 5,
        }
    }
}

impl GenerationConfig {
    /// Merge caller overrides (any subset of the serialized fields) over the defaults.
    pub fn from_overrides(overrides: &serde_json::Value) -> Result<Self, ConfigError> {
        let mut merged = serde_json::to_value(Self::default())?;
        merge_json(&mut merged, overrides);
        let config: Self = serde_json::from_value(merged)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file. Missing fields keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        let cells = self.width as u64 * self.height as u64;
        if cells > MAX_CELLS {
            return Err(out_of_range("width * height", cells as f64, "<= 16777216 cells"));
        }
        if self.progress_interval == 0 {
            return Err(out_of_range("progress_interval", 0.0, ">= 1"));
        }

        let t = &self.tectonics;
        if t.enabled && t.plate_count == 0 {
            return Err(out_of_range("tectonics.plate_count", 0.0, ">= 1"));
        }
        if t.enabled && t.plate_count as u64 > cells {
            return Err(out_of_range(
                "tectonics.plate_count",
                t.plate_count as f64,
                "<= width * height",
            ));
        }
        check_unit("tectonics.oceanic_chance", t.oceanic_chance)?;
        check_non_negative("tectonics.base_speed", t.base_speed)?;
        check_finite("tectonics.boundary_uplift", t.boundary_uplift)?;

        let n = &self.noise;
        check_non_negative("noise.frequency", n.frequency)?;
        check_non_negative("noise.persistence", n.persistence)?;
        check_non_negative("noise.lacunarity", n.lacunarity)?;
        check_finite("noise.strength", n.strength)?;
        if n.octaves > 32 {
            return Err(out_of_range("noise.octaves", n.octaves as f64, "0..=32"));
        }

        let e = &self.erosion;
        check_non_negative("erosion.rainfall", e.rainfall)?;
        check_unit("erosion.evaporation_rate", e.evaporation_rate)?;
        check_non_negative("erosion.erosion_factor", e.erosion_factor)?;
        check_unit("erosion.deposition_factor", e.deposition_factor)?;
        check_non_negative("erosion.min_slope", e.min_slope)?;
        check_non_negative("erosion.sediment_capacity_factor", e.sediment_capacity_factor)?;

        check_unit("finalize.sea_level", self.finalize.sea_level)?;
        Ok(())
    }
}

/// Recursively overlay `patch` onto `base`. Objects merge key by key, everything else replaces.
fn merge_json(base: &mut serde_json::Value, patch: &serde_json::Value) {
    match (base, patch) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}

fn out_of_range(field: &'static str, value: f64, expected: &'static str) -> ConfigError {
    ConfigError::OutOfRange {
        field,
        value,
        expected,
    }
}

fn check_finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(out_of_range(field, value, "a finite number"))
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(out_of_range(field, value, ">= 0"))
    }
}

fn check_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(out_of_range(field, value, "0..=1"))
    }
}
