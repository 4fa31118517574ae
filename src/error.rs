use thiserror::Error;

use crate::progress::Phase;

/// Invalid configuration. Raised before any simulation work starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("grid dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("{field} = {value} is out of range (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure inside a simulation phase.
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("non-finite height {value} at ({x}, {y})")]
    NonFiniteHeight { x: usize, y: usize, value: f64 },
    #[error("{phase} phase cancelled")]
    Cancelled { phase: Phase },
    #[error("grid has no cells")]
    EmptyGrid,
}

/// Anything that stops a `generate_map` call from producing an image.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Processing(#[from] ProcessingError),
    #[error("{phase} phase failed: {message}")]
    Phase { phase: Phase, message: String },
    #[error("{phase} worker channel failed: {reason}")]
    Channel { phase: Phase, reason: String },
    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}
