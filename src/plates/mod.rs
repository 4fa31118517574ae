pub mod seed;
pub mod assign;
pub mod boundary;
pub mod stepper;

pub use stepper::{initialize_plates, run_tectonics, tectonic_step};
