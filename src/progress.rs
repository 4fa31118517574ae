use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use image::RgbaImage;
use serde::Serialize;

/// Pipeline phase tag carried by every progress event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Phase {
    Setup,
    Tectonics,
    Noise,
    Erosion,
    Finalization,
    Complete,
    Error,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::Setup => "Setup",
            Phase::Tectonics => "Tectonics",
            Phase::Noise => "Noise",
            Phase::Erosion => "Erosion",
            Phase::Finalization => "Finalization",
            Phase::Complete => "Complete",
            Phase::Error => "Error",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PhaseStatus {
    Started,
    Skipped,
    Finished,
}

/// Step counter reported by the iterative phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StepProgress {
    pub phase: Phase,
    pub current_step: u32,
    pub total_steps: u32,
}

/// Event delivered to the caller's progress callback.
///
/// Exactly one terminal event (`Complete` or `Error`) ends every run.
#[derive(Clone, Debug)]
pub enum ProgressEvent<'a> {
    Status { phase: Phase, status: PhaseStatus },
    Step(StepProgress),
    Complete { image: &'a RgbaImage },
    Error { message: String },
}

impl ProgressEvent<'_> {
    pub fn phase(&self) -> Phase {
        match self {
            ProgressEvent::Status { phase, .. } => *phase,
            ProgressEvent::Step(step) => step.phase,
            ProgressEvent::Complete { .. } => Phase::Complete,
            ProgressEvent::Error { .. } => Phase::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::Complete { .. } | ProgressEvent::Error { .. })
    }
}

/// Decides which steps of an `total`-step loop report progress.
#[inline]
pub fn should_report(step: u32, total: u32, interval: u32) -> bool {
    step == total || (interval > 0 && step % interval == 0)
}

/// Cooperative cancellation flag, checked between simulation steps.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_on_interval_and_last_step() {
        let reported: Vec<u32> = (1..=12).filter(|&s| should_report(s, 12, 5)).collect();
        assert_eq!(reported, vec![5, 10, 12]);
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
