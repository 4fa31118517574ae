//! Runs the long simulation phases on their own threads.
//!
//! The world is moved into the worker with the start request and moved back in the result
//! message, so the orchestrator never touches it while a phase owns it.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::erosion::run_erosion;
use crate::error::GenerationError;
use crate::plates::run_tectonics;
use crate::progress::{CancelToken, Phase, StepProgress};
use crate::world::WorldState;

pub enum PhaseRequest {
    StartTectonics(WorldState),
    StartErosion(WorldState),
}

impl PhaseRequest {
    pub fn phase(&self) -> Phase {
        match self {
            PhaseRequest::StartTectonics(_) => Phase::Tectonics,
            PhaseRequest::StartErosion(_) => Phase::Erosion,
        }
    }
}

/// Messages from a phase worker: any number of `Progress`, then one `Result` or `Error`.
pub enum PhaseMessage {
    Progress(StepProgress),
    Result(Box<WorldState>),
    Error(String),
}

/// Handle on one running phase thread.
pub struct PhaseWorker {
    phase: Phase,
    rx: Receiver<PhaseMessage>,
    thread: Option<JoinHandle<()>>,
}

impl PhaseWorker {
    pub fn spawn(request: PhaseRequest, cancel: CancelToken) -> Result<Self, GenerationError> {
        let phase = request.phase();
        let (tx, rx) = mpsc::channel::<PhaseMessage>();
        let thread = thread::Builder::new()
            .name(format!("{}-worker", phase.name().to_lowercase()))
            .spawn(move || worker_main(request, cancel, tx))
            .map_err(|e| GenerationError::Channel {
                phase,
                reason: e.to_string(),
            })?;
        Ok(Self {
            phase,
            rx,
            thread: Some(thread),
        })
    }

    /// Block until the phase finishes, forwarding progress as it arrives.
    pub fn wait(mut self, mut on_progress: impl FnMut(StepProgress)) -> Result<WorldState, GenerationError> {
        let outcome = loop {
            match self.rx.recv() {
                Ok(PhaseMessage::Progress(p)) => on_progress(p),
                Ok(PhaseMessage::Result(state)) => break Ok(*state),
                Ok(PhaseMessage::Error(message)) => {
                    break Err(GenerationError::Phase {
                        phase: self.phase,
                        message,
                    });
                }
                Err(_) => {
                    break Err(GenerationError::Channel {
                        phase: self.phase,
                        reason: "worker hung up without a result".to_string(),
                    });
                }
            }
        };

        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!(phase = %self.phase, "worker thread panicked");
            if outcome.is_ok() {
                return Err(GenerationError::Channel {
                    phase: self.phase,
                    reason: "worker thread panicked".to_string(),
                });
            }
        }
        outcome
    }
}

impl Drop for PhaseWorker {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn worker_main(request: PhaseRequest, cancel: CancelToken, tx: Sender<PhaseMessage>) {
    let phase = request.phase();
    debug!(%phase, "worker started");
    let progress_tx = tx.clone();
    let report = move |p: StepProgress| {
        let _ = progress_tx.send(PhaseMessage::Progress(p));
    };

    let result = match request {
        PhaseRequest::StartTectonics(mut state) => {
            run_tectonics(&mut state, &cancel, report).map(|()| state)
        }
        PhaseRequest::StartErosion(mut state) => {
            run_erosion(&mut state, &cancel, report).map(|()| state)
        }
    };

    let message = match result {
        Ok(state) => PhaseMessage::Result(Box::new(state)),
        Err(e) => PhaseMessage::Error(e.to_string()),
    };
    let _ = tx.send(message);
}

/// Run one phase on a worker thread and wait for it.
pub fn run_isolated(
    request: PhaseRequest,
    cancel: &CancelToken,
    on_progress: impl FnMut(StepProgress),
) -> Result<WorldState, GenerationError> {
    PhaseWorker::spawn(request, cancel.clone())?.wait(on_progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;

    fn state() -> WorldState {
        let mut config = GenerationConfig {
            width: 12,
            height: 8,
            progress_interval: 3,
            ..Default::default()
        };
        config.tectonics.plate_count = 3;
        config.tectonics.steps = 7;
        config.erosion.iterations = 6;
        WorldState::new(&config).unwrap()
    }

    #[test]
    fn tectonics_round_trip_through_worker() {
        let mut steps = Vec::new();
        let out = run_isolated(
            PhaseRequest::StartTectonics(state()),
            &CancelToken::new(),
            |p| {
                assert_eq!(p.phase, Phase::Tectonics);
                steps.push(p.current_step);
            },
        )
        .unwrap();
        assert_eq!(steps, vec![3, 6, 7]);
        assert_eq!(out.plates.len(), 3);
        assert!(out.grid.data.iter().all(|c| c.plate_id >= 0));
    }

    #[test]
    fn worker_matches_inline_run() {
        let mut inline = state();
        run_tectonics(&mut inline, &CancelToken::new(), |_| {}).unwrap();
        let threaded = run_isolated(
            PhaseRequest::StartTectonics(state()),
            &CancelToken::new(),
            |_| {},
        )
        .unwrap();
        assert_eq!(inline.grid, threaded.grid);
        assert_eq!(inline.plates, threaded.plates);
    }

    #[test]
    fn phase_error_comes_back_as_message() {
        let token = CancelToken::new();
        token.cancel();
        let err = run_isolated(PhaseRequest::StartErosion(state()), &token, |_| {}).unwrap_err();
        match err {
            GenerationError::Phase { phase, message } => {
                assert_eq!(phase, Phase::Erosion);
                assert!(message.contains("cancelled"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
