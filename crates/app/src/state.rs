//! State machine for one xsnip run

use thiserror::Error;

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Nothing started yet
    Idle,
    /// Grabbing the root window
    Capturing,
    /// Overlay is up, waiting for the user
    Selecting,
    /// Cropping, encoding and writing
    Saving,
    /// File written
    Done,
    /// User backed out of the overlay
    Cancelled,
    /// Any step failed
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::Done | PipelineState::Cancelled | PipelineState::Failed
        )
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Pipeline cannot move from {from:?} to {to:?}")]
pub struct InvalidTransition {
    pub from: PipelineState,
    pub to: PipelineState,
}

/// Guarded transitions between pipeline states.
///
/// A transition called from the wrong state is refused with
/// [`InvalidTransition`] and leaves the state unchanged.
pub struct StateMachine {
    state: PipelineState,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn advance(&mut self, allowed: bool, next: PipelineState) -> Result<(), InvalidTransition> {
        if !allowed {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        log::debug!("Pipeline: {:?} -> {:?}", self.state, next);
        self.state = next;
        Ok(())
    }

    pub fn start_capturing(&mut self) -> Result<(), InvalidTransition> {
        self.advance(self.state == PipelineState::Idle, PipelineState::Capturing)
    }

    pub fn start_selecting(&mut self) -> Result<(), InvalidTransition> {
        self.advance(self.state == PipelineState::Capturing, PipelineState::Selecting)
    }

    /// Selection confirmed, or skipped for non-interactive modes
    pub fn start_saving(&mut self) -> Result<(), InvalidTransition> {
        let allowed = matches!(self.state, PipelineState::Capturing | PipelineState::Selecting);
        self.advance(allowed, PipelineState::Saving)
    }

    pub fn finish(&mut self) -> Result<(), InvalidTransition> {
        self.advance(self.state == PipelineState::Saving, PipelineState::Done)
    }

    pub fn cancel(&mut self) -> Result<(), InvalidTransition> {
        self.advance(self.state == PipelineState::Selecting, PipelineState::Cancelled)
    }

    pub fn fail(&mut self) -> Result<(), InvalidTransition> {
        self.advance(!self.state.is_terminal(), PipelineState::Failed)
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interactive_happy_path() {
        let mut machine = StateMachine::new();
        machine.start_capturing().unwrap();
        machine.start_selecting().unwrap();
        machine.start_saving().unwrap();
        machine.finish().unwrap();
        assert_eq!(machine.state(), PipelineState::Done);
        assert!(machine.state().is_terminal());
    }

    #[test]
    fn test_non_interactive_skips_selecting() {
        let mut machine = StateMachine::new();
        machine.start_capturing().unwrap();
        assert!(machine.start_saving().is_ok());
        assert!(machine.finish().is_ok());
    }

    #[test]
    fn test_cancel_only_while_selecting() {
        let mut machine = StateMachine::new();
        assert!(machine.cancel().is_err());
        machine.start_capturing().unwrap();
        assert!(machine.cancel().is_err());
        machine.start_selecting().unwrap();
        assert!(machine.cancel().is_ok());
        assert_eq!(machine.state(), PipelineState::Cancelled);
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        let mut machine = StateMachine::new();
        machine.start_capturing().unwrap();
        machine.start_selecting().unwrap();
        machine.cancel().unwrap();

        assert!(machine.fail().is_err());
        assert!(machine.start_saving().is_err());
        assert_eq!(machine.state(), PipelineState::Cancelled);
    }

    #[test]
    fn test_fail_from_any_running_state() {
        let transitions: [fn(&mut StateMachine) -> Result<(), InvalidTransition>; 3] = [
            StateMachine::start_capturing,
            StateMachine::start_selecting,
            StateMachine::start_saving,
        ];
        for steps in 0..4 {
            let mut machine = StateMachine::new();
            for step in transitions.iter().take(steps) {
                step(&mut machine).unwrap();
            }
            assert!(machine.fail().is_ok());
            assert_eq!(machine.state(), PipelineState::Failed);
        }
    }

    #[test]
    fn test_refused_transition_names_both_states() {
        let mut machine = StateMachine::new();
        let err = machine.finish().unwrap_err();
        assert_eq!(
            err,
            InvalidTransition {
                from: PipelineState::Idle,
                to: PipelineState::Done,
            }
        );
        assert_eq!(err.to_string(), "Pipeline cannot move from Idle to Done");
        assert!(machine.start_selecting().is_err());
        assert_eq!(machine.state(), PipelineState::Idle);
    }

    #[test]
    fn test_finished_machine_cannot_start_again() {
        let mut machine = StateMachine::new();
        machine.start_capturing().unwrap();
        machine.start_saving().unwrap();
        machine.finish().unwrap();

        let err = anyhow::Error::new(machine.start_capturing().unwrap_err());
        assert!(err.downcast_ref::<InvalidTransition>().is_some());
        assert_eq!(machine.state(), PipelineState::Done);
    }
}
