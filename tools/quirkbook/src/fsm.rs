use crate::errors::RunnerError;
use crate::types::{RunState, ThrownError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFsm {
    pub state: RunState,
    pub error: Option<ThrownError>,
}

impl Default for RunFsm {
    fn default() -> Self {
        Self {
            state: RunState::Idle,
            error: None,
        }
    }
}

impl RunFsm {
    pub fn transition(&mut self, next: RunState) -> Result<(), RunnerError> {
        validate_transition(self.state, next)?;
        self.state = next;
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), RunnerError> {
        self.transition(RunState::Running)
    }

    pub fn complete(&mut self) -> Result<(), RunnerError> {
        self.transition(RunState::Completed)
    }

    pub fn throw(&mut self, error: ThrownError) -> Result<(), RunnerError> {
        self.transition(RunState::Threw)?;
        self.error = Some(error);
        Ok(())
    }

    pub fn time_out(&mut self) -> Result<(), RunnerError> {
        self.transition(RunState::TimedOut)
    }
}

pub fn validate_transition(from: RunState, to: RunState) -> Result<(), RunnerError> {
    use RunState as S;

    let allowed = match from {
        S::Idle => matches!(to, S::Running),
        S::Running => matches!(to, S::Completed | S::Threw | S::TimedOut),
        S::Completed | S::Threw | S::TimedOut => false,
    };

    if !allowed {
        return Err(RunnerError::Fault(format!(
            "illegal transition: {:?} -> {:?}",
            from, to
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;

    #[test]
    fn runs_move_from_idle_through_running_to_a_terminal_state() {
        for finish in [RunState::Completed, RunState::Threw, RunState::TimedOut] {
            let mut fsm = RunFsm::default();
            fsm.start().expect("start");
            fsm.transition(finish).expect("finish");
            assert!(fsm.state.is_terminal());
        }
    }

    #[test]
    fn transition_validator_rejects_invalid_edges() {
        let err = validate_transition(RunState::Idle, RunState::Completed).expect_err("must reject");
        assert!(matches!(err, RunnerError::Fault(message) if message.contains("illegal transition")));

        for terminal in [RunState::Completed, RunState::Threw, RunState::TimedOut] {
            assert!(validate_transition(terminal, RunState::Running).is_err());
            assert!(validate_transition(terminal, RunState::Completed).is_err());
        }
    }

    #[test]
    fn throw_records_the_error() {
        let mut fsm = RunFsm::default();
        fsm.start().expect("start");
        fsm.throw(ThrownError {
            kind: ErrorKind::TypeError,
            message: "x is not a function".to_string(),
        })
        .expect("throw");
        assert_eq!(fsm.state, RunState::Threw);
        assert_eq!(
            fsm.error.as_ref().map(|e| e.kind),
            Some(ErrorKind::TypeError)
        );
    }
}
