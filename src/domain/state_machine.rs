use crate::domain::models::AppError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Starting,
    Running,
    Stopping,
}

impl SessionPhase {
    /// The encoder is capturing: confirmed started and not yet reset.
    pub fn is_recording(self) -> bool {
        matches!(self, SessionPhase::Running | SessionPhase::Stopping)
    }
}

#[derive(Debug, Clone)]
pub struct SessionMachine {
    phase: SessionPhase,
}

impl SessionMachine {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn begin_start(&mut self) -> Result<(), AppError> {
        if self.phase != SessionPhase::Idle {
            return Err(AppError::new(
                "RECORDING_ALREADY_ACTIVE",
                "Recording is already in progress",
                Some("stop the current recording first".to_string()),
            ));
        }
        self.phase = SessionPhase::Starting;
        Ok(())
    }

    pub fn confirm_started(&mut self) -> Result<(), AppError> {
        if self.phase != SessionPhase::Starting {
            return Err(AppError::new(
                "INVALID_RECORDING_STATE",
                "only a starting session can be confirmed",
                None,
            ));
        }
        self.phase = SessionPhase::Running;
        Ok(())
    }

    pub fn begin_stop(&mut self) -> Result<(), AppError> {
        if self.phase != SessionPhase::Running {
            return Err(AppError::new(
                "NO_ACTIVE_RECORDING",
                "No recording in progress",
                None,
            ));
        }
        self.phase = SessionPhase::Stopping;
        Ok(())
    }

    /// Every exit path lands here; valid from any phase.
    pub fn reset(&mut self) {
        self.phase = SessionPhase::Idle;
    }
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{SessionMachine, SessionPhase};

    #[test]
    fn session_machine_rejects_stop_when_idle() {
        let mut machine = SessionMachine::new();
        let result = machine.begin_stop();
        assert_eq!(result.unwrap_err().code, "NO_ACTIVE_RECORDING");
        assert_eq!(machine.phase(), SessionPhase::Idle);
    }

    #[test]
    fn session_machine_rejects_second_start() {
        let mut machine = SessionMachine::new();
        machine.begin_start().unwrap();
        assert_eq!(
            machine.begin_start().unwrap_err().code,
            "RECORDING_ALREADY_ACTIVE"
        );
        machine.confirm_started().unwrap();
        assert!(machine.begin_start().is_err());
    }

    #[test]
    fn session_machine_full_flow() {
        let mut machine = SessionMachine::new();
        machine.begin_start().unwrap();
        machine.confirm_started().unwrap();
        assert!(machine.phase().is_recording());
        machine.begin_stop().unwrap();
        assert!(machine.phase().is_recording());
        machine.reset();
        assert_eq!(machine.phase(), SessionPhase::Idle);
    }

    #[test]
    fn failed_start_resets_to_idle() {
        let mut machine = SessionMachine::new();
        machine.begin_start().unwrap();
        machine.reset();
        assert!(machine.confirm_started().is_err());
        assert_eq!(machine.phase(), SessionPhase::Idle);
    }
}
