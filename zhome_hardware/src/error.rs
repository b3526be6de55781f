use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("endstop did not trigger within {0} ms")]
    EndstopTimeout(u64),
    #[error("axis '{0}' is not homed")]
    NotHomed(char),
    #[error("unknown axis '{0}'")]
    UnknownAxis(char),
    #[error("unknown actuator: {0}")]
    UnknownActuator(String),
    #[error("script error: {0}")]
    Script(String),
    #[error("recording exhausted after {0} samples")]
    RecordingExhausted(usize),
}

pub type Result<T> = std::result::Result<T, HwError>;
