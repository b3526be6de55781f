use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum HomeError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("precondition failed: {0}")]
    Precondition(String),
    #[error("{cause}")]
    ActionFailed { cause: String },
    #[error("max retries exceeded ({retries} attempts)")]
    ExhaustedRetries { retries: u32 },
    #[error("homing failed: {0}")]
    Homing(String),
    #[error("position read failed: {0}")]
    Sensor(String),
    #[error("timeout waiting for endstop: {0}")]
    Timeout(String),
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing machine")]
    MissingMachine,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
