use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    #[error("Simulation cancelled")]
    Cancelled,

    #[error("Simulation deadline exceeded")]
    DeadlineExceeded,
}

pub type Result<T> = std::result::Result<T, EngineError>;
