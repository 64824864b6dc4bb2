use thiserror::Error;

/// Unrecoverable failures of a simulation run.
///
/// Any of these puts the engine into its failed state; no further turns are
/// simulated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("could not open or write the action log ({0})")]
    OutputSinkUnavailable(String),

    #[error("map dimensions must be greater than 0, got {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("map has {available} buildable cells but {required} starting cities are needed")]
    InsufficientStartingLand { available: usize, required: usize },
}

impl From<std::io::Error> for SimError {
    fn from(value: std::io::Error) -> Self {
        SimError::OutputSinkUnavailable(value.to_string())
    }
}

pub type SimResult<T> = Result<T, SimError>;
