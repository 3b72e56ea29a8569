use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShapeError>;

/// Reasons an input cannot be pushed through one of the networks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("input shape {dims:?} has a zero-sized axis")]
    EmptyAxis { dims: [usize; 4] },

    #[error("expected {expected} input channels, found {found}")]
    Channels { expected: usize, found: usize },

    /// A stage would produce an empty spatial axis.
    #[error("spatial size {size} is too small for {stage}")]
    TooSmall { stage: String, size: usize },

    #[error("shape {dims:?} is too large to represent")]
    Overflow { dims: [usize; 4] },

    #[error("buffer holds {found} values but the requested shape needs {expected}")]
    BufferLength { expected: usize, found: usize },

    #[error("unable to read tensor data: {0}")]
    Data(String),
}
