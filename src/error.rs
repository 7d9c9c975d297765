//! Error types in trafficseg
//!

use thiserror::Error;

use ndarray::ShapeError;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Two count vectors of different width met in the same dataset
    #[error("vector width mismatch: expected {expected} values, found {found}")]
    ShapeMismatch { expected: usize, found: usize },
    /// An algorithm received fewer points than it needs
    #[error("insufficient data: at least {required} points needed, got {actual}")]
    InsufficientData { required: usize, actual: usize },
    #[error("invalid parameter {0}")]
    Parameters(String),
    #[error("invalid ndarray shape {0}")]
    NdShape(#[from] ShapeError),
    #[error("algorithm failed: {0}")]
    Algorithm(String),
}
