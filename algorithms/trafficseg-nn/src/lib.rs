//! `trafficseg-nn` provides the distance functions shared by the clustering and projection crates
//! together with an exhaustive nearest neighbour search.
//!
//! Traffic count vectors are compared by direction rather than magnitude, therefore
//! [`CosineDist`](distance::CosineDist) is the default metric of the density based clustering and
//! of the embedding. It is not a metric in the strict sense, so the search structure here is a
//! plain linear scan instead of a space partitioning tree.
use ndarray::ArrayView1;
use thiserror::Error;

pub mod distance;
mod heap_elem;
mod linear;

pub use linear::{pairwise_distances, LinearSearch};

pub(crate) type Point<'a, F> = ArrayView1<'a, F>;

/// Error returned when building or querying a nearest neighbour index
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NnError {
    /// The points of the index have no features
    #[error("points have dimension of 0")]
    ZeroDimension,
    /// The query point has a different dimension than the indexed points
    #[error("query point has dimension {found}, indexed points have {expected}")]
    DimensionMismatch { expected: usize, found: usize },
}

impl From<NnError> for trafficseg::Error {
    fn from(err: NnError) -> Self {
        match err {
            NnError::DimensionMismatch { expected, found } => {
                trafficseg::Error::ShapeMismatch { expected, found }
            }
            err => trafficseg::Error::Algorithm(err.to_string()),
        }
    }
}
