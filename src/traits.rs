//! Provide traits for different classes of algorithms
//!

use ndarray::{Array1, Array2, ArrayView2};

use crate::error::Result;
use crate::Float;

/// Transformation algorithms
///
/// A transformer takes a dataset and transforms it into a different one. It has no concept of
/// state and provides therefore no method to predict new data. A typical example are
/// resampling of a time series or an embedding projection.
pub trait Transformer<R, T> {
    fn transform(&self, x: R) -> T;
}

/// Fittable algorithms
///
/// A fittable algorithm takes a set of records and creates a concept of some kind about it. This
/// is in general expensive. The fitted model can then be used to predict new records.
pub trait Fit<R, E: std::error::Error + From<crate::error::Error>> {
    type Object;

    fn fit(&self, records: &R) -> std::result::Result<Self::Object, E>;
}

/// Predict with model
pub trait Predict<R, T> {
    fn predict(&self, x: R) -> T;
}

/// Assigns a cluster label to every row of a feature matrix
///
/// This is the seam between the pipeline and the clustering algorithms. Implementations are
/// stateless across calls: labels produced by one call carry no meaning for another call.
/// `None` marks a point as noise.
pub trait Clusterer<F: Float> {
    fn fit_predict(&self, records: ArrayView2<F>) -> Result<Array1<Option<usize>>>;
}

/// Projects every row of a matrix into a low dimensional plane
///
/// The returned matrix has one row per input row, in input order.
pub trait Projector<F: Float> {
    fn project(&self, records: ArrayView2<F>) -> Result<Array2<F>>;
}
