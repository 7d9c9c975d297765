use ndarray_rand::rand::Rng;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use trafficseg::{Float, ParamGuard};
use trafficseg_nn::distance::Distance;

use super::init::KMeansInit;
use crate::KMeansParamsError;

/// Checked K-Means settings
///
/// A run starts from `init` centroids and alternates assignment and update steps. It stops once
/// the summed shift of the centroids during one step drops below `tolerance`, or after
/// `max_n_iterations` steps. Out of `n_runs` runs the one with the lowest inertia is kept.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct KMeansValidParams<F: Float, R: Rng, D: Distance<F>> {
    n_clusters: usize,
    n_runs: usize,
    tolerance: F,
    max_n_iterations: u64,
    init: KMeansInit,
    rng: R,
    dist_fn: D,
}

/// Unchecked K-Means settings
///
/// Defaults: 10 runs, tolerance `1e-4`, 300 iterations, k-means++ seeding.
#[derive(Clone, Debug, PartialEq)]
pub struct KMeansParams<F: Float, R: Rng, D: Distance<F>>(KMeansValidParams<F, R, D>);

impl<F: Float, R: Rng, D: Distance<F>> KMeansParams<F, R, D> {
    pub fn new(n_clusters: usize, rng: R, dist_fn: D) -> Self {
        KMeansParams(KMeansValidParams {
            n_clusters,
            n_runs: 10,
            tolerance: F::cast(1e-4),
            max_n_iterations: 300,
            init: KMeansInit::KMeansPlusPlus,
            rng,
            dist_fn,
        })
    }

    /// Number of independently seeded runs, must be positive
    pub fn n_runs(mut self, n_runs: usize) -> Self {
        self.0.n_runs = n_runs;
        self
    }

    /// Centroid shift below which a run has converged, must be positive
    pub fn tolerance(mut self, tolerance: F) -> Self {
        self.0.tolerance = tolerance;
        self
    }

    /// Step limit of a single run, must be positive
    pub fn max_n_iterations(mut self, max_n_iterations: u64) -> Self {
        self.0.max_n_iterations = max_n_iterations;
        self
    }

    pub fn init_method(mut self, init: KMeansInit) -> Self {
        self.0.init = init;
        self
    }
}

impl<F: Float, R: Rng, D: Distance<F>> ParamGuard for KMeansParams<F, R, D> {
    type Checked = KMeansValidParams<F, R, D>;
    type Error = KMeansParamsError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        let params = &self.0;
        if params.n_clusters == 0 {
            return Err(KMeansParamsError::NClusters);
        }
        if params.n_runs == 0 {
            return Err(KMeansParamsError::NRuns);
        }
        if params.tolerance.is_nan() || params.tolerance <= F::zero() {
            return Err(KMeansParamsError::Tolerance);
        }
        if params.max_n_iterations == 0 {
            return Err(KMeansParamsError::MaxIterations);
        }

        Ok(params)
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl<F: Float, R: Rng, D: Distance<F>> KMeansValidParams<F, R, D> {
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    pub fn n_runs(&self) -> usize {
        self.n_runs
    }

    pub fn tolerance(&self) -> F {
        self.tolerance
    }

    pub fn max_n_iterations(&self) -> u64 {
        self.max_n_iterations
    }

    pub fn init_method(&self) -> KMeansInit {
        self.init
    }

    /// Generator cloned at the start of every fit
    pub fn rng(&self) -> &R {
        &self.rng
    }

    pub fn dist_fn(&self) -> &D {
        &self.dist_fn
    }
}
