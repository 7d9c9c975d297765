use ndarray_rand::rand::{Rng, SeedableRng};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use trafficseg::{param_guard::TransformGuard, Float, ParamGuard};
use trafficseg_nn::distance::Distance;

use crate::UmapError;

/// A verified hyper-parameter set ready for projection
///
/// See [`Umap`](crate::Umap) for the meaning of the parameters.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct UmapValidParams<F, R, D> {
    n_neighbors: usize,
    min_dist: F,
    spread: F,
    n_epochs: usize,
    learning_rate: F,
    negative_sample_rate: usize,
    repulsion_strength: F,
    dist_fn: D,
    rng: R,
}

impl<F: Float, R, D> UmapValidParams<F, R, D> {
    /// Size of the local neighbourhood, the point itself included
    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    /// Smallest distance between two points of the projection
    pub fn min_dist(&self) -> F {
        self.min_dist
    }

    /// Scale of the projected neighbourhoods
    pub fn spread(&self) -> F {
        self.spread
    }

    pub fn n_epochs(&self) -> usize {
        self.n_epochs
    }

    pub fn learning_rate(&self) -> F {
        self.learning_rate
    }

    /// Number of repulsive samples drawn per attractive sample
    pub fn negative_sample_rate(&self) -> usize {
        self.negative_sample_rate
    }

    pub fn repulsion_strength(&self) -> F {
        self.repulsion_strength
    }

    pub fn dist_fn(&self) -> &D {
        &self.dist_fn
    }

    pub fn rng(&self) -> &R {
        &self.rng
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UmapParams<F, R, D>(UmapValidParams<F, R, D>);

impl<F: Float, R: Rng + Clone, D: Distance<F>> UmapParams<F, R, D> {
    /// Create a parameter set with the given random number generator and metric
    ///
    /// # Defaults to:
    ///  * `n_neighbors`: 15
    ///  * `min_dist`: 0.1
    ///  * `spread`: 1.0
    ///  * `n_epochs`: 500
    ///  * `learning_rate`: 1.0
    ///  * `negative_sample_rate`: 5
    ///  * `repulsion_strength`: 1.0
    pub fn new(rng: R, dist_fn: D) -> Self {
        Self(UmapValidParams {
            n_neighbors: 15,
            min_dist: F::cast(0.1),
            spread: F::one(),
            n_epochs: 500,
            learning_rate: F::one(),
            negative_sample_rate: 5,
            repulsion_strength: F::one(),
            dist_fn,
            rng,
        })
    }

    /// Set the size of the local neighbourhood
    ///
    /// Small values focus on local structure, large values give a more global picture.
    pub fn n_neighbors(mut self, n_neighbors: usize) -> Self {
        self.0.n_neighbors = n_neighbors;
        self
    }

    /// Set how tightly points may be packed in the projection
    pub fn min_dist(mut self, min_dist: F) -> Self {
        self.0.min_dist = min_dist;
        self
    }

    /// Set the scale of the projected neighbourhoods
    pub fn spread(mut self, spread: F) -> Self {
        self.0.spread = spread;
        self
    }

    /// Set the number of optimisation epochs
    pub fn n_epochs(mut self, n_epochs: usize) -> Self {
        self.0.n_epochs = n_epochs;
        self
    }

    /// Set the initial step size of the gradient descent
    pub fn learning_rate(mut self, learning_rate: F) -> Self {
        self.0.learning_rate = learning_rate;
        self
    }

    pub fn negative_sample_rate(mut self, negative_sample_rate: usize) -> Self {
        self.0.negative_sample_rate = negative_sample_rate;
        self
    }

    /// Set the weight of repulsive samples relative to attractive ones
    pub fn repulsion_strength(mut self, repulsion_strength: F) -> Self {
        self.0.repulsion_strength = repulsion_strength;
        self
    }

    pub fn dist_fn(mut self, dist_fn: D) -> Self {
        self.0.dist_fn = dist_fn;
        self
    }

    pub fn with_rng(mut self, rng: R) -> Self {
        self.0.rng = rng;
        self
    }
}

impl<F: Float, R: Rng + SeedableRng + Clone, D: Distance<F>> UmapParams<F, R, D> {
    /// Reseed the random number generator
    pub fn seed(mut self, seed: u64) -> Self {
        self.0.rng = R::seed_from_u64(seed);
        self
    }
}

impl<F: Float, R, D> ParamGuard for UmapParams<F, R, D> {
    type Checked = UmapValidParams<F, R, D>;
    type Error = UmapError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        let params = &self.0;
        if params.n_neighbors < 2 {
            Err(UmapError::NNeighbors)
        } else if !params.spread.is_finite() || params.spread <= F::zero() {
            Err(UmapError::Spread)
        } else if params.min_dist.is_nan()
            || params.min_dist < F::zero()
            || params.min_dist > params.spread
        {
            Err(UmapError::MinDist)
        } else if params.n_epochs == 0 {
            Err(UmapError::NEpochs)
        } else if !params.learning_rate.is_finite() || params.learning_rate <= F::zero() {
            Err(UmapError::LearningRate)
        } else if params.repulsion_strength.is_nan() || params.repulsion_strength < F::zero() {
            Err(UmapError::RepulsionStrength)
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl<F: Float, R, D> TransformGuard for UmapParams<F, R, D> {}
