use ndarray::Zip;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use trafficseg::Float;

use crate::Point;

/// A distance function between two points of equal dimension
///
/// Implementations may assume that both points have the same length, mixing dimensions is a
/// logic error and the result is unspecified.
pub trait Distance<F: Float>: Clone + Send + Sync + Unpin {
    fn distance(&self, a: Point<F>, b: Point<F>) -> F;

    // Fast distance metric that keeps the order of the distance function
    fn rdistance(&self, a: Point<F>, b: Point<F>) -> F {
        self.distance(a, b)
    }

    fn rdist_to_dist(&self, rdist: F) -> F {
        rdist
    }

    fn dist_to_rdist(&self, dist: F) -> F {
        dist
    }
}

/// Manhattan distance
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct L1Dist;
impl<F: Float> Distance<F> for L1Dist {
    fn distance(&self, a: Point<F>, b: Point<F>) -> F {
        Zip::from(&a)
            .and(&b)
            .fold(F::zero(), |acc, &a, &b| acc + (a - b).abs())
    }
}

/// Euclidean distance, the reduced distance is its square
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct L2Dist;
impl<F: Float> Distance<F> for L2Dist {
    fn distance(&self, a: Point<F>, b: Point<F>) -> F {
        self.rdistance(a, b).sqrt()
    }

    fn rdistance(&self, a: Point<F>, b: Point<F>) -> F {
        Zip::from(&a)
            .and(&b)
            .fold(F::zero(), |acc, &a, &b| acc + (a - b) * (a - b))
    }

    fn rdist_to_dist(&self, rdist: F) -> F {
        rdist.sqrt()
    }

    fn dist_to_rdist(&self, dist: F) -> F {
        dist.powi(2)
    }
}

/// Cosine distance `1 - cos(a, b)`, ranging from 0 to 2
///
/// Only the direction of a count vector matters, so an hour of heavy traffic and an hour of light
/// traffic with the same lane split are close. The zero vector has no direction: two zero vectors
/// are at distance 0, a zero vector and any other vector at distance 1.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CosineDist;
impl<F: Float> Distance<F> for CosineDist {
    fn distance(&self, a: Point<F>, b: Point<F>) -> F {
        let norm_a = a.dot(&a).sqrt();
        let norm_b = b.dot(&b).sqrt();

        match (norm_a.is_zero(), norm_b.is_zero()) {
            (true, true) => F::zero(),
            (true, false) | (false, true) => F::one(),
            (false, false) => {
                let similarity = a.dot(&b) / (norm_a * norm_b);
                // rounding can push the similarity slightly out of [-1, 1]
                let similarity = similarity.max(-F::one()).min(F::one());
                F::one() - similarity
            }
        }
    }
}
