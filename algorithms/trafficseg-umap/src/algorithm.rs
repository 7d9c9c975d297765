use ndarray::{Array2, ArrayBase, ArrayView2, Data, Ix2};
use ndarray_rand::rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use trafficseg::traits::{Projector, Transformer};
use trafficseg::Float;
use trafficseg_nn::distance::{CosineDist, Distance};

use crate::graph::{fuzzy_simplicial_set, graph_edges, nearest_neighbors};
use crate::layout::{find_ab_params, random_layout, Optimizer};
use crate::{UmapError, UmapParams, UmapValidParams};

/// Uniform Manifold Approximation and Projection into the plane
///
/// UMAP looks at every point together with its `n_neighbors` nearest neighbours (the point
/// itself included) and turns the distances into fuzzy memberships: the nearest distinct
/// neighbour is a full member, farther ones fade out with a per point bandwidth. The directed
/// memberships are merged by a probabilistic union into a symmetric graph.
///
/// A layout in the plane is then optimised such that neighbours in the graph end up close to
/// each other. Points start at uniformly random positions, rescaled to `[0, 10]` on both axes.
/// Every epoch samples the graph edges in proportion to their weight and moves the endpoints
/// together along the gradient of the low dimensional membership `1 / (1 + a * d^(2b))`, while
/// randomly drawn points are pushed away. The curve parameters `a` and `b` are fitted to
/// `min_dist` and `spread`.
///
/// The orientation of the result is arbitrary, only relative positions carry meaning. The same
/// random number generator state always yields the same projection.
///
/// ## Example
///
/// ```rust
/// use ndarray::Array2;
/// use trafficseg::prelude::*;
/// use trafficseg_umap::Umap;
///
/// let records = Array2::from_shape_fn((10, 3), |(i, j)| ((i + 1) * (j + 2) % 7) as f64 + 1.0);
///
/// let projector = Umap::params::<f64>().n_neighbors(4).check_unwrap();
/// let projection = projector.project(records.view()).unwrap();
///
/// assert_eq!(projection.dim(), (10, 2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Umap;

impl Umap {
    /// Parameters with cosine distance and a generator seeded with 42
    pub fn params<F: Float>() -> UmapParams<F, Xoshiro256Plus, CosineDist> {
        UmapParams::new(Xoshiro256Plus::seed_from_u64(42), CosineDist)
    }

    /// Parameters with a custom random number generator and metric
    pub fn params_with<F: Float, R: Rng + Clone, D: Distance<F>>(
        rng: R,
        dist_fn: D,
    ) -> UmapParams<F, R, D> {
        UmapParams::new(rng, dist_fn)
    }
}

impl<F: Float, R: Rng + Clone, D: Distance<F>, DA: Data<Elem = F>>
    Transformer<&ArrayBase<DA, Ix2>, Result<Array2<F>, UmapError>> for UmapValidParams<F, R, D>
{
    /// Project every row of `records` into the plane
    ///
    /// Fails with `InsufficientData` if there are not more rows than `n_neighbors`.
    fn transform(&self, records: &ArrayBase<DA, Ix2>) -> Result<Array2<F>, UmapError> {
        let n = records.nrows();
        let required = self.n_neighbors() + 1;
        if n < required {
            return Err(trafficseg::Error::InsufficientData {
                required,
                actual: n,
            }
            .into());
        }

        let (knn_indices, knn_dists) =
            nearest_neighbors(records, self.n_neighbors(), self.dist_fn())?;
        let graph = fuzzy_simplicial_set(knn_indices.view(), knn_dists.view());
        let edges = graph_edges(&graph, self.n_epochs());

        let (a, b) = find_ab_params(self.spread(), self.min_dist());
        let optimizer = Optimizer {
            a,
            b,
            repulsion_strength: self.repulsion_strength(),
            learning_rate: self.learning_rate(),
            negative_sample_rate: self.negative_sample_rate(),
            n_epochs: self.n_epochs(),
        };

        let mut rng = self.rng().clone();
        let mut embedding = random_layout(n, &mut rng);
        optimizer.optimize(&mut embedding, &edges, &mut rng);

        log::debug!(
            "projected {} points over {} graph edges (a = {:.4}, b = {:.4})",
            n,
            edges.len(),
            a,
            b
        );

        Ok(embedding)
    }
}

impl<F: Float, R: Rng + Clone, D: Distance<F>> Projector<F> for UmapValidParams<F, R, D> {
    fn project(&self, records: ArrayView2<F>) -> trafficseg::Result<Array2<F>> {
        Ok(self.transform(&records)?)
    }
}
