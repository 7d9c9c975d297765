//! Fuzzy neighbour graph of the input points
use ndarray::{Array1, Array2, ArrayBase, ArrayView2, Data, Ix2};
use trafficseg::Float;
use trafficseg_nn::{distance::Distance, LinearSearch, NnError};

const SMOOTH_K_TOLERANCE: f64 = 1e-5;
const MIN_K_DIST_SCALE: f64 = 1e-3;
const BANDWIDTH_SEARCH_STEPS: usize = 64;

/// An edge of the neighbour graph as sampled by the optimiser
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Edge<F> {
    pub head: usize,
    pub tail: usize,
    /// Number of epochs between two samples of this edge
    pub epochs_per_sample: F,
}

/// Indices and distances of the `k` nearest neighbours of every row, closest first
pub(crate) fn nearest_neighbors<F: Float, D: Distance<F>, DA: Data<Elem = F>>(
    records: &ArrayBase<DA, Ix2>,
    k: usize,
    dist_fn: &D,
) -> Result<(Array2<usize>, Array2<F>), NnError> {
    let n = records.nrows();
    let index = LinearSearch::from_batch(records, dist_fn.clone())?;

    let mut indices = Array2::zeros((n, k));
    let mut dists = Array2::zeros((n, k));
    for (i, point) in records.rows().into_iter().enumerate() {
        for (slot, (j, dist)) in index.k_nearest(point, k)?.into_iter().enumerate() {
            indices[[i, slot]] = j;
            dists[[i, slot]] = dist;
        }
    }

    Ok((indices, dists))
}

/// Distance `rho` to the nearest distinct neighbour and bandwidth `sigma` of every point
///
/// `sigma` is searched such that the memberships `exp(-(d - rho) / sigma)` of the neighbours
/// after the first one sum to `log2(k)`. It never drops below a thousandth of the mean neighbour
/// distance.
pub(crate) fn smooth_knn_dist<F: Float>(knn_dists: ArrayView2<F>) -> (Array1<F>, Array1<F>) {
    let (n, k) = knn_dists.dim();
    let target = F::cast(k).log2();
    let tolerance = F::cast(SMOOTH_K_TOLERANCE);
    let min_scale = F::cast(MIN_K_DIST_SCALE);
    let two = F::cast(2.0);
    let mean_distances = knn_dists.mean().unwrap_or_else(F::zero);

    let mut rhos = Array1::zeros(n);
    let mut sigmas = Array1::zeros(n);
    for (i, dists) in knn_dists.rows().into_iter().enumerate() {
        let rho = dists
            .iter()
            .copied()
            .find(|dist| *dist > F::zero())
            .unwrap_or_else(F::zero);

        let (mut lo, mut hi, mut mid) = (F::zero(), F::infinity(), F::one());
        for _ in 0..BANDWIDTH_SEARCH_STEPS {
            let psum = dists
                .iter()
                .skip(1)
                .map(|&dist| {
                    let excess = dist - rho;
                    if excess > F::zero() {
                        (-excess / mid).exp()
                    } else {
                        F::one()
                    }
                })
                .sum::<F>();

            if (psum - target).abs() < tolerance {
                break;
            }
            if psum > target {
                hi = mid;
                mid = (lo + hi) / two;
            } else {
                lo = mid;
                mid = if hi.is_infinite() {
                    mid * two
                } else {
                    (lo + hi) / two
                };
            }
        }

        let floor = if rho > F::zero() {
            min_scale * dists.mean().unwrap_or_else(F::zero)
        } else {
            min_scale * mean_distances
        };
        rhos[i] = rho;
        sigmas[i] = mid.max(floor);
    }

    (rhos, sigmas)
}

/// Dense symmetric membership matrix of the neighbour graph
///
/// The directed membership of `j` in the neighbourhood of `i` is combined with the reverse one by
/// the probabilistic union `a + b - a * b`. Points are never members of their own neighbourhood.
pub(crate) fn fuzzy_simplicial_set<F: Float>(
    knn_indices: ArrayView2<usize>,
    knn_dists: ArrayView2<F>,
) -> Array2<F> {
    let n = knn_indices.nrows();
    let (rhos, sigmas) = smooth_knn_dist(knn_dists);

    let mut membership = Array2::zeros((n, n));
    for (i, (indices, dists)) in knn_indices
        .rows()
        .into_iter()
        .zip(knn_dists.rows())
        .enumerate()
    {
        for (&j, &dist) in indices.iter().zip(dists.iter()) {
            if i == j {
                continue;
            }
            let excess = dist - rhos[i];
            membership[[i, j]] = if excess <= F::zero() || sigmas[i].is_zero() {
                F::one()
            } else {
                (-excess / sigmas[i]).exp()
            };
        }
    }

    let transpose = membership.t();
    let product = &membership * &transpose;
    &membership + &transpose - product
}

/// Edges of the graph which are sampled at least once during `n_epochs`
///
/// The strongest edge is sampled every epoch, an edge of weight `w` every `max / w` epochs.
pub(crate) fn graph_edges<F: Float>(graph: &Array2<F>, n_epochs: usize) -> Vec<Edge<F>> {
    let max = graph.iter().fold(F::zero(), |max, &w| max.max(w));
    if max <= F::zero() {
        return Vec::new();
    }
    let threshold = max / F::cast(n_epochs);

    graph
        .indexed_iter()
        .filter(|(_, w)| **w > F::zero() && **w >= threshold)
        .map(|((head, tail), &w)| Edge {
            head,
            tail,
            epochs_per_sample: max / w,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Axis};
    use trafficseg_nn::distance::L2Dist;

    #[test]
    fn neighbours_include_the_point_itself() {
        let records: Array2<f64> = array![[0.0], [1.0], [3.0], [7.0]];
        let (indices, dists) = nearest_neighbors(&records, 3, &L2Dist).unwrap();

        assert_eq!(indices, array![[0, 1, 2], [1, 0, 2], [2, 1, 0], [3, 2, 1]]);
        assert_abs_diff_eq!(dists, array![[0., 1., 3.], [0., 1., 2.], [0., 2., 3.], [0., 4., 6.]]);
    }

    #[test]
    fn bandwidth_matches_the_target_sum() {
        let knn_dists: Array2<f64> = array![[0.0, 1.0, 2.0, 4.0], [0.0, 0.5, 0.5, 3.0]];
        let (rhos, sigmas) = smooth_knn_dist(knn_dists.view());

        assert_eq!(rhos, array![1.0, 0.5]);
        for ((dists, rho), sigma) in knn_dists.rows().into_iter().zip(rhos.iter()).zip(sigmas.iter())
        {
            let psum: f64 = dists
                .iter()
                .skip(1)
                .map(|d| (-(d - rho).max(0.0) / sigma).exp())
                .sum();
            assert_abs_diff_eq!(psum, 4.0f64.log2(), epsilon = 1e-4);
        }
    }

    #[test]
    fn identical_points_get_the_distance_floor() {
        let knn_dists: Array2<f64> = array![[0.0, 0.0, 0.0], [0.0, 0.0, 0.0]];
        let (rhos, sigmas) = smooth_knn_dist(knn_dists.view());

        assert_eq!(rhos, array![0.0, 0.0]);
        assert!(sigmas.iter().all(|s| *s >= 0.0 && s.is_finite()));
    }

    #[test]
    fn membership_is_a_symmetric_fuzzy_union() {
        let records: Array2<f64> = array![[0.0], [1.0], [3.0], [7.0], [8.0]];
        let (indices, dists) = nearest_neighbors(&records, 3, &L2Dist).unwrap();
        let graph = fuzzy_simplicial_set(indices.view(), dists.view());

        assert_abs_diff_eq!(graph, graph.t());
        assert!(graph.diag().iter().all(|w| *w == 0.0));
        assert!(graph.iter().all(|w| (0.0..=1.0).contains(w)));
        // the nearest distinct neighbour always has full membership
        assert_abs_diff_eq!(graph[[0, 1]], 1.0);
        assert_abs_diff_eq!(graph[[3, 4]], 1.0);
        // points 0 and 4 never meet in a neighbourhood
        assert_eq!(graph[[0, 4]], 0.0);
        assert!(graph.sum_axis(Axis(1)).iter().all(|w| *w > 0.0));
    }

    #[test]
    fn weak_edges_are_sampled_less_often() {
        let graph: Array2<f64> = array![[0.0, 1.0, 0.25], [1.0, 0.0, 0.001], [0.25, 0.001, 0.0]];
        let edges = graph_edges(&graph, 100);

        // the 0.001 edges fall below max / n_epochs
        assert_eq!(edges.len(), 4);
        assert_eq!(
            edges[0],
            Edge {
                head: 0,
                tail: 1,
                epochs_per_sample: 1.0
            }
        );
        assert_eq!(edges[1].tail, 2);
        assert_abs_diff_eq!(edges[1].epochs_per_sample, 4.0);

        assert!(graph_edges(&Array2::<f64>::zeros((3, 3)), 100).is_empty());
    }
}
