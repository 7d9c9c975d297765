use ndarray::{Array1, Array2, ArrayBase, ArrayView2, Axis, Data, DataMut, Ix1, Ix2, Zip};
use ndarray_rand::rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use trafficseg::traits::{Clusterer, Fit, Predict};
use trafficseg::Float;
use trafficseg_nn::distance::{Distance, L2Dist};

use crate::k_means::{KMeansError, KMeansParams, KMeansValidParams};

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
/// K-means clustering aims to partition a set of unlabeled observations into clusters,
/// where each observation belongs to the cluster with the nearest mean.
///
/// The mean of the points within a cluster is called *centroid*.
///
/// Given the set of centroids, you can assign an observation to a cluster
/// choosing the nearest centroid.
///
/// We provide a modified version of the _standard algorithm_ (also known as Lloyd's Algorithm),
/// called m_k-means, which uses a slightly modified update step to avoid problems with empty
/// clusters.
///
/// ## Standard algorithm
///
/// K-means is an iterative algorithm: it progressively refines the choice of centroids.
///
/// It's guaranteed to converge, even though it might not find the optimal set of centroids
/// (unfortunately it can get stuck in a local minimum, finding the optimal minimum if NP-hard!).
///
/// There are three steps in the standard algorithm:
/// - initialisation step: select initial centroids using one of our provided algorithms.
/// - assignment step: assign each observation to the nearest cluster
///                    (minimum distance between the observation and the cluster's centroid);
/// - update step: recompute the centroid of each cluster.
///
/// The initialisation step is a one-off, done at the very beginning.
/// Assignment and update are repeated in a loop until convergence is reached (either the
/// distance between the old and the new centroids is below `tolerance` or
/// we exceed the `max_n_iterations`). Running out of iterations is not an error: the best
/// centroids found so far are kept and a warning is logged.
///
/// ## Tutorial
///
/// ```
/// use trafficseg::prelude::*;
/// use trafficseg_clustering::KMeans;
/// use ndarray::{Axis, array};
/// use ndarray_rand::rand::SeedableRng;
/// use rand_xoshiro::Xoshiro256Plus;
/// use approx::assert_abs_diff_eq;
///
/// let rng = Xoshiro256Plus::seed_from_u64(42);
/// let observations = array![
///     [0., 1.], [0.2, 0.9], [-0.1, 1.1],
///     [-10., 20.], [-10.2, 19.9], [-9.8, 20.1],
/// ];
///
/// // `n_clusters` is the only mandatory parameter, the others fall back to their defaults
/// let model = KMeans::params_with_rng(2, rng)
///     .tolerance(1e-2)
///     .fit(&observations)
///     .expect("KMeans fitted");
///
/// // Predict returns the **index** of the nearest cluster
/// let cluster: usize = model.predict(&array![-9., 20.5]);
/// let closest_centroid = model.centroids().index_axis(Axis(0), cluster);
/// assert_abs_diff_eq!(closest_centroid.to_owned(), array![-10., 20.], epsilon = 1e-1);
/// ```
pub struct KMeans<F: Float, D: Distance<F>> {
    centroids: Array2<F>,
    cluster_count: Array1<F>,
    inertia: F,
    dist_fn: D,
}

impl<F: Float> KMeans<F, L2Dist> {
    /// Parameters with euclidean distance and a random generator seeded with `42`
    pub fn params(nclusters: usize) -> KMeansParams<F, Xoshiro256Plus, L2Dist> {
        KMeansParams::new(nclusters, Xoshiro256Plus::seed_from_u64(42), L2Dist)
    }

    pub fn params_with_rng<R: Rng>(nclusters: usize, rng: R) -> KMeansParams<F, R, L2Dist> {
        KMeansParams::new(nclusters, rng, L2Dist)
    }
}

impl<F: Float, D: Distance<F>> KMeans<F, D> {
    pub fn params_with<R: Rng>(nclusters: usize, rng: R, dist_fn: D) -> KMeansParams<F, R, D> {
        KMeansParams::new(nclusters, rng, dist_fn)
    }

    /// Return the set of centroids as a 2-dimensional matrix with shape
    /// `(n_centroids, n_features)`.
    pub fn centroids(&self) -> &Array2<F> {
        &self.centroids
    }

    /// Return the number of training points belonging to each cluster
    pub fn cluster_count(&self) -> &Array1<F> {
        &self.cluster_count
    }

    /// Return the sum of distances between each training point and its closest centroid, averaged
    /// across all training points.
    pub fn inertia(&self) -> F {
        self.inertia
    }
}

impl<F: Float, R: Rng + Clone, DA: Data<Elem = F>, D: Distance<F>>
    Fit<ArrayBase<DA, Ix2>, KMeansError> for KMeansValidParams<F, R, D>
{
    type Object = KMeans<F, D>;

    /// Given an input matrix `observations`, with shape `(n_observations, n_features)`,
    /// `fit` identifies `n_clusters` centroids based on the training data distribution.
    ///
    /// Fails with `InsufficientData` if there are fewer observations than clusters.
    fn fit(&self, observations: &ArrayBase<DA, Ix2>) -> Result<Self::Object, KMeansError> {
        let n_samples = observations.nrows();
        if n_samples < self.n_clusters() {
            return Err(trafficseg::Error::InsufficientData {
                required: self.n_clusters(),
                actual: n_samples,
            }
            .into());
        }

        let mut rng = self.rng().clone();
        let observations = observations.view();

        let mut min_inertia = F::infinity();
        let mut best_centroids = None;
        let mut best_iter = None;
        let mut memberships = Array1::zeros(n_samples);
        let mut dists = Array1::zeros(n_samples);

        for _ in 0..self.n_runs() {
            let mut inertia = min_inertia;
            let mut centroids =
                self.init_method()
                    .run(self.dist_fn(), self.n_clusters(), observations, &mut rng);
            let mut converged_iter: Option<u64> = None;
            for n_iter in 0..self.max_n_iterations() {
                update_memberships_and_dists(
                    self.dist_fn(),
                    &centroids,
                    &observations,
                    &mut memberships,
                    &mut dists,
                );
                let new_centroids = compute_centroids(&centroids, &observations, &memberships);
                inertia = dists.sum();
                let distance = centroid_shift(self.dist_fn(), &centroids, &new_centroids);
                centroids = new_centroids;
                if distance < self.tolerance() {
                    converged_iter = Some(n_iter);
                    break;
                }
            }

            // We keep the centroids which minimize the inertia (defined as the sum of
            // the distances of the closest centroid for all observations)
            // over the n runs of the KMeans algorithm.
            if inertia < min_inertia {
                min_inertia = inertia;
                best_centroids = Some(centroids.clone());
                best_iter = converged_iter;
            }
        }

        let centroids = best_centroids.ok_or(KMeansError::NonFiniteInertia)?;
        match best_iter {
            Some(n_iter) => log::debug!("k-means converged after {} iterations", n_iter + 1),
            None => log::warn!(
                "k-means did not converge within {} iterations, keeping the best centroids",
                self.max_n_iterations()
            ),
        }

        update_memberships_and_dists(
            self.dist_fn(),
            &centroids,
            &observations,
            &mut memberships,
            &mut dists,
        );
        let mut cluster_count = Array1::zeros(self.n_clusters());
        memberships
            .iter()
            .for_each(|&c| cluster_count[c] += F::one());

        Ok(KMeans {
            centroids,
            cluster_count,
            inertia: dists.sum() / F::cast(n_samples),
            dist_fn: self.dist_fn().clone(),
        })
    }
}

impl<F: Float, R: Rng + Clone, D: Distance<F>> Clusterer<F> for KMeansValidParams<F, R, D> {
    /// Fits a fresh model and assigns every row to its closest centroid, no row is noise
    fn fit_predict(&self, records: ArrayView2<F>) -> trafficseg::Result<Array1<Option<usize>>> {
        let model = Fit::<_, KMeansError>::fit(self, &records)?;
        let memberships: Array1<usize> = model.predict(&records);

        Ok(memberships.mapv(Some))
    }
}

impl<F: Float, DA: Data<Elem = F>, D: Distance<F>> Predict<&ArrayBase<DA, Ix2>, Array1<usize>>
    for KMeans<F, D>
{
    /// Given an input matrix `observations`, with shape `(n_observations, n_features)`,
    /// `predict` returns, for each observation, the index of the closest cluster/centroid.
    ///
    /// You can retrieve the centroid associated to an index using the
    /// [`centroids` method](#method.centroids).
    fn predict(&self, observations: &ArrayBase<DA, Ix2>) -> Array1<usize> {
        let mut memberships = Array1::zeros(observations.nrows());
        update_cluster_memberships(
            &self.dist_fn,
            &self.centroids,
            &observations.view(),
            &mut memberships,
        );
        memberships
    }
}

impl<F: Float, DA: Data<Elem = F>, D: Distance<F>> Predict<&ArrayBase<DA, Ix1>, usize>
    for KMeans<F, D>
{
    /// Given one input observation, return the index of its closest cluster
    fn predict(&self, observation: &ArrayBase<DA, Ix1>) -> usize {
        closest_centroid(&self.dist_fn, &self.centroids, observation).0
    }
}

/// K-means is an iterative algorithm.
/// We will perform the assignment and update steps until we are satisfied
/// (according to our convergence criteria).
///
/// `compute_centroids` returns a 2-dimensional array,
/// where the i-th row corresponds to the i-th cluster.
fn compute_centroids<F: Float>(
    old_centroids: &Array2<F>,
    // (n_observations, n_features)
    observations: &ArrayBase<impl Data<Elem = F>, Ix2>,
    // (n_observations,)
    cluster_memberships: &ArrayBase<impl Data<Elem = usize>, Ix1>,
) -> Array2<F> {
    let n_clusters = old_centroids.nrows();
    let mut counts: Array1<usize> = Array1::ones(n_clusters);
    let mut centroids = Array2::zeros((n_clusters, observations.ncols()));

    Zip::from(observations.rows())
        .and(cluster_memberships)
        .for_each(|observation, &cluster_membership| {
            let mut centroid = centroids.row_mut(cluster_membership);
            centroid += &observation;
            counts[cluster_membership] += 1;
        });
    // m_k-means: Treat the old centroid like another point in the cluster
    centroids += old_centroids;

    Zip::from(centroids.rows_mut())
        .and(&counts)
        .for_each(|mut centroid, &cnt| centroid /= F::cast(cnt));
    centroids
}

/// Sum of the reduced distances between matching rows of two centroid matrices
fn centroid_shift<F: Float, D: Distance<F>>(
    dist_fn: &D,
    old_centroids: &Array2<F>,
    new_centroids: &Array2<F>,
) -> F {
    Zip::from(old_centroids.rows())
        .and(new_centroids.rows())
        .fold(F::zero(), |acc, old, new| acc + dist_fn.rdistance(old, new))
}

// Update `cluster_memberships` with the index of the cluster each observation belongs to.
pub(crate) fn update_cluster_memberships<F: Float, D: Distance<F>>(
    dist_fn: &D,
    centroids: &ArrayBase<impl Data<Elem = F>, Ix2>,
    observations: &ArrayBase<impl Data<Elem = F>, Ix2>,
    cluster_memberships: &mut ArrayBase<impl DataMut<Elem = usize>, Ix1>,
) {
    Zip::from(observations.axis_iter(Axis(0)))
        .and(cluster_memberships)
        .for_each(|observation, cluster_membership| {
            *cluster_membership = closest_centroid(dist_fn, centroids, &observation).0
        });
}

// Updates `dists` with the distance of each observation from its closest centroid.
pub(crate) fn update_min_dists<F: Float, D: Distance<F>>(
    dist_fn: &D,
    centroids: &ArrayBase<impl Data<Elem = F>, Ix2>,
    observations: &ArrayBase<impl Data<Elem = F>, Ix2>,
    dists: &mut ArrayBase<impl DataMut<Elem = F>, Ix1>,
) {
    Zip::from(observations.axis_iter(Axis(0)))
        .and(dists)
        .for_each(|observation, dist| {
            *dist = closest_centroid(dist_fn, centroids, &observation).1
        });
}

// Efficient combination of `update_cluster_memberships` and `update_min_dists`.
pub(crate) fn update_memberships_and_dists<F: Float, D: Distance<F>>(
    dist_fn: &D,
    centroids: &ArrayBase<impl Data<Elem = F>, Ix2>,
    observations: &ArrayBase<impl Data<Elem = F>, Ix2>,
    cluster_memberships: &mut ArrayBase<impl DataMut<Elem = usize>, Ix1>,
    dists: &mut ArrayBase<impl DataMut<Elem = F>, Ix1>,
) {
    Zip::from(observations.axis_iter(Axis(0)))
        .and(cluster_memberships)
        .and(dists)
        .for_each(|observation, cluster_membership, dist| {
            let (m, d) = closest_centroid(dist_fn, centroids, &observation);
            *cluster_membership = m;
            *dist = d;
        });
}

/// Given a matrix of centroids with shape (n_centroids, n_features) and an observation,
/// return the index of the closest centroid (the index of the corresponding row in `centroids`).
pub(crate) fn closest_centroid<F: Float, D: Distance<F>>(
    dist_fn: &D,
    // (n_centroids, n_features)
    centroids: &ArrayBase<impl Data<Elem = F>, Ix2>,
    // (n_features)
    observation: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> (usize, F) {
    let iterator = centroids.rows().into_iter();

    let first_centroid = centroids.row(0);
    let (mut closest_index, mut minimum_distance) = (
        0,
        dist_fn.rdistance(first_centroid.view(), observation.view()),
    );

    for (centroid_index, centroid) in iterator.enumerate() {
        let distance = dist_fn.rdistance(centroid.view(), observation.view());
        if distance < minimum_distance {
            closest_index = centroid_index;
            minimum_distance = distance;
        }
    }
    (closest_index, minimum_distance)
}

#[cfg(test)]
mod tests {
    use super::super::KMeansInit;
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, concatenate, Array, Array1, Array2, Axis};
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use trafficseg::ParamGuard;
    use trafficseg_nn::distance::L1Dist;

    fn function_test_1d(x: &Array2<f64>) -> Array2<f64> {
        let mut y = Array2::zeros(x.dim());
        Zip::from(&mut y).and(x).for_each(|yi, &xi| {
            if xi < 0.4 {
                *yi = xi * xi;
            } else if (0.4..0.8).contains(&xi) {
                *yi = 3. * xi + 1.;
            } else {
                *yi = f64::sin(10. * xi);
            }
        });
        y
    }

    macro_rules! calc_inertia {
        ($dist:expr, $centroids:expr, $obs:expr, $memberships:expr) => {
            $obs.rows()
                .into_iter()
                .zip($memberships.iter())
                .map(|(row, &c)| $dist.rdistance(row.view(), $centroids.row(c).view()))
                .sum::<f64>()
        };
    }

    macro_rules! calc_memberships {
        ($dist:expr, $centroids:expr, $obs:expr) => {{
            let mut memberships = Array1::zeros($obs.nrows());
            update_cluster_memberships(&$dist, &$centroids, &$obs, &mut memberships);
            memberships
        }};
    }

    #[test]
    fn test_min_dists() {
        let centroids = array![[0.0, 1.0], [40.0, 10.0]];
        let observations = array![[3.0, 4.0], [1.0, 3.0], [25.0, 15.0]];
        let mut dists = Array1::zeros(observations.nrows());

        update_min_dists(&L2Dist, &centroids, &observations, &mut dists);
        assert_abs_diff_eq!(dists, array![18.0, 5.0, 250.0]);
        update_min_dists(&L1Dist, &centroids, &observations, &mut dists);
        assert_abs_diff_eq!(dists, array![6.0, 3.0, 20.0]);
    }

    fn min_dists<D: Distance<f64>>(
        dist_fn: &D,
        centroids: &Array2<f64>,
        observations: &Array2<f64>,
    ) -> Array1<f64> {
        let mut dists = Array1::zeros(observations.nrows());
        update_min_dists(dist_fn, centroids, observations, &mut dists);
        dists
    }

    fn test_n_runs<D: Distance<f64>>(dist_fn: D) {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let xt = Array::random_using(100, Uniform::new(0., 1.0), &mut rng).insert_axis(Axis(1));
        let yt = function_test_1d(&xt);
        let data = concatenate(Axis(1), &[xt.view(), yt.view()]).unwrap();

        for init in &[KMeansInit::Random, KMeansInit::KMeansPlusPlus] {
            // First clustering with one run
            let model = KMeans::params_with(3, rng.clone(), dist_fn.clone())
                .n_runs(1)
                .init_method(*init)
                .fit(&data)
                .expect("KMeans fitted");
            let memberships: Array1<usize> = model.predict(&data);
            let inertia = calc_inertia!(dist_fn, model.centroids(), data, memberships);
            let total_dist = min_dists(&dist_fn, model.centroids(), &data).sum();
            assert_abs_diff_eq!(inertia, total_dist, epsilon = 1e-5);
            assert_abs_diff_eq!(model.inertia() * 100., total_dist, epsilon = 1e-5);
            assert_abs_diff_eq!(model.cluster_count().sum(), 100.);

            let single_cluster: usize = model.predict(&data.row(0));
            assert_eq!(single_cluster, memberships[0]);

            // Second clustering with 10 runs (default)
            let model2 = KMeans::params_with(3, rng.clone(), dist_fn.clone())
                .init_method(*init)
                .fit(&data)
                .expect("KMeans fitted");
            let memberships2: Array1<usize> = model2.predict(&data);
            let inertia2 = calc_inertia!(dist_fn, model2.centroids(), data, memberships2);
            let total_dist2 = min_dists(&dist_fn, model2.centroids(), &data).sum();
            assert_abs_diff_eq!(inertia2, total_dist2, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_n_runs_l2dist() {
        test_n_runs(L2Dist);
    }

    #[test]
    fn test_n_runs_l1dist() {
        test_n_runs(L1Dist);
    }

    #[test]
    fn compute_centroids_works() {
        let cluster_size = 100;
        let n_features = 4;
        let mut rng = Xoshiro256Plus::seed_from_u64(7);

        // Let's setup a synthetic set of observations, composed of two clusters with known means
        let cluster_1: Array2<f64> =
            Array::random_using((cluster_size, n_features), Uniform::new(-100., 100.), &mut rng);
        let memberships_1 = Array1::zeros(cluster_size);
        let expected_centroid_1 = cluster_1.sum_axis(Axis(0)) / (cluster_size + 1) as f64;

        let cluster_2: Array2<f64> =
            Array::random_using((cluster_size, n_features), Uniform::new(-100., 100.), &mut rng);
        let memberships_2 = Array1::ones(cluster_size);
        let expected_centroid_2 = cluster_2.sum_axis(Axis(0)) / (cluster_size + 1) as f64;

        let observations = concatenate(Axis(0), &[cluster_1.view(), cluster_2.view()]).unwrap();
        let memberships =
            concatenate(Axis(0), &[memberships_1.view(), memberships_2.view()]).unwrap();

        let old_centroids = Array2::zeros((2, n_features));
        let centroids = compute_centroids(&old_centroids, &observations, &memberships);
        assert_abs_diff_eq!(
            centroids.index_axis(Axis(0), 0),
            expected_centroid_1,
            epsilon = 1e-5
        );
        assert_abs_diff_eq!(
            centroids.index_axis(Axis(0), 1),
            expected_centroid_2,
            epsilon = 1e-5
        );

        assert_eq!(centroids.len_of(Axis(0)), 2);
    }

    #[test]
    fn test_compute_extra_centroids() {
        let observations = array![[1.0, 2.0]];
        let memberships = array![0];
        // Should return an average of 0 for empty clusters
        let old_centroids = Array2::ones((2, 2));
        let centroids = compute_centroids(&old_centroids, &observations, &memberships);
        assert_abs_diff_eq!(centroids, array![[1.0, 1.5], [1.0, 1.0]]);
    }

    #[test]
    // An observation is closest to itself.
    fn nothing_is_closer_than_self() {
        let n_centroids = 20;
        let n_features = 5;
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let centroids: Array2<f64> = Array::random_using(
            (n_centroids, n_features),
            Uniform::new(-100., 100.),
            &mut rng,
        );

        let expected_memberships = (0..n_centroids).collect::<Array1<_>>();
        assert_eq!(
            calc_memberships!(L2Dist, centroids, centroids),
            expected_memberships
        );
        assert_eq!(
            calc_memberships!(L1Dist, centroids, centroids),
            expected_memberships
        );
    }

    #[test]
    fn oracle_test_for_closest_centroid() {
        let centroids = array![[0., 0.], [1., 2.], [20., 0.], [0., 20.],];
        let observations = array![[1., 0.6], [20., 2.], [20., 0.], [7., 20.],];
        let l2_memberships = array![0, 2, 2, 3];
        let l1_memberships = array![1, 2, 2, 3];

        assert_eq!(
            calc_memberships!(L2Dist, centroids, observations),
            l2_memberships
        );
        assert_eq!(
            calc_memberships!(L1Dist, centroids, observations),
            l1_memberships
        );
    }

    #[test]
    fn fewer_points_than_clusters() {
        let observations = array![[0., 1.], [2., 3.]];
        let res = KMeans::<f64, _>::params(3).check_unwrap().fit(&observations);
        assert!(matches!(
            res,
            Err(KMeansError::BaseCrate(trafficseg::Error::InsufficientData {
                required: 3,
                actual: 2
            }))
        ));
    }

    #[test]
    fn running_out_of_iterations_keeps_best_centroids() {
        let observations = array![[0., 0.], [0., 1.], [10., 10.], [10., 11.], [5., 5.]];
        let model = KMeans::<f64, _>::params(2)
            .max_n_iterations(1)
            .tolerance(1e-12)
            .check_unwrap()
            .fit(&observations)
            .unwrap();
        assert_eq!(model.centroids().nrows(), 2);
        assert!(model.inertia().is_finite());
    }

    #[test]
    fn every_row_is_labeled() {
        let observations = array![[0., 0.], [0., 1.], [10., 10.], [10., 11.]];
        let labels = KMeans::<f64, _>::params(2)
            .check_unwrap()
            .fit_predict(observations.view())
            .unwrap();

        assert!(labels.iter().all(|label| label.is_some()));
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_ne!(labels[0], labels[2]);
    }
}
