//! Common metrics for clustering
use std::collections::BTreeMap;

use ndarray::{ArrayBase, ArrayView1, Data, Ix1, Ix2};
use trafficseg::{Error, Float, Result};
use trafficseg_nn::distance::Distance;

/// Evaluates the quality of a clustering
pub trait SilhouetteScore<F> {
    /// Evaluates the quality of a clustering.
    ///
    /// Given a clustered dataset, the silhouette score for each sample is computed as the
    /// relative difference between the average distance of the sample to other samples in the
    /// same cluster and the minimum average distance of the sample to samples in another cluster.
    /// This value goes from -1 to +1 when the point is respectively closer (in average) to points
    /// in another cluster and to points in its own cluster. A sample alone in its cluster scores
    /// zero.
    ///
    /// Noise points take no part in the score, neither as samples nor as neighbours. The score of
    /// the clustering is the mean over all labeled samples, or one if there is a single cluster.
    fn silhouette_score(&self, labels: ArrayView1<Option<usize>>) -> Result<F>;
}

struct DistanceCount<F> {
    total_distance: F,
    count: usize,
}

impl<F: Float> DistanceCount<F> {
    fn new(count: usize) -> DistanceCount<F> {
        DistanceCount {
            total_distance: F::zero(),
            count,
        }
    }

    /// Sets the total distance from the sample to this cluster to zero
    fn reset(&mut self) {
        self.total_distance = F::zero();
    }

    /// Divides the total distance from the sample to this cluster by the number of samples in the cluster
    fn mean_distance(&self) -> F {
        self.total_distance / F::cast(self.count)
    }

    /// To be used in the cluster in which the sample is located. The distance from the sample to
    /// itself is zero so it does not get added to the total distance, we divide by the number of
    /// other samples instead.
    fn same_label_mean_distance(&self) -> F {
        if self.count == 1 {
            return F::zero();
        }
        self.total_distance / F::cast(self.count - 1)
    }
}

/// Records paired with the distance function used to compare them
pub struct WithDistance<'a, S: Data, D> {
    records: &'a ArrayBase<S, Ix2>,
    dist_fn: D,
}

impl<'a, F: Float, S: Data<Elem = F>, D: Distance<F>> WithDistance<'a, S, D> {
    pub fn new(records: &'a ArrayBase<S, Ix2>, dist_fn: D) -> Self {
        WithDistance { records, dist_fn }
    }
}

impl<'a, F: Float, S: Data<Elem = F>, D: Distance<F>> SilhouetteScore<F>
    for WithDistance<'a, S, D>
{
    fn silhouette_score(&self, labels: ArrayView1<Option<usize>>) -> Result<F> {
        silhouette(self.records, &labels, &self.dist_fn)
    }
}

fn silhouette<F: Float, D: Distance<F>>(
    records: &ArrayBase<impl Data<Elem = F>, Ix2>,
    labels: &ArrayBase<impl Data<Elem = Option<usize>>, Ix1>,
    dist_fn: &D,
) -> Result<F> {
    if records.nrows() != labels.len() {
        return Err(Error::ShapeMismatch {
            expected: records.nrows(),
            found: labels.len(),
        });
    }

    let labeled = labels
        .iter()
        .enumerate()
        .filter_map(|(idx, label)| label.map(|label| (idx, label)))
        .collect::<Vec<_>>();
    if labeled.is_empty() {
        return Err(Error::InsufficientData {
            required: 1,
            actual: 0,
        });
    }

    let mut clusters: BTreeMap<usize, DistanceCount<F>> = BTreeMap::new();
    for &(_, label) in &labeled {
        clusters
            .entry(label)
            .or_insert_with(|| DistanceCount::new(0))
            .count += 1;
    }

    // Single label dataset, all points are in the same cluster.
    if clusters.len() == 1 {
        return Ok(F::one());
    }

    let score = labeled
        .iter()
        .map(|&(idx, label)| {
            for &(other, other_label) in &labeled {
                if let Some(counter) = clusters.get_mut(&other_label) {
                    counter.total_distance += dist_fn.distance(records.row(idx), records.row(other));
                }
            }

            // average distance from the sample to points in its cluster
            let mut a_x = F::zero();
            let mut alone = false;
            // minimum average distance from the sample to another cluster
            let mut b_x: Option<F> = None;
            for (&cluster, counter) in clusters.iter_mut() {
                if cluster == label {
                    a_x = counter.same_label_mean_distance();
                    alone = counter.count == 1;
                } else {
                    let mean = counter.mean_distance();
                    b_x = Some(b_x.map_or(mean, |b| if mean < b { mean } else { b }));
                }
                counter.reset();
            }
            // there are at least two clusters, so `b_x` is always set
            let b_x = b_x.unwrap_or_else(F::zero);

            let max = if a_x > b_x { a_x } else { b_x };
            if alone || max.is_zero() {
                F::zero()
            } else {
                (b_x - a_x) / max
            }
        })
        .sum::<F>();

    Ok(score / F::cast(labeled.len()))
}
