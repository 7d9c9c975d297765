use std::cmp::Ordering;

use ndarray::{Array1, Array2, ArrayBase, Data, Ix2};
use trafficseg::{traits::Transformer, Float};
use trafficseg_nn::{
    distance::{CosineDist, Distance},
    pairwise_distances,
};

use crate::{HdbscanError, HdbscanParams, HdbscanValidParams};

/// HDBSCAN (Hierarchical Density-Based Spatial Clustering of Applications with Noise) groups
/// points lying in dense regions and labels points in sparse regions as noise. Unlike DBSCAN it
/// does not need a fixed neighbourhood radius: it considers all radii at once and keeps the
/// clusters which persist over the widest range of densities.
///
/// The number of clusters is determined by the data. The result is an
/// `Array1<Option<usize>>` with `None` for noise.
///
/// ## The algorithm
///
/// - the *core distance* of a point is the distance to its `min_samples`-th nearest neighbour,
///   the point itself included;
/// - the *mutual reachability* of two points is the maximum of their distance and both core
///   distances, which pushes sparse points away from everything else;
/// - a minimum spanning tree of the mutual reachability graph is merged into a single linkage
///   hierarchy, lightest edge first;
/// - the hierarchy is condensed: walking down from the root, a split only creates two new
///   clusters if both sides hold at least `min_cluster_size` points, otherwise the smaller side
///   falls out of its cluster as individual points;
/// - every condensed cluster is scored by its stability, the sum of `lambda - lambda_birth` over
///   its points with `lambda = 1 / distance`, and the excess of mass selection keeps a cluster
///   unless its children are more stable together. The root is never selected.
///
/// Points which do not belong to a selected cluster are noise.
///
/// ## Tutorial
///
/// ```rust
/// use ndarray::array;
/// use trafficseg::prelude::*;
/// use trafficseg_clustering::Hdbscan;
///
/// let observations = array![
///     [10., 1., 1.], [9., 1., 2.], [11., 2., 1.], [10., 2., 2.],
///     [1., 1., 10.], [2., 1., 9.], [1., 2., 11.], [2., 2., 10.],
/// ];
/// // cosine distance is the default metric
/// let labels = Hdbscan::params(3)
///     .check_unwrap()
///     .transform(&observations)
///     .unwrap();
///
/// assert!(labels.iter().all(|label| label.is_some()));
/// assert_ne!(labels[0], labels[4]);
/// ```
pub struct Hdbscan;

impl Hdbscan {
    /// Configures the hyperparameters with the minimum cluster size
    ///
    /// Defaults are provided if the optional parameters are not specified:
    /// * `min_samples = min_cluster_size`
    /// * `dist_fn = CosineDist`
    pub fn params(min_cluster_size: usize) -> HdbscanParams<CosineDist> {
        Self::params_with(min_cluster_size, CosineDist)
    }

    /// Configures the hyperparameters with the minimum cluster size and a custom distance metric
    pub fn params_with<D>(min_cluster_size: usize, dist_fn: D) -> HdbscanParams<D> {
        HdbscanParams::new(min_cluster_size, dist_fn)
    }
}

impl<F: Float, DA: Data<Elem = F>, D: Distance<F>>
    Transformer<&ArrayBase<DA, Ix2>, Result<Array1<Option<usize>>, HdbscanError>>
    for HdbscanValidParams<D>
{
    fn transform(
        &self,
        observations: &ArrayBase<DA, Ix2>,
    ) -> Result<Array1<Option<usize>>, HdbscanError> {
        let n_samples = observations.nrows();
        if n_samples < self.min_cluster_size() {
            return Err(trafficseg::Error::InsufficientData {
                required: self.min_cluster_size(),
                actual: n_samples,
            }
            .into());
        }

        let distances = pairwise_distances(observations, self.dist_fn());
        let core = core_distances(&distances, self.min_samples());
        let edges = minimum_spanning_tree(&distances, &core);
        let merges = single_linkage(&edges, n_samples);
        let tree = CondensedTree::build(&merges, n_samples, self.min_cluster_size());
        let labels = tree.labels(&tree.select_clusters());

        log::debug!(
            "hdbscan: {} points, {} condensed clusters, {} noise points",
            n_samples,
            tree.clusters.len(),
            labels.iter().filter(|label| label.is_none()).count()
        );

        Ok(labels)
    }
}

/// Distance of every point to its `min_samples`-th nearest neighbour, itself included
fn core_distances<F: Float>(distances: &Array2<F>, min_samples: usize) -> Array1<F> {
    let kth = min_samples
        .saturating_sub(1)
        .min(distances.ncols().saturating_sub(1));

    distances
        .rows()
        .into_iter()
        .map(|row| {
            let mut sorted = row.to_vec();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
            sorted[kth]
        })
        .collect()
}

/// Prim's minimum spanning tree of the mutual reachability graph
///
/// Returns edges `(a, b, weight)` sorted by weight. The sort is stable, so edges of equal weight
/// keep the order in which they joined the tree.
fn minimum_spanning_tree<F: Float>(
    distances: &Array2<F>,
    core: &Array1<F>,
) -> Vec<(usize, usize, F)> {
    let n_samples = distances.nrows();
    let reachability = |a: usize, b: usize| distances[[a, b]].max(core[a]).max(core[b]);

    let mut in_tree = vec![false; n_samples];
    let mut min_dist = vec![F::infinity(); n_samples];
    let mut min_edge = vec![0; n_samples];
    let mut edges = Vec::with_capacity(n_samples.saturating_sub(1));

    let mut current = 0;
    in_tree[current] = true;
    for _ in 1..n_samples {
        let mut next: Option<usize> = None;
        for j in 0..n_samples {
            if in_tree[j] {
                continue;
            }
            let weight = reachability(current, j);
            if weight < min_dist[j] {
                min_dist[j] = weight;
                min_edge[j] = current;
            }
            match next {
                Some(k) if min_dist[k] <= min_dist[j] => {}
                _ => next = Some(j),
            }
        }

        let next = match next {
            Some(next) => next,
            None => break,
        };
        in_tree[next] = true;
        edges.push((min_edge[next], next, min_dist[next]));
        current = next;
    }

    edges.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(Ordering::Equal));
    edges
}

/// Merge of two nodes of the single linkage hierarchy
///
/// Nodes `0..n` are the points, the `i`-th merge creates node `n + i`.
#[derive(Debug, Clone, PartialEq)]
struct Merge<F> {
    left: usize,
    right: usize,
    distance: F,
    size: usize,
}

struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        UnionFind {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    fn find(&mut self, mut idx: usize) -> usize {
        while self.parent[idx] != idx {
            self.parent[idx] = self.parent[self.parent[idx]];
            idx = self.parent[idx];
        }
        idx
    }

    /// Joins two roots and returns the root of the union
    fn union(&mut self, a: usize, b: usize) -> usize {
        let (big, small) = if self.size[a] >= self.size[b] {
            (a, b)
        } else {
            (b, a)
        };
        self.parent[small] = big;
        self.size[big] += self.size[small];
        big
    }
}

fn single_linkage<F: Float>(edges: &[(usize, usize, F)], n_samples: usize) -> Vec<Merge<F>> {
    let mut components = UnionFind::new(n_samples);
    // hierarchy node currently represented by a component root
    let mut node = (0..n_samples).collect::<Vec<_>>();
    let mut merges = Vec::with_capacity(edges.len());

    for &(a, b, distance) in edges {
        let (root_a, root_b) = (components.find(a), components.find(b));
        if root_a == root_b {
            continue;
        }

        merges.push(Merge {
            left: node[root_a],
            right: node[root_b],
            distance,
            size: components.size[root_a] + components.size[root_b],
        });
        let root = components.union(root_a, root_b);
        node[root] = n_samples + merges.len() - 1;
    }

    merges
}

#[derive(Debug, Clone)]
struct CondensedCluster<F> {
    parent: Option<usize>,
    birth: F,
    stability: F,
    children: Vec<usize>,
}

impl<F: Float> CondensedCluster<F> {
    fn new(parent: Option<usize>, birth: F) -> Self {
        CondensedCluster {
            parent,
            birth,
            stability: F::zero(),
            children: Vec::new(),
        }
    }
}

/// Condensed cluster tree
///
/// Cluster `0` is the root. A child cluster always has a larger id than its parent.
struct CondensedTree<F> {
    clusters: Vec<CondensedCluster<F>>,
    /// Cluster every point falls out of
    points: Vec<usize>,
}

impl<F: Float> CondensedTree<F> {
    fn build(merges: &[Merge<F>], n_samples: usize, min_cluster_size: usize) -> Self {
        let size = |node: usize| {
            if node < n_samples {
                1
            } else {
                merges[node - n_samples].size
            }
        };

        let mut clusters = vec![CondensedCluster::new(None, F::zero())];
        let mut points = vec![0; n_samples];
        let mut stack = Vec::new();
        if !merges.is_empty() {
            stack.push((n_samples + merges.len() - 1, 0));
        }

        while let Some((node, cluster)) = stack.pop() {
            let merge = &merges[node - n_samples];
            let lambda = F::one() / merge.distance.max(F::epsilon());
            let birth = clusters[cluster].birth;
            let children = [merge.left, merge.right];

            if children.iter().all(|&child| size(child) >= min_cluster_size) {
                for &child in children.iter() {
                    let id = clusters.len();
                    clusters.push(CondensedCluster::new(Some(cluster), lambda));
                    clusters[cluster].children.push(id);
                    clusters[cluster].stability += (lambda - birth) * F::cast(size(child));
                    stack.push((child, id));
                }
            } else {
                for &child in children.iter() {
                    if size(child) >= min_cluster_size {
                        stack.push((child, cluster));
                    } else {
                        for leaf in leaves(merges, n_samples, child) {
                            points[leaf] = cluster;
                        }
                        clusters[cluster].stability += (lambda - birth) * F::cast(size(child));
                    }
                }
            }
        }

        CondensedTree { clusters, points }
    }

    /// Excess of mass selection, the root is excluded
    fn select_clusters(&self) -> Vec<bool> {
        let mut selected = vec![true; self.clusters.len()];
        let mut best = self
            .clusters
            .iter()
            .map(|cluster| cluster.stability)
            .collect::<Vec<_>>();
        selected[0] = false;

        for id in (1..self.clusters.len()).rev() {
            let cluster = &self.clusters[id];
            let children_stability = cluster.children.iter().map(|&c| best[c]).sum::<F>();

            if !cluster.children.is_empty() && children_stability > cluster.stability {
                selected[id] = false;
                best[id] = children_stability;
            } else {
                let mut descendants = cluster.children.clone();
                while let Some(descendant) = descendants.pop() {
                    selected[descendant] = false;
                    descendants.extend(self.clusters[descendant].children.iter());
                }
            }
        }

        selected
    }

    /// Label of every point, selected clusters are numbered in id order
    fn labels(&self, selected: &[bool]) -> Array1<Option<usize>> {
        let mut ids = vec![None; selected.len()];
        let mut next = 0;
        for (id, &is_selected) in selected.iter().enumerate() {
            if is_selected {
                ids[id] = Some(next);
                next += 1;
            }
        }

        self.points
            .iter()
            .map(|&cluster| {
                let mut current = Some(cluster);
                while let Some(id) = current {
                    if selected[id] {
                        return ids[id];
                    }
                    current = self.clusters[id].parent;
                }
                None
            })
            .collect()
    }
}

fn leaves<F>(merges: &[Merge<F>], n_samples: usize, node: usize) -> Vec<usize> {
    let mut stack = vec![node];
    let mut leaves = Vec::new();
    while let Some(node) = stack.pop() {
        if node < n_samples {
            leaves.push(node);
        } else {
            let merge = &merges[node - n_samples];
            stack.push(merge.left);
            stack.push(merge.right);
        }
    }

    leaves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HdbscanParamsError;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, concatenate, Axis};
    use trafficseg::ParamGuard;
    use trafficseg_nn::distance::L2Dist;

    fn square(offset: f64) -> Array2<f64> {
        array![[0., 0.], [0., 1.], [1., 0.], [1., 1.], [0.5, 0.5]] + offset
    }

    #[test]
    fn core_distance_counts_the_point_itself() {
        let points = array![[0.], [1.], [3.], [7.]];
        let distances = pairwise_distances(&points, &L2Dist);

        assert_abs_diff_eq!(core_distances(&distances, 1), array![0., 0., 0., 0.]);
        assert_abs_diff_eq!(core_distances(&distances, 2), array![1., 1., 2., 4.]);
        // more neighbours than points falls back to the farthest point
        assert_abs_diff_eq!(core_distances(&distances, 9), array![7., 6., 4., 7.]);
    }

    #[test]
    fn spanning_tree_is_sorted_and_complete() {
        let points = array![[0.], [10.], [1.], [3.]];
        let distances = pairwise_distances(&points, &L2Dist);
        let core = core_distances(&distances, 1);

        let edges = minimum_spanning_tree(&distances, &core);
        let weights = edges.iter().map(|e| e.2).collect::<Vec<_>>();
        assert_eq!(weights, vec![1., 2., 7.]);

        let merges = single_linkage(&edges, 4);
        assert_eq!(merges.len(), 3);
        assert_eq!(merges[2].size, 4);
        assert_abs_diff_eq!(merges[2].distance, 7.);
    }

    #[test]
    fn two_blobs_and_an_outlier() {
        let outlier = array![[50., -50.]];
        let observations =
            concatenate(Axis(0), &[square(0.).view(), square(10.).view(), outlier.view()])
                .unwrap();

        let labels = Hdbscan::params_with(3, L2Dist)
            .check_unwrap()
            .transform(&observations)
            .unwrap();

        assert!(labels[0].is_some());
        assert!(labels.iter().take(5).all(|&label| label == labels[0]));
        assert!(labels[5].is_some());
        assert!(labels.iter().skip(5).take(5).all(|&label| label == labels[5]));
        assert_ne!(labels[0], labels[5]);
        assert_eq!(labels[10], None);
        let mut ids = vec![labels[0].unwrap(), labels[5].unwrap()];
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn cosine_groups_by_direction() {
        let observations = array![
            [10., 1., 1.],
            [9., 1., 2.],
            [11., 2., 1.],
            [10., 2., 2.],
            [12., 1., 1.],
            [9., 2., 1.],
            [1., 1., 10.],
            [2., 1., 9.],
            [1., 2., 11.],
            [2., 2., 10.],
            [1., 1., 12.],
            [1., 2., 9.],
        ];
        // scaling a row changes its magnitude but not its direction
        let mut scaled = observations.clone();
        scaled.row_mut(3).mapv_inplace(|v| v * 40.);

        for observations in &[observations, scaled] {
            let labels = Hdbscan::params(4)
                .check_unwrap()
                .transform(observations)
                .unwrap();

            assert!(labels.iter().all(|label| label.is_some()));
            assert!(labels.iter().take(6).all(|&label| label == labels[0]));
            assert!(labels.iter().skip(6).all(|&label| label == labels[6]));
            assert_ne!(labels[0], labels[6]);
        }
    }

    #[test]
    fn no_split_means_all_noise() {
        // five points can not form two clusters of four, the root is never selected
        let labels = Hdbscan::params_with(4, L2Dist)
            .check_unwrap()
            .transform(&square(0.))
            .unwrap();
        assert!(labels.iter().all(|label| label.is_none()));
    }

    #[test]
    fn insufficient_data() {
        assert!(Hdbscan::params(5)
            .check_unwrap()
            .transform(&square(0.))
            .is_ok());

        let res = Hdbscan::params(6).check_unwrap().transform(&square(0.));
        assert!(matches!(
            res,
            Err(HdbscanError::BaseCrate(trafficseg::Error::InsufficientData {
                required: 6,
                actual: 5
            }))
        ));
    }

    #[test]
    fn unchecked_params_are_checked_on_transform() {
        let res: Result<_, HdbscanError> = Hdbscan::params(1).transform(&square(0.));
        assert!(matches!(
            res,
            Err(HdbscanError::InvalidParams(
                HdbscanParamsError::MinClusterSize
            ))
        ));
    }

    #[test]
    fn stability_prefers_persistent_clusters() {
        // two tight pairs inside each of two distant groups
        let observations = array![
            [0.0],
            [0.1],
            [0.2],
            [3.0],
            [3.1],
            [3.2],
            [100.0],
            [100.1],
            [100.2],
            [103.0],
            [103.1],
            [103.2],
        ];
        let merges = {
            let distances = pairwise_distances(&observations, &L2Dist);
            let core = core_distances(&distances, 3);
            single_linkage(&minimum_spanning_tree(&distances, &core), 12)
        };
        let tree = CondensedTree::build(&merges, 12, 3);
        // root, two groups and two triples in each group
        assert_eq!(tree.clusters.len(), 7);

        let selected = tree.select_clusters();
        assert!(!selected[0]);
        assert_eq!(selected.iter().filter(|&&s| s).count(), 4);
        let labels = tree.labels(&selected);
        assert!(labels.iter().all(|label| label.is_some()));
        assert_eq!(labels[0], labels[2]);
        assert_ne!(labels[0], labels[3]);
    }
}
