//! Clustering strategies selectable at run time
use std::fmt;

use ndarray::{Array1, ArrayView2};
use rand_xoshiro::Xoshiro256Plus;
use trafficseg::traits::{Clusterer, Transformer};
use trafficseg::Float;
use trafficseg_nn::distance::{CosineDist, L2Dist};

use crate::{HdbscanError, HdbscanValidParams, KMeansValidParams};

/// One of the supported clustering strategies with checked parameters
///
/// Every call to [`Clusterer::fit_predict`] is independent: the density strategy has no state
/// and the centroid strategy starts from a clone of its random generator, so repeated calls on
/// the same data give the same labels.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusteringEngine<F: Float> {
    /// HDBSCAN with cosine distance, may label points as noise
    Density(HdbscanValidParams<CosineDist>),
    /// K-Means with euclidean distance, labels every point
    Centroid(KMeansValidParams<F, Xoshiro256Plus, L2Dist>),
}

impl<F: Float> ClusteringEngine<F> {
    /// Short name used for output files, e.g. `HDBSCAN` or `KMeans_5clusters`
    pub fn name(&self) -> String {
        match self {
            ClusteringEngine::Density(_) => "HDBSCAN".to_string(),
            ClusteringEngine::Centroid(params) => {
                format!("KMeans_{}clusters", params.n_clusters())
            }
        }
    }
}

impl<F: Float> fmt::Display for ClusteringEngine<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusteringEngine::Density(params) => write!(
                f,
                "HDBSCAN(min_cluster_size={}, min_samples={})",
                params.min_cluster_size(),
                params.min_samples()
            ),
            ClusteringEngine::Centroid(params) => write!(f, "KMeans(k={})", params.n_clusters()),
        }
    }
}

impl<F: Float> Clusterer<F> for ClusteringEngine<F> {
    fn fit_predict(&self, records: ArrayView2<F>) -> trafficseg::Result<Array1<Option<usize>>> {
        match self {
            ClusteringEngine::Density(params) => {
                let labels: Result<_, HdbscanError> = params.transform(&records);
                Ok(labels?)
            }
            ClusteringEngine::Centroid(params) => params.fit_predict(records),
        }
    }
}

impl<F: Float> From<HdbscanValidParams<CosineDist>> for ClusteringEngine<F> {
    fn from(params: HdbscanValidParams<CosineDist>) -> Self {
        ClusteringEngine::Density(params)
    }
}

impl<F: Float> From<KMeansValidParams<F, Xoshiro256Plus, L2Dist>> for ClusteringEngine<F> {
    fn from(params: KMeansValidParams<F, Xoshiro256Plus, L2Dist>) -> Self {
        ClusteringEngine::Centroid(params)
    }
}
