#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use trafficseg::{param_guard::TransformGuard, ParamGuard};

use crate::HdbscanParamsError;

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
/// The set of hyperparameters that can be specified for the execution of
/// the [HDBSCAN algorithm](crate::Hdbscan).
pub struct HdbscanValidParams<D> {
    pub(crate) min_cluster_size: usize,
    pub(crate) min_samples: Option<usize>,
    pub(crate) dist_fn: D,
}

#[derive(Debug, Clone, PartialEq)]
/// Helper struct for building a set of [HDBSCAN hyperparameters](HdbscanValidParams)
pub struct HdbscanParams<D>(HdbscanValidParams<D>);

impl<D> HdbscanParams<D> {
    pub(crate) fn new(min_cluster_size: usize, dist_fn: D) -> Self {
        Self(HdbscanValidParams {
            min_cluster_size,
            min_samples: None,
            dist_fn,
        })
    }

    /// Set the neighbourhood size used for core distances, the point itself included
    pub fn min_samples(mut self, min_samples: usize) -> Self {
        self.0.min_samples = Some(min_samples);
        self
    }

    /// Set the distance metric
    pub fn dist_fn(mut self, dist_fn: D) -> Self {
        self.0.dist_fn = dist_fn;
        self
    }
}

impl<D> ParamGuard for HdbscanParams<D> {
    type Checked = HdbscanValidParams<D>;
    type Error = HdbscanParamsError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        if self.0.min_cluster_size < 2 {
            Err(HdbscanParamsError::MinClusterSize)
        } else if self.0.min_samples == Some(0) {
            Err(HdbscanParamsError::MinSamples)
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}
impl<D> TransformGuard for HdbscanParams<D> {}

impl<D> HdbscanValidParams<D> {
    /// Smallest group of points that is reported as a cluster
    pub fn min_cluster_size(&self) -> usize {
        self.min_cluster_size
    }

    /// Neighbourhood size of the core distance, defaults to `min_cluster_size`
    pub fn min_samples(&self) -> usize {
        self.min_samples.unwrap_or(self.min_cluster_size)
    }

    /// Distance metric between two points
    pub fn dist_fn(&self) -> &D {
        &self.dist_fn
    }
}
