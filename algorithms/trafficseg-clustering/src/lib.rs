//! `trafficseg-clustering` provides the clustering strategies used to group the intervals of a
//! traffic count dataset.
//!
//! ## Current state
//!
//! Right now `trafficseg-clustering` provides the following clustering algorithms:
//! * [HDBSCAN](Hdbscan), density based with cosine distance by default, may label points as noise
//! * [K-Means](KMeans), centroid based with euclidean distance, labels every point
//!
//! Both are wrapped by [`ClusteringEngine`], which implements the
//! [`Clusterer`](trafficseg::traits::Clusterer) capability used by the pipeline. The
//! [silhouette score](SilhouetteScore) rates the outcome of a run.
//!
//! Implementation choices and algorithmic details can be found in the page dedicated to the
//! specific algorithms.
mod engine;
mod hdbscan;
#[allow(clippy::new_ret_no_self)]
mod k_means;
mod metrics;

pub use engine::*;
pub use hdbscan::*;
pub use k_means::*;
pub use metrics::*;
