//! Run configuration
//!
//! The configuration is a JSON document. Every field is optional, a missing field takes the value
//! of [`Config::default`], which reproduces the six reference runs:
//!
//! ```json
//! {
//!   "window_seconds": 60,
//!   "interval_minutes": 30,
//!   "embedding": { "n_neighbors": 2, "min_dist": 0.5, "spread": 2.0, "n_epochs": 500, "seed": 42 },
//!   "runs": [
//!     { "clustering": { "strategy": "hdbscan", "min_cluster_size": 4 } },
//!     { "clustering": { "strategy": "k_means", "n_clusters": 5 } },
//!     { "clustering": { "strategy": "k_means", "n_clusters": 7 } }
//!   ]
//! }
//! ```
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Duration;
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use serde::{Deserialize, Serialize};
use trafficseg::features::Representation;
use trafficseg::pipeline::{Pipeline, PipelineValidParams};
use trafficseg::ParamGuard;
use trafficseg_clustering::{ClusteringEngine, Hdbscan, KMeans, KMeansInit};
use trafficseg_nn::distance::CosineDist;
use trafficseg_umap::{Umap, UmapValidParams};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Bucket width of the resampled series
    pub window_seconds: u32,
    /// Length of a clustered interval
    pub interval_minutes: u32,
    pub embedding: EmbeddingConfig,
    pub runs: Vec<RunConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            window_seconds: 60,
            interval_minutes: 30,
            embedding: EmbeddingConfig::default(),
            runs: vec![
                RunConfig::new(ClusteringConfig::Hdbscan {
                    min_cluster_size: 4,
                    min_samples: None,
                }),
                RunConfig::new(ClusteringConfig::k_means(5)),
                RunConfig::new(ClusteringConfig::k_means(7)),
            ],
        }
    }
}

impl Config {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("cannot open config {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("invalid config {}", path.display()))
    }

    /// Checked pipeline parameters
    pub fn pipeline(&self) -> Result<PipelineValidParams> {
        let params = Pipeline::params()
            .window(Duration::seconds(i64::from(self.window_seconds)))
            .interval(Duration::minutes(i64::from(self.interval_minutes)))
            .check()?;

        Ok(params)
    }
}

/// Settings of the segment embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmbeddingConfig {
    pub n_neighbors: usize,
    pub min_dist: f64,
    pub spread: f64,
    pub n_epochs: usize,
    pub seed: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        EmbeddingConfig {
            n_neighbors: 2,
            min_dist: 0.5,
            spread: 2.0,
            n_epochs: 500,
            seed: 42,
        }
    }
}

impl EmbeddingConfig {
    pub fn projector(&self) -> Result<UmapValidParams<f64, Xoshiro256Plus, CosineDist>> {
        let params = Umap::params()
            .n_neighbors(self.n_neighbors)
            .min_dist(self.min_dist)
            .spread(self.spread)
            .n_epochs(self.n_epochs)
            .seed(self.seed)
            .check()?;

        Ok(params)
    }
}

/// One clustering strategy applied to a list of feature representations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub clustering: ClusteringConfig,
    #[serde(default = "all_representations")]
    pub representations: Vec<Representation>,
}

fn all_representations() -> Vec<Representation> {
    Representation::ALL.to_vec()
}

impl RunConfig {
    pub fn new(clustering: ClusteringConfig) -> Self {
        RunConfig {
            clustering,
            representations: all_representations(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ClusteringConfig {
    Hdbscan {
        min_cluster_size: usize,
        #[serde(default)]
        min_samples: Option<usize>,
    },
    KMeans {
        n_clusters: usize,
        /// Seed of the centroid initialisation, drawn from the OS when absent
        #[serde(default)]
        seed: Option<u64>,
        #[serde(default)]
        n_runs: Option<usize>,
        #[serde(default)]
        max_n_iterations: Option<u64>,
        #[serde(default)]
        tolerance: Option<f64>,
        /// Centroid seeding, `KMeansPlusPlus` when absent
        #[serde(default)]
        init: Option<KMeansInit>,
    },
}

impl ClusteringConfig {
    fn k_means(n_clusters: usize) -> Self {
        ClusteringConfig::KMeans {
            n_clusters,
            seed: None,
            n_runs: None,
            max_n_iterations: None,
            tolerance: None,
            init: None,
        }
    }

    /// Checked clustering engine of this strategy
    pub fn engine(&self) -> Result<ClusteringEngine<f64>> {
        match *self {
            ClusteringConfig::Hdbscan {
                min_cluster_size,
                min_samples,
            } => {
                let mut params = Hdbscan::params(min_cluster_size);
                if let Some(min_samples) = min_samples {
                    params = params.min_samples(min_samples);
                }
                Ok(params.check()?.into())
            }
            ClusteringConfig::KMeans {
                n_clusters,
                seed,
                n_runs,
                max_n_iterations,
                tolerance,
                init,
            } => {
                let rng = match seed {
                    Some(seed) => Xoshiro256Plus::seed_from_u64(seed),
                    None => Xoshiro256Plus::from_entropy(),
                };
                let mut params = KMeans::params_with_rng(n_clusters, rng);
                if let Some(n_runs) = n_runs {
                    params = params.n_runs(n_runs);
                }
                if let Some(max_n_iterations) = max_n_iterations {
                    params = params.max_n_iterations(max_n_iterations);
                }
                if let Some(tolerance) = tolerance {
                    params = params.tolerance(tolerance);
                }
                if let Some(init) = init {
                    params = params.init_method(init);
                }
                Ok(params.check()?.into())
            }
        }
    }
}
