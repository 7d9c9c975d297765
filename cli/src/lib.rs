//! Command line driver of the traffic segmentation pipeline
//!
//! [`run`] prepares a dataset once and executes every configured clustering run on it. Each run
//! writes its labels, scatter points and embedding points as CSV files named after the run, e.g.
//! `Clusters_KMeans_5clusters_AverageValues.csv`.
use std::path::Path;

use anyhow::Result;
use ndarray::ArrayView2;
use trafficseg::features::Representation;
use trafficseg::pipeline::{ClusteringRun, PreparedData};
use trafficseg::IntervalRecord;
use trafficseg_clustering::{ClusteringEngine, SilhouetteScore, WithDistance};
use trafficseg_nn::distance::{CosineDist, L2Dist};

pub mod config;
pub mod output;

use config::Config;
use output::RunFiles;

/// Figures of a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub name: String,
    pub n_intervals: usize,
    pub n_clusters: usize,
    pub n_noise: usize,
    pub n_segments: usize,
    /// Silhouette score of the interval labels, if it could be computed
    pub silhouette: Option<f64>,
    /// Whether the embedding file was written
    pub embedding: bool,
}

/// Result of one clustering run
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(RunSummary),
    Failed { name: String, reason: String },
}

impl RunOutcome {
    pub fn name(&self) -> &str {
        match self {
            RunOutcome::Completed(summary) => &summary.name,
            RunOutcome::Failed { name, .. } => name,
        }
    }
}

/// Execute every run of `config` on `intervals` and write the output files into `out_dir`
///
/// Invalid settings and unusable data fail the whole call. A failing clustering only fails its
/// own run, which is reported as [`RunOutcome::Failed`] while the remaining runs go on.
pub fn run(
    config: &Config,
    intervals: &[IntervalRecord<f64>],
    out_dir: &Path,
) -> Result<Vec<RunOutcome>> {
    let prepared = config.pipeline()?.prepare(intervals)?;
    let projector = config.embedding.projector()?;
    std::fs::create_dir_all(out_dir)?;

    let mut outcomes = Vec::new();
    for run_config in &config.runs {
        let engine = run_config.clustering.engine()?;
        log::info!("running {}", engine);

        for &representation in &run_config.representations {
            let name = format!("{}_{}", engine.name(), representation.name());
            let outcome = match prepared.run(representation, &engine, &projector) {
                Ok(run) => {
                    let files = RunFiles::new(out_dir, &name);
                    let embedding = write_run(&run, &files)?;
                    let silhouette = silhouette(&engine, &prepared, representation, &run);
                    let summary = RunSummary {
                        name,
                        n_intervals: run.labels.len(),
                        n_clusters: run.n_clusters(),
                        n_noise: run.n_noise(),
                        n_segments: run.segments.len(),
                        silhouette,
                        embedding,
                    };
                    log::info!(
                        "{}: {} clusters, {} noise intervals, silhouette {}",
                        summary.name,
                        summary.n_clusters,
                        summary.n_noise,
                        summary
                            .silhouette
                            .map_or_else(|| "n/a".to_string(), |score| format!("{:.3}", score))
                    );
                    RunOutcome::Completed(summary)
                }
                Err(err) => {
                    log::error!("{} failed: {}", name, err);
                    RunOutcome::Failed {
                        name,
                        reason: err.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }
    }

    Ok(outcomes)
}

/// Write the files of a run, returns whether an embedding was available
///
/// Without embedding, an embedding file left by an earlier invocation is removed.
fn write_run(run: &ClusteringRun<f64>, files: &RunFiles) -> Result<bool> {
    let labels = run.labels.to_vec();
    output::write_labels(output::create(&files.clusters)?, &labels)?;
    output::write_scatter(output::create(&files.scatter)?, &run.scatter)?;

    match &run.embedding {
        Ok(points) => {
            output::write_embedding(output::create(&files.embedding)?, points)?;
            Ok(true)
        }
        Err(_) => {
            output::remove_stale(&files.embedding)?;
            Ok(false)
        }
    }
}

/// Silhouette of the interval labels under the metric of the clustering strategy
fn silhouette(
    engine: &ClusteringEngine<f64>,
    prepared: &PreparedData<f64>,
    representation: Representation,
    run: &ClusteringRun<f64>,
) -> Option<f64> {
    let records: ArrayView2<f64> = prepared.features().get(representation).records();
    let score = match engine {
        ClusteringEngine::Density(_) => {
            WithDistance::new(&records, CosineDist).silhouette_score(run.labels.view())
        }
        ClusteringEngine::Centroid(_) => {
            WithDistance::new(&records, L2Dist).silhouette_score(run.labels.view())
        }
    };

    match score {
        Ok(score) => Some(score),
        Err(err) => {
            log::warn!("no silhouette score for {}: {}", representation, err);
            None
        }
    }
}
