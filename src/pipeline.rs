//! End to end segmentation pipeline
//!
//! The pipeline runs in two steps. [`PipelineValidParams::prepare`] takes the decoded interval
//! records, builds the sample store, resamples it and extracts the interval features. The resulting [`PreparedData`] is immutable and can be used for any number of
//! [`PreparedData::run`] calls, each one clustering a single feature representation with the given
//! strategy and producing labels, segments and chart inputs of its own.
use std::collections::BTreeSet;

use chrono::{Duration, NaiveDateTime};
use ndarray::Array1;

use crate::chart::{self, EmbeddingPoint, ScatterPoint};
use crate::dataset::{Float, IntervalRecord, Records, SampleStore, TimeSeries};
use crate::error::{Error, Result};
use crate::features::{FeatureExtractor, IntervalFeatures, Representation};
use crate::mapping::IntervalClusterMapper;
use crate::param_guard::ParamGuard;
use crate::resample::ResampleValidParams;
use crate::segment::{Segment, SegmentSampler};
use crate::traits::{Clusterer, Projector, Transformer};

/// Verified pipeline parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineValidParams {
    resample: ResampleValidParams,
    interval: Duration,
}

impl PipelineValidParams {
    /// Width of a bucket of the resampled series
    pub fn window(&self) -> Duration {
        self.resample.window()
    }

    /// Length of a coarse interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Build the store, resample it and extract interval features
    ///
    /// Fails with `Error::ShapeMismatch` before any aggregation if two count vectors differ in
    /// width.
    pub fn prepare<F: Float>(&self, intervals: &[IntervalRecord<F>]) -> Result<PreparedData<F>> {
        let store = SampleStore::from_intervals(intervals)?;
        let series: TimeSeries<F> = self.resample.transform(&store)?;
        let features = FeatureExtractor::extract(intervals)?;

        log::debug!(
            "prepared {} intervals: {} unique samples, {} buckets",
            intervals.len(),
            store.nsamples(),
            series.len()
        );

        Ok(PreparedData {
            series,
            features,
            interval: self.interval,
        })
    }
}

/// Helper struct for building a set of [pipeline parameters](PipelineValidParams)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineParams(PipelineValidParams);

impl Default for PipelineParams {
    fn default() -> Self {
        PipelineParams(PipelineValidParams {
            resample: ResampleValidParams::unchecked(Duration::minutes(1)),
            interval: Duration::minutes(30),
        })
    }
}

impl PipelineParams {
    /// Set the bucket width of the resampled series
    pub fn window(mut self, window: Duration) -> Self {
        self.0.resample = ResampleValidParams::unchecked(window);
        self
    }

    /// Set the length of a coarse interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.0.interval = interval;
        self
    }
}

impl ParamGuard for PipelineParams {
    type Checked = PipelineValidParams;
    type Error = Error;

    fn check_ref(&self) -> Result<&Self::Checked> {
        self.0.resample.validate()?;
        if self.0.interval <= Duration::zero() {
            Err(Error::Parameters(format!(
                "interval must be positive, got {}",
                self.0.interval
            )))
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

/// The complete segmentation pipeline
///
/// ```
/// use chrono::{Duration, NaiveDate};
/// use ndarray::{array, Array1, ArrayView2};
/// use trafficseg::dataset::{IntervalRecord, Sample};
/// use trafficseg::features::Representation;
/// use trafficseg::param_guard::ParamGuard;
/// use trafficseg::pipeline::Pipeline;
/// use trafficseg::traits::{Clusterer, Projector};
/// use trafficseg::Result;
///
/// // assigns every interval to cluster 0
/// struct Single;
///
/// impl Clusterer<f64> for Single {
///     fn fit_predict(&self, records: ArrayView2<f64>) -> Result<Array1<Option<usize>>> {
///         Ok(Array1::from_elem(records.nrows(), Some(0)))
///     }
/// }
///
/// impl Projector<f64> for Single {
///     fn project(&self, records: ArrayView2<f64>) -> Result<ndarray::Array2<f64>> {
///         Ok(ndarray::Array2::zeros((records.nrows(), 2)))
///     }
/// }
///
/// let t0 = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let samples = (0..10)
///     .map(|i| Sample::new(t0 + Duration::minutes(i), array![1., 2.]))
///     .collect();
///
/// let prepared = Pipeline::params()
///     .check()
///     .unwrap()
///     .prepare(&[IntervalRecord::new(t0, samples)])
///     .unwrap();
/// let run = prepared.run(Representation::Mean, &Single, &Single).unwrap();
///
/// assert_eq!(run.series.len(), 10);
/// assert_eq!(run.segments.len(), 1);
/// ```
pub struct Pipeline;

impl Pipeline {
    /// Pipeline parameters with one minute buckets and thirty minute intervals
    pub fn params() -> PipelineParams {
        PipelineParams::default()
    }
}

/// Resampled series and interval features shared by all clustering runs
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedData<F> {
    series: TimeSeries<F>,
    features: IntervalFeatures<F>,
    interval: Duration,
}

impl<F: Float> PreparedData<F> {
    /// The unlabeled resampled series
    pub fn series(&self) -> &TimeSeries<F> {
        &self.series
    }

    pub fn features(&self) -> &IntervalFeatures<F> {
        &self.features
    }

    /// Cluster one feature representation and derive everything that depends on its labels
    ///
    /// A clustering failure fails the run. A projection failure does not: it is kept in
    /// [`ClusteringRun::embedding`] while labels, segments and scatter points stay usable.
    pub fn run(
        &self,
        representation: Representation,
        clusterer: &dyn Clusterer<F>,
        projector: &dyn Projector<F>,
    ) -> Result<ClusteringRun<F>> {
        let features = self.features.get(representation);
        let labels = clusterer.fit_predict(features.records())?;

        let intervals =
            IntervalClusterMapper::intervals(features.starts(), labels.view(), self.interval)?;
        let mut series = self.series.clone();
        IntervalClusterMapper::apply(&mut series, &intervals);
        let series = series.retain_labeled();

        let segments: Vec<Segment> = SegmentSampler.transform(&series);
        let scatter = chart::scatter(&series);
        let representatives = SegmentSampler::representatives(&series, &segments);
        let embedding = projector
            .project(representatives.view())
            .and_then(|projection| chart::embedding(&series, &segments, projection.view()));
        if let Err(err) = &embedding {
            log::warn!("embedding of {} failed: {}", representation, err);
        }

        let run = ClusteringRun {
            representation,
            starts: features.starts().to_vec(),
            labels,
            series,
            segments,
            scatter,
            embedding,
        };
        log::info!(
            "{}: {} intervals in {} clusters, {} labeled buckets in {} segments",
            representation,
            run.starts.len(),
            run.n_clusters(),
            run.series.len(),
            run.segments.len()
        );

        Ok(run)
    }
}

/// Outputs of a single clustering run
#[derive(Debug, Clone)]
pub struct ClusteringRun<F> {
    pub representation: Representation,
    /// Starts of the clustered intervals, aligned with `labels`
    pub starts: Vec<NaiveDateTime>,
    /// One label per clustered interval
    pub labels: Array1<Option<usize>>,
    /// Buckets which received a cluster label, noise is removed
    pub series: TimeSeries<F>,
    pub segments: Vec<Segment>,
    pub scatter: Vec<ScatterPoint<F>>,
    pub embedding: Result<Vec<EmbeddingPoint<F>>>,
}

impl<F> ClusteringRun<F> {
    /// Number of distinct clusters among the interval labels
    pub fn n_clusters(&self) -> usize {
        self.labels
            .iter()
            .filter_map(|label| *label)
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Number of intervals labeled as noise
    pub fn n_noise(&self) -> usize {
        self.labels.iter().filter(|label| label.is_none()).count()
    }
}
