//! `trafficseg` turns irregular, timestamped multi-lane traffic counts into labeled time segments
//! and a two dimensional projection of those segments.
//!
//! ## Pipeline
//!
//! Raw samples arrive grouped in coarse intervals. They are
//!
//! * deduplicated in a [`SampleStore`](dataset::SampleStore),
//! * resampled into fixed-width buckets by the [`Resampler`](resample::Resampler),
//! * summarised per interval by the [`FeatureExtractor`](features::FeatureExtractor),
//! * clustered per interval by any [`Clusterer`](traits::Clusterer),
//! * mapped back onto the buckets by the [`IntervalClusterMapper`](mapping::IntervalClusterMapper),
//! * collapsed into segments by the [`SegmentSampler`](segment::SegmentSampler),
//! * and projected into the plane by any [`Projector`](traits::Projector).
//!
//! The [`pipeline`] module wires these steps together. Concrete clustering and projection
//! algorithms live in the `trafficseg-clustering` and `trafficseg-umap` crates, the strict input
//! decoder in `trafficseg-datasets`.
//!
//! Cluster labels are `Option<usize>` throughout, `None` marks noise or an unassigned bucket.

pub mod chart;
pub mod dataset;
pub mod error;
pub mod features;
pub mod mapping;
pub mod param_guard;
pub mod pipeline;
pub mod prelude;
pub mod resample;
pub mod segment;
pub mod traits;

pub use dataset::{Float, IntervalRecord, Sample, SampleStore, TimeSeries};
pub use error::{Error, Result};
pub use param_guard::ParamGuard;
