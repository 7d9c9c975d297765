//! trafficseg prelude.
//!
//! This module contains the most used types, type aliases, traits and
//! functions that you can import easily as a group.
//!

#[doc(no_inline)]
pub use crate::error::{Error, Result};

#[doc(no_inline)]
pub use crate::traits::*;

#[doc(no_inline)]
pub use crate::param_guard::ParamGuard;

#[doc(no_inline)]
pub use crate::dataset::{Bucket, Float, IntervalRecord, Records, Sample, SampleStore, TimeSeries};

#[doc(no_inline)]
pub use crate::features::{FeatureExtractor, Representation};

#[doc(no_inline)]
pub use crate::mapping::{Interval, IntervalClusterMapper};

#[doc(no_inline)]
pub use crate::resample::Resampler;

#[doc(no_inline)]
pub use crate::segment::{Segment, SegmentSampler};

#[doc(no_inline)]
pub use crate::pipeline::Pipeline;
