//! Feature extraction from coarse intervals
//!
//! Every interval is summarised in two alternative ways which are clustered independently:
//!
//! * the **mean vector**, the element-wise mean of all lane count vectors observed in the
//!   interval;
//! * the **concatenated vector**, all lane count vectors of the interval laid end to end in time
//!   order, which keeps the sequence detail the mean throws away.
//!
//! Intervals without samples are not data points and are left out of both feature matrices.
use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDateTime;
use ndarray::{Array1, Array2, ArrayView2};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::dataset::{Float, IntervalRecord, Records, Sample};
use crate::error::{Error, Result};

/// Selects one of the two feature representations of an interval
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Representation {
    Mean,
    Concatenated,
}

impl Representation {
    pub const ALL: [Representation; 2] = [Representation::Mean, Representation::Concatenated];

    /// Short name used in file names and log messages
    pub fn name(&self) -> &'static str {
        match self {
            Representation::Mean => "AverageValues",
            Representation::Concatenated => "ConcatenatedValues",
        }
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Representation::Mean => write!(f, "average values"),
            Representation::Concatenated => write!(f, "concatenated values"),
        }
    }
}

/// Feature matrix of one representation
///
/// Row `i` of `records` belongs to the interval starting at `starts[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix<F> {
    starts: Vec<NaiveDateTime>,
    records: Array2<F>,
}

impl<F: Float> FeatureMatrix<F> {
    fn from_rows(starts: Vec<NaiveDateTime>, rows: Vec<Array1<F>>, width: usize) -> Result<Self> {
        let mut flat = Vec::with_capacity(rows.len() * width);
        for row in rows {
            flat.extend(row.into_iter());
        }
        let records = Array2::from_shape_vec((starts.len(), width), flat)?;

        Ok(FeatureMatrix { starts, records })
    }

    /// Start timestamps of the intervals, one per row
    pub fn starts(&self) -> &[NaiveDateTime] {
        &self.starts
    }

    pub fn records(&self) -> ArrayView2<F> {
        self.records.view()
    }
}

impl<F> Records for FeatureMatrix<F> {
    type Elem = F;

    fn nsamples(&self) -> usize {
        self.records.nrows()
    }

    fn nfeatures(&self) -> usize {
        self.records.ncols()
    }
}

/// Both feature representations of a set of intervals
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalFeatures<F> {
    mean: FeatureMatrix<F>,
    concatenated: FeatureMatrix<F>,
}

impl<F> IntervalFeatures<F> {
    pub fn get(&self, representation: Representation) -> &FeatureMatrix<F> {
        match representation {
            Representation::Mean => &self.mean,
            Representation::Concatenated => &self.concatenated,
        }
    }

    pub fn mean(&self) -> &FeatureMatrix<F> {
        &self.mean
    }

    pub fn concatenated(&self) -> &FeatureMatrix<F> {
        &self.concatenated
    }
}

/// Derives the clustering input of every interval
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Mean and concatenated vector of the samples of a single interval
    ///
    /// Samples are put in time order before concatenation. Returns `None` for an interval without
    /// samples and fails with `Error::ShapeMismatch` if the sample vectors differ in width.
    pub fn extract_interval<F: Float>(
        samples: &[Sample<F>],
    ) -> Result<Option<(Array1<F>, Array1<F>)>> {
        let first = match samples.first() {
            Some(sample) => sample,
            None => return Ok(None),
        };
        let width = first.vector.len();

        let mut ordered = samples.iter().collect::<Vec<_>>();
        ordered.sort_by_key(|sample| sample.timestamp);

        let mut mean = Array1::zeros(width);
        let mut concatenated = Vec::with_capacity(width * samples.len());
        for sample in ordered {
            if sample.vector.len() != width {
                return Err(Error::ShapeMismatch {
                    expected: width,
                    found: sample.vector.len(),
                });
            }
            mean += &sample.vector;
            concatenated.extend(sample.vector.iter().cloned());
        }
        mean /= F::cast(samples.len());

        Ok(Some((mean, Array1::from(concatenated))))
    }

    /// Feature matrices for all intervals
    ///
    /// Intervals without samples are dropped from both matrices. Concatenated vectors only share a
    /// matrix if they have the same length, therefore the concatenated matrix keeps the intervals
    /// whose sample count is the most common one (the larger count on a tie) and drops the others.
    pub fn extract<F: Float>(intervals: &[IntervalRecord<F>]) -> Result<IntervalFeatures<F>> {
        let mut width = None;
        let mut extracted = Vec::with_capacity(intervals.len());
        for interval in intervals {
            let (mean, concatenated) = match Self::extract_interval(&interval.samples)? {
                Some(features) => features,
                None => {
                    log::warn!("interval {} has no samples, skipping it", interval.start);
                    continue;
                }
            };
            match width {
                Some(width) if width != mean.len() => {
                    return Err(Error::ShapeMismatch {
                        expected: width,
                        found: mean.len(),
                    })
                }
                _ => width = Some(mean.len()),
            }
            extracted.push((interval.start, mean, concatenated));
        }
        let width = width.unwrap_or(0);

        let concat_len = modal_length(extracted.iter().map(|(_, _, c)| c.len()));
        let mut mean_starts = Vec::with_capacity(extracted.len());
        let mut mean_rows = Vec::with_capacity(extracted.len());
        let mut concat_starts = Vec::with_capacity(extracted.len());
        let mut concat_rows = Vec::with_capacity(extracted.len());
        for (start, mean, concatenated) in extracted {
            mean_starts.push(start);
            mean_rows.push(mean);
            if concatenated.len() == concat_len {
                concat_starts.push(start);
                concat_rows.push(concatenated);
            } else {
                log::warn!(
                    "interval {} holds {} values instead of {}, leaving it out of the concatenated features",
                    start,
                    concatenated.len(),
                    concat_len
                );
            }
        }
        log::debug!(
            "extracted features of {} intervals ({} with concatenated features)",
            mean_rows.len(),
            concat_rows.len()
        );

        Ok(IntervalFeatures {
            mean: FeatureMatrix::from_rows(mean_starts, mean_rows, width)?,
            concatenated: FeatureMatrix::from_rows(concat_starts, concat_rows, concat_len)?,
        })
    }
}

/// Most frequent value, ties resolved to the larger value, zero for an empty iterator
fn modal_length(lengths: impl Iterator<Item = usize>) -> usize {
    let mut counts = HashMap::new();
    for len in lengths {
        *counts.entry(len).or_insert(0usize) += 1;
    }

    counts
        .into_iter()
        .max_by_key(|&(len, count)| (count, len))
        .map(|(len, _)| len)
        .unwrap_or(0)
}
