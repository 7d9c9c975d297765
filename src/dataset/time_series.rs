use chrono::NaiveDateTime;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use super::{Float, Records};
use crate::error::{Error, Result};

/// One row of a resampled series
///
/// A bucket is a read-only view into a [`TimeSeries`]: its vector borrows the row of the record
/// matrix and `cluster_label` is `None` until labels were mapped onto the series.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket<'a, F> {
    pub timestamp: NaiveDateTime,
    pub vector: ArrayView1<'a, F>,
    pub cluster_label: Option<usize>,
}

impl<'a, F: Float> Bucket<'a, F> {
    /// Arithmetic mean over all lanes of this bucket
    pub fn mean(&self) -> F {
        self.vector.mean().unwrap_or_else(F::zero)
    }

    /// Whether every lane count of this bucket is zero
    pub fn is_all_zero(&self) -> bool {
        self.vector.iter().all(|x| x.is_zero())
    }
}

/// A regular, time ordered series of buckets
///
/// The series is stored column-wise: `timestamps` holds the window start of every bucket,
/// `records` is a matrix with shape `(n_buckets, n_lanes)` and `labels` holds the cluster label of
/// every bucket. Timestamps are strictly increasing but not necessarily contiguous, windows
/// without samples are simply absent.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries<F> {
    timestamps: Vec<NaiveDateTime>,
    records: Array2<F>,
    labels: Array1<Option<usize>>,
}

impl<F: Float> TimeSeries<F> {
    /// Create an unlabeled series from timestamps and matching rows
    pub fn new(timestamps: Vec<NaiveDateTime>, records: Array2<F>) -> Result<Self> {
        if timestamps.len() != records.nrows() {
            return Err(Error::ShapeMismatch {
                expected: timestamps.len(),
                found: records.nrows(),
            });
        }
        let labels = Array1::from_elem(timestamps.len(), None);

        Ok(TimeSeries {
            timestamps,
            records,
            labels,
        })
    }

    /// Replace the label column
    pub fn with_labels(mut self, labels: Array1<Option<usize>>) -> Result<Self> {
        if labels.len() != self.len() {
            return Err(Error::ShapeMismatch {
                expected: self.len(),
                found: labels.len(),
            });
        }
        self.labels = labels;

        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn records(&self) -> ArrayView2<F> {
        self.records.view()
    }

    pub fn labels(&self) -> ArrayView1<Option<usize>> {
        self.labels.view()
    }

    pub(crate) fn set_label(&mut self, idx: usize, label: Option<usize>) {
        self.labels[idx] = label;
    }

    /// Return the bucket at position `idx`
    ///
    /// **Panics** if `idx` is out of bounds.
    pub fn bucket(&self, idx: usize) -> Bucket<F> {
        Bucket {
            timestamp: self.timestamps[idx],
            vector: self.records.row(idx),
            cluster_label: self.labels[idx],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Bucket<F>> {
        (0..self.len()).map(move |idx| self.bucket(idx))
    }

    /// Keep the buckets selected by `indices`, in the given order
    pub fn select(&self, indices: &[usize]) -> Self {
        TimeSeries {
            timestamps: indices.iter().map(|&i| self.timestamps[i]).collect(),
            records: self.records.select(Axis(0), indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    /// Drop every bucket which still carries the noise label
    pub fn retain_labeled(&self) -> Self {
        let indices = self
            .labels
            .iter()
            .enumerate()
            .filter(|(_, label)| label.is_some())
            .map(|(i, _)| i)
            .collect::<Vec<_>>();

        self.select(&indices)
    }
}

impl<F> Records for TimeSeries<F> {
    type Elem = F;

    fn nsamples(&self) -> usize {
        self.records.nrows()
    }

    fn nfeatures(&self) -> usize {
        self.records.ncols()
    }
}
