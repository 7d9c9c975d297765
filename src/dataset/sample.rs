use std::collections::btree_map::{self, BTreeMap};

use chrono::NaiveDateTime;
use ndarray::{Array1, ArrayView1};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use super::{Float, Records};
use crate::error::{Error, Result};

/// A single raw observation: one count per lane, taken at `timestamp`
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct Sample<F> {
    pub timestamp: NaiveDateTime,
    pub vector: Array1<F>,
}

impl<F> Sample<F> {
    pub fn new(timestamp: NaiveDateTime, vector: Array1<F>) -> Self {
        Sample { timestamp, vector }
    }
}

/// A coarse interval as delivered by the input source
///
/// Every interval carries its own ordered list of samples. Intervals may overlap, in which case
/// the same timestamp appears in several records.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalRecord<F> {
    pub start: NaiveDateTime,
    pub samples: Vec<Sample<F>>,
}

impl<F> IntervalRecord<F> {
    pub fn new(start: NaiveDateTime, samples: Vec<Sample<F>>) -> Self {
        IntervalRecord { start, samples }
    }
}

/// Deduplicated store of raw samples
///
/// Samples are indexed by their timestamp. Adding a timestamp which is already present leaves the
/// stored value untouched (first write wins). All vectors share the width of the first inserted
/// vector.
///
/// ```
/// use chrono::NaiveDate;
/// use ndarray::array;
/// use trafficseg::dataset::SampleStore;
///
/// let t0 = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
///
/// let mut store = SampleStore::new();
/// assert!(store.add(t0, array![1., 2.]).unwrap());
/// assert!(!store.add(t0, array![5., 5.]).unwrap());
/// assert!(store.add(t0, array![1., 2., 3.]).is_err());
///
/// assert_eq!(store.all()[0].vector, array![1., 2.]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SampleStore<F> {
    samples: BTreeMap<NaiveDateTime, Array1<F>>,
    width: Option<usize>,
}

impl<F> Default for SampleStore<F> {
    fn default() -> Self {
        SampleStore {
            samples: BTreeMap::new(),
            width: None,
        }
    }
}

impl<F: Float> SampleStore<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill a store from decoded intervals, visiting intervals and their samples in input order
    pub fn from_intervals(records: &[IntervalRecord<F>]) -> Result<Self> {
        let mut store = Self::new();
        for sample in records.iter().flat_map(|record| record.samples.iter()) {
            store.add(sample.timestamp, sample.vector.clone())?;
        }

        Ok(store)
    }

    /// Insert a sample unless its timestamp is already present
    ///
    /// Returns `true` when the sample was stored. Fails with `Error::ShapeMismatch` when the
    /// vector width differs from the width of the store, even for duplicate timestamps.
    pub fn add(&mut self, timestamp: NaiveDateTime, vector: Array1<F>) -> Result<bool> {
        match self.width {
            Some(width) if width != vector.len() => {
                return Err(Error::ShapeMismatch {
                    expected: width,
                    found: vector.len(),
                })
            }
            Some(_) => {}
            None => self.width = Some(vector.len()),
        }

        match self.samples.entry(timestamp) {
            btree_map::Entry::Occupied(_) => Ok(false),
            btree_map::Entry::Vacant(entry) => {
                entry.insert(vector);
                Ok(true)
            }
        }
    }

    /// Look up the vector stored for `timestamp`
    pub fn get(&self, timestamp: &NaiveDateTime) -> Option<ArrayView1<F>> {
        self.samples.get(timestamp).map(|x| x.view())
    }

    /// All samples, sorted by timestamp
    pub fn all(&self) -> Vec<Sample<F>> {
        self.samples
            .iter()
            .map(|(timestamp, vector)| Sample::new(*timestamp, vector.clone()))
            .collect()
    }

    /// Iterate over the samples in timestamp order without copying them
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, ArrayView1<F>)> {
        self.samples.iter().map(|(t, v)| (*t, v.view()))
    }

    /// Width shared by all vectors, `None` for an empty store
    pub fn width(&self) -> Option<usize> {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl<F> Records for SampleStore<F> {
    type Elem = F;

    fn nsamples(&self) -> usize {
        self.samples.len()
    }

    fn nfeatures(&self) -> usize {
        self.width.unwrap_or(0)
    }
}
