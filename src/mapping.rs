//! Propagation of interval labels onto resampled buckets
//!
//! Clustering runs on coarse intervals, while the analysis happens on the fine grained buckets of
//! a [`TimeSeries`]. Every bucket receives the most frequent label of all intervals whose closed
//! range `[start, end]` contains its timestamp. Intervals may overlap, so a bucket can be covered
//! by several of them. Buckets which are not covered at all keep the noise label.
use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime};
use ndarray::ArrayView1;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::dataset::{Float, TimeSeries};
use crate::error::{Error, Result};

/// A labeled, closed time range
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub label: Option<usize>,
}

impl Interval {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, label: Option<usize>) -> Self {
        Interval { start, end, label }
    }

    /// Whether `timestamp` lies in `[start, end]`, both ends included
    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

/// Maps interval labels onto the buckets of a time series
pub struct IntervalClusterMapper;

impl IntervalClusterMapper {
    /// Pair interval starts with the labels of a clustering run
    ///
    /// Every interval spans `duration` from its start. Fails with `Error::ShapeMismatch` if the
    /// number of labels differs from the number of starts.
    pub fn intervals(
        starts: &[NaiveDateTime],
        labels: ArrayView1<Option<usize>>,
        duration: Duration,
    ) -> Result<Vec<Interval>> {
        if starts.len() != labels.len() {
            return Err(Error::ShapeMismatch {
                expected: starts.len(),
                found: labels.len(),
            });
        }

        Ok(starts
            .iter()
            .zip(labels.iter())
            .map(|(&start, &label)| Interval::new(start, start + duration, label))
            .collect())
    }

    /// Set the label of every bucket to the mode of its covering intervals
    ///
    /// Ties are broken towards the smallest label, where noise orders before every cluster. A
    /// bucket without covering interval is reset to noise. An interval ending before it starts
    /// covers nothing.
    pub fn apply<F: Float>(series: &mut TimeSeries<F>, intervals: &[Interval]) {
        let mut sorted = intervals
            .iter()
            .filter(|interval| interval.start <= interval.end)
            .copied()
            .collect::<Vec<_>>();
        sorted.sort_by_key(|interval| interval.start);
        let max_len = sorted
            .iter()
            .map(|interval| interval.end - interval.start)
            .max()
            .unwrap_or_else(Duration::zero);

        let mut matched = 0;
        for idx in 0..series.len() {
            let timestamp = series.timestamps()[idx];
            // only intervals starting in [timestamp - max_len, timestamp] can cover the bucket
            let lower = sorted.partition_point(|interval| interval.start < timestamp - max_len);
            let upper = sorted.partition_point(|interval| interval.start <= timestamp);

            let label = mode(
                sorted[lower..upper]
                    .iter()
                    .filter(|interval| interval.contains(timestamp))
                    .map(|interval| interval.label),
            );
            if label.is_some() {
                matched += 1;
            }
            series.set_label(idx, label.flatten());
        }

        log::debug!(
            "mapped {} intervals onto {} buckets, {} buckets covered",
            intervals.len(),
            series.len(),
            matched
        );
    }
}

/// Most frequent label, `None` for an empty iterator
fn mode(labels: impl Iterator<Item = Option<usize>>) -> Option<Option<usize>> {
    let mut counts = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0usize) += 1;
    }

    let mut best: Option<(Option<usize>, usize)> = None;
    for (label, count) in counts {
        match best {
            Some((_, best_count)) if best_count >= count => {}
            _ => best = Some((label, count)),
        }
    }

    best.map(|(label, _)| label)
}
