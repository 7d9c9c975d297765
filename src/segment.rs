//! Segmentation of a labeled series
//!
//! A segment is a maximal run of consecutive buckets sharing one cluster label. Segments only
//! hold positions into the series they were computed from, they do not own any data.
use std::ops::Range;

use ndarray::{Array2, Axis};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::dataset::{Float, TimeSeries};
use crate::traits::Transformer;

/// A run of same-labeled buckets starting at position `start`
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub label: Option<usize>,
    pub start: usize,
    pub len: usize,
}

impl Segment {
    /// Position of the middle bucket, `start + len / 2`
    pub fn representative(&self) -> usize {
        self.start + self.len / 2
    }

    /// Positions of all buckets of this segment
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.len
    }
}

/// Splits a labeled series into segments
///
/// ```
/// use chrono::{Duration, NaiveDate};
/// use ndarray::{array, Array2};
/// use trafficseg::dataset::TimeSeries;
/// use trafficseg::segment::SegmentSampler;
/// use trafficseg::traits::Transformer;
///
/// let t0 = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let series = TimeSeries::new(
///     (0..5).map(|i| t0 + Duration::minutes(i)).collect(),
///     Array2::<f64>::zeros((5, 1)),
/// )
/// .unwrap()
/// .with_labels(array![Some(0), Some(0), Some(1), Some(1), Some(0)])
/// .unwrap();
///
/// let segments: Vec<_> = SegmentSampler.transform(&series);
/// assert_eq!(segments.len(), 3);
/// assert_eq!(segments[1].representative(), 3);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentSampler;

impl SegmentSampler {
    /// Gather the vectors of the segment representatives, one row per segment
    pub fn representatives<F: Float>(series: &TimeSeries<F>, segments: &[Segment]) -> Array2<F> {
        let indices = segments
            .iter()
            .map(Segment::representative)
            .collect::<Vec<_>>();

        series.records().select(Axis(0), &indices)
    }
}

impl<'a, F: Float> Transformer<&'a TimeSeries<F>, Vec<Segment>> for SegmentSampler {
    fn transform(&self, series: &'a TimeSeries<F>) -> Vec<Segment> {
        let mut segments: Vec<Segment> = Vec::new();
        for (idx, label) in series.labels().iter().enumerate() {
            match segments.last_mut() {
                Some(segment) if segment.label == *label => segment.len += 1,
                _ => segments.push(Segment {
                    label: *label,
                    start: idx,
                    len: 1,
                }),
            }
        }

        log::debug!(
            "split {} buckets into {} segments",
            series.len(),
            segments.len()
        );

        segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use ndarray::{array, Array1};

    fn labeled(labels: Vec<Option<usize>>) -> TimeSeries<f64> {
        let t0: NaiveDateTime = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let n = labels.len();
        let records = Array2::from_shape_fn((n, 2), |(i, j)| (i * 2 + j) as f64);

        TimeSeries::new((0..n as i64).map(|i| t0 + Duration::minutes(i)).collect(), records)
            .unwrap()
            .with_labels(Array1::from(labels))
            .unwrap()
    }

    #[test]
    fn segments_cover_the_series_in_order() {
        let labels = vec![Some(0), Some(0), Some(2), None, None, Some(2), Some(0)];
        let series = labeled(labels.clone());

        let segments: Vec<Segment> = SegmentSampler.transform(&series);
        let flattened = segments
            .iter()
            .flat_map(|segment| segment.range().map(move |_| segment.label))
            .collect::<Vec<_>>();
        assert_eq!(flattened, labels);

        let changes = labels.windows(2).filter(|w| w[0] != w[1]).count();
        assert_eq!(segments.len(), changes + 1);
    }

    #[test]
    fn representative_is_the_middle_bucket() {
        let series = labeled(vec![Some(1); 4]);
        let segments: Vec<Segment> = SegmentSampler.transform(&series);

        assert_eq!(
            segments,
            vec![Segment {
                label: Some(1),
                start: 0,
                len: 4
            }]
        );
        assert_eq!(segments[0].representative(), 2);
        assert_eq!(
            SegmentSampler::representatives(&series, &segments),
            array![[4.0, 5.0]]
        );
    }

    #[test]
    fn empty_series_has_no_segments() {
        let series = labeled(vec![]);
        let segments: Vec<Segment> = SegmentSampler.transform(&series);
        assert!(segments.is_empty());
    }
}
