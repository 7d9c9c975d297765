//! Inputs for the scatter and embedding charts of a clustering run
//!
//! Rendering happens elsewhere, this module only assembles the points.
use chrono::NaiveDateTime;
use ndarray::ArrayView2;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::dataset::{Float, TimeSeries};
use crate::error::{Error, Result};
use crate::segment::Segment;

/// Average traffic of a single bucket over time
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPoint<F> {
    pub timestamp: NaiveDateTime,
    pub value: F,
    pub label: Option<usize>,
}

/// Position of a segment representative in the projected plane
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingPoint<F> {
    pub x: F,
    pub y: F,
    pub label: Option<usize>,
    pub timestamp: NaiveDateTime,
}

/// Scatter points of all buckets of `series`
///
/// Buckets whose vector is all zero carry no traffic and are left out.
pub fn scatter<F: Float>(series: &TimeSeries<F>) -> Vec<ScatterPoint<F>> {
    series
        .iter()
        .filter(|bucket| !bucket.is_all_zero())
        .map(|bucket| ScatterPoint {
            timestamp: bucket.timestamp,
            value: bucket.mean(),
            label: bucket.cluster_label,
        })
        .collect()
}

/// Pair the projected representatives with their segments
///
/// Row `i` of `projection` must hold the coordinates of the representative of `segments[i]`.
pub fn embedding<F: Float>(
    series: &TimeSeries<F>,
    segments: &[Segment],
    projection: ArrayView2<F>,
) -> Result<Vec<EmbeddingPoint<F>>> {
    if projection.nrows() != segments.len() {
        return Err(Error::ShapeMismatch {
            expected: segments.len(),
            found: projection.nrows(),
        });
    }
    if projection.ncols() != 2 {
        return Err(Error::ShapeMismatch {
            expected: 2,
            found: projection.ncols(),
        });
    }

    Ok(segments
        .iter()
        .zip(projection.outer_iter())
        .map(|(segment, point)| EmbeddingPoint {
            x: point[0],
            y: point[1],
            label: segment.label,
            timestamp: series.timestamps()[segment.representative()],
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use ndarray::array;

    fn series() -> TimeSeries<f64> {
        let t0 = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        TimeSeries::new(
            (0..3).map(|i| t0 + Duration::minutes(i)).collect(),
            array![[2.0, 4.0], [0.0, 0.0], [1.0, 0.0]],
        )
        .unwrap()
        .with_labels(array![Some(0), Some(0), Some(1)])
        .unwrap()
    }

    #[test]
    fn scatter_skips_zero_buckets() {
        let series = series();
        let points = scatter(&series);

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, 3.0);
        assert_eq!(points[1].value, 0.5);
        assert_eq!(points[1].label, Some(1));
        assert_eq!(points[1].timestamp, series.timestamps()[2]);
    }

    #[test]
    fn embedding_points_follow_segments() {
        let series = series();
        let segments = vec![
            Segment {
                label: Some(0),
                start: 0,
                len: 2,
            },
            Segment {
                label: Some(1),
                start: 2,
                len: 1,
            },
        ];

        let points = embedding(&series, &segments, array![[0.5, 1.0], [3.0, 2.0]].view()).unwrap();
        assert_eq!(points[0].timestamp, series.timestamps()[1]);
        assert_eq!(points[1].x, 3.0);
        assert_eq!(points[1].label, Some(1));

        assert!(embedding(&series, &segments, array![[0.5, 1.0]].view()).is_err());
    }
}
