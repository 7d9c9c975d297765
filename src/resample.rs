//! Resampling of raw samples into fixed-width buckets
//!
//! The time axis is cut into consecutive, non-overlapping windows aligned to the Unix epoch.
//! Every window holding at least one sample becomes a bucket whose vector is the element-wise
//! mean of the samples in the window. Windows without samples produce no bucket at all, the
//! resulting series may therefore have gaps.
use chrono::{Duration, NaiveDateTime, Timelike};
use ndarray::{Array1, Array2};

use crate::dataset::{Float, Records, SampleStore, TimeSeries};
use crate::error::{Error, Result};
use crate::param_guard::{ParamGuard, TransformGuard};
use crate::traits::Transformer;

/// Verified resampling parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResampleValidParams {
    window: Duration,
}

impl ResampleValidParams {
    pub(crate) fn unchecked(window: Duration) -> Self {
        ResampleValidParams { window }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let window = self.window;
        if window.num_seconds() <= 0 {
            Err(Error::Parameters(format!(
                "window must be at least one second, got {}",
                window
            )))
        } else if window != Duration::seconds(window.num_seconds()) {
            Err(Error::Parameters(format!(
                "window must be a whole number of seconds, got {}",
                window
            )))
        } else {
            Ok(())
        }
    }

    /// Width of a single bucket
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Start of the window containing `timestamp`, always on a whole second
    pub fn window_start(&self, timestamp: NaiveDateTime) -> NaiveDateTime {
        let width = self.window.num_seconds();
        let offset = timestamp.and_utc().timestamp().rem_euclid(width);
        let nanos = i64::from(timestamp.nanosecond());

        timestamp - Duration::seconds(offset) - Duration::nanoseconds(nanos)
    }
}

/// Helper struct for building a set of [resampling parameters](ResampleValidParams)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResampleParams(ResampleValidParams);

impl Default for ResampleParams {
    fn default() -> Self {
        ResampleParams(ResampleValidParams::unchecked(Duration::minutes(1)))
    }
}

impl ResampleParams {
    /// Set the bucket width, must be a positive whole number of seconds
    pub fn window(mut self, window: Duration) -> Self {
        self.0.window = window;
        self
    }
}

impl ParamGuard for ResampleParams {
    type Checked = ResampleValidParams;
    type Error = Error;

    fn check_ref(&self) -> Result<&Self::Checked> {
        self.0.validate()?;
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl TransformGuard for ResampleParams {}

/// Resamples a [`SampleStore`] into a [`TimeSeries`]
///
/// Unchecked [`ResampleParams`] check themselves on `transform`.
///
/// ```
/// use chrono::{Duration, NaiveDate};
/// use ndarray::array;
/// use trafficseg::dataset::SampleStore;
/// use trafficseg::resample::Resampler;
/// use trafficseg::traits::Transformer;
///
/// let t0 = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(0, 0, 10).unwrap();
///
/// let mut store = SampleStore::new();
/// store.add(t0, array![1., 4.]).unwrap();
/// store.add(t0 + Duration::seconds(20), array![3., 0.]).unwrap();
/// store.add(t0 + Duration::minutes(5), array![2., 2.]).unwrap();
///
/// let series: trafficseg::Result<_> = Resampler::params().transform(&store);
/// let series = series.unwrap();
/// assert_eq!(series.len(), 2);
/// assert_eq!(series.records().row(0), array![2., 2.]);
/// ```
pub struct Resampler;

impl Resampler {
    /// Resampling parameters with a window of one minute
    pub fn params() -> ResampleParams {
        ResampleParams::default()
    }
}

impl<'a, F: Float> Transformer<&'a SampleStore<F>, Result<TimeSeries<F>>> for ResampleValidParams {
    fn transform(&self, store: &'a SampleStore<F>) -> Result<TimeSeries<F>> {
        let width = store.nfeatures();
        let mut timestamps = Vec::new();
        let mut means = Vec::with_capacity(store.nsamples() * width);

        let mut current: Option<(NaiveDateTime, Array1<F>, usize)> = None;
        for (timestamp, vector) in store.iter() {
            let start = self.window_start(timestamp);
            if let Some((window, sum, count)) = current.as_mut() {
                if *window == start {
                    *sum += &vector;
                    *count += 1;
                    continue;
                }
            }
            if let Some((window, sum, count)) = current.replace((start, vector.to_owned(), 1)) {
                timestamps.push(window);
                means.extend((sum / F::cast(count)).into_iter());
            }
        }
        if let Some((window, sum, count)) = current {
            timestamps.push(window);
            means.extend((sum / F::cast(count)).into_iter());
        }

        let records = Array2::from_shape_vec((timestamps.len(), width), means)?;
        log::debug!(
            "resampled {} samples into {} buckets of {}s",
            store.nsamples(),
            timestamps.len(),
            self.window.num_seconds()
        );

        TimeSeries::new(timestamps, records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;
    use ndarray::array;

    fn t(seconds: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::seconds(seconds)
    }

    #[test]
    fn window_cannot_be_zero() {
        let res = Resampler::params().window(Duration::zero()).check();
        assert!(matches!(res, Err(Error::Parameters(_))));
    }

    #[test]
    fn window_must_be_whole_seconds() {
        let res = Resampler::params()
            .window(Duration::milliseconds(1500))
            .check();
        assert!(matches!(res, Err(Error::Parameters(_))));
    }

    #[test]
    fn windows_are_aligned_to_minutes() {
        let params = Resampler::params().check_unwrap();
        assert_eq!(params.window_start(t(59)), t(0));
        assert_eq!(params.window_start(t(60)), t(60));
        assert_eq!(params.window_start(t(61)), t(60));

        let params = Resampler::params()
            .window(Duration::minutes(30))
            .check_unwrap();
        assert_eq!(params.window_start(t(3599)), t(1800));
    }

    #[test]
    fn sub_second_samples_share_their_window() {
        let params = Resampler::params().check_unwrap();
        let early = t(61) + Duration::milliseconds(250);
        let late = t(119) + Duration::milliseconds(999);
        assert_eq!(params.window_start(early), t(60));
        assert_eq!(params.window_start(late), t(60));

        let mut store = SampleStore::new();
        store.add(early, array![1.0]).unwrap();
        store.add(late, array![3.0]).unwrap();
        let series = params.transform(&store).unwrap();
        assert_eq!(series.timestamps(), &[t(60)]);
        assert_abs_diff_eq!(series.records(), array![[2.0]]);
    }

    #[test]
    fn bucket_is_mean_of_its_window() {
        let mut store = SampleStore::new();
        store.add(t(0), array![1.0, 0.0]).unwrap();
        store.add(t(30), array![2.0, 0.0]).unwrap();
        store.add(t(59), array![6.0, 3.0]).unwrap();
        store.add(t(60), array![5.0, 5.0]).unwrap();

        let series = Resampler::params().check_unwrap().transform(&store).unwrap();
        assert_eq!(series.timestamps(), &[t(0), t(60)]);
        assert_abs_diff_eq!(series.records(), array![[3.0, 1.0], [5.0, 5.0]]);
        assert!(series.labels().iter().all(|l| l.is_none()));
    }

    #[test]
    fn empty_windows_are_omitted() {
        let mut store = SampleStore::new();
        store.add(t(0), array![1.0]).unwrap();
        store.add(t(600), array![0.0]).unwrap();

        let series = Resampler::params().check_unwrap().transform(&store).unwrap();
        assert_eq!(series.timestamps(), &[t(0), t(600)]);
        // an observed zero vector is a bucket, not a gap
        assert!(series.bucket(1).is_all_zero());
    }

    #[test]
    fn resampling_is_idempotent() {
        let mut store = SampleStore::new();
        for i in 0..200 {
            store
                .add(t(i * 7), array![(i % 5) as f64, (i % 3) as f64])
                .unwrap();
        }

        let params = Resampler::params().check_unwrap();
        let first = params.transform(&store).unwrap();
        let second = params.transform(&store).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_store_gives_empty_series() {
        let store = SampleStore::<f64>::new();
        let series = Resampler::params().check_unwrap().transform(&store).unwrap();
        assert!(series.is_empty());
    }
}
