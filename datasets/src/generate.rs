//! Utility functions for randomly generating datasets

use chrono::{Duration, NaiveDateTime};
use ndarray::{s, Array, Array1, Array2, ArrayBase, Data, Ix1, Ix2};
use ndarray_rand::{
    rand::Rng,
    rand_distr::{Distribution, Poisson, StandardNormal},
    RandomExt,
};
use trafficseg::{IntervalRecord, Sample};

/// Special case of `blobs_with_distribution` with a standard normal distribution.
pub fn blobs(
    blob_size: usize,
    blob_centroids: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    rng: &mut impl Rng,
) -> Array2<f64> {
    blobs_with_distribution(blob_size, blob_centroids, StandardNormal, rng)
}

/// Given an input matrix `blob_centroids`, with shape `(n_blobs, n_features)`,
/// generate `blob_size` data points (a "blob") around each of the blob centroids.
///
/// Rows of blob `i` occupy the range `i * blob_size..(i + 1) * blob_size` of the result.
pub fn blobs_with_distribution(
    blob_size: usize,
    blob_centroids: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    distribution: impl Distribution<f64> + Clone,
    rng: &mut impl Rng,
) -> Array2<f64> {
    let (n_centroids, n_features) = blob_centroids.dim();
    let mut blobs: Array2<f64> = Array2::zeros((n_centroids * blob_size, n_features));

    for (blob_index, blob_centroid) in blob_centroids.rows().into_iter().enumerate() {
        let blob = make_blob(blob_size, &blob_centroid, distribution.clone(), rng);

        let indexes = s![blob_index * blob_size..(blob_index + 1) * blob_size, ..];
        blobs.slice_mut(indexes).assign(&blob);
    }
    blobs
}

fn make_blob(
    blob_size: usize,
    blob_centroid: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    distribution: impl Distribution<f64>,
    rng: &mut impl Rng,
) -> Array2<f64> {
    let shape = (blob_size, blob_centroid.len());
    let origin_blob: Array2<f64> = Array::random_using(shape, distribution, rng);
    origin_blob + blob_centroid
}

/// Draw one count per lane, lane `i` following a Poisson law with mean `rates[i]`
///
/// Lanes with a non-positive rate stay empty.
pub fn poisson_counts(
    rates: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    rng: &mut impl Rng,
) -> Array1<f64> {
    rates.mapv(|rate| match Poisson::new(rate) {
        Ok(poisson) => poisson.sample(rng),
        Err(_) => 0.0,
    })
}

/// Generate consecutive traffic intervals cycling through a set of regimes
///
/// Row `r` of `regimes` holds the mean count of every lane in regime `r`. Interval `i` starts at
/// `start + i * interval`, follows regime `(i / regime_length) % n_regimes` and holds one sample
/// every `step`, starting at the interval start and ending before the next interval begins.
///
/// ```
/// use chrono::{Duration, NaiveDate};
/// use ndarray::array;
/// use ndarray_rand::rand::SeedableRng;
/// use rand_xoshiro::Xoshiro256Plus;
/// use trafficseg_datasets::generate::traffic_intervals;
///
/// let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let mut rng = Xoshiro256Plus::seed_from_u64(3);
///
/// let intervals = traffic_intervals(
///     start,
///     &array![[12., 1.], [1., 12.]],
///     8,
///     2,
///     Duration::minutes(30),
///     Duration::seconds(20),
///     &mut rng,
/// );
///
/// assert_eq!(intervals.len(), 8);
/// assert_eq!(intervals[1].samples.len(), 90);
/// ```
#[allow(clippy::too_many_arguments)]
pub fn traffic_intervals(
    start: NaiveDateTime,
    regimes: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    n_intervals: usize,
    regime_length: usize,
    interval: Duration,
    step: Duration,
    rng: &mut impl Rng,
) -> Vec<IntervalRecord<f64>> {
    assert!(step > Duration::zero(), "sample step must be positive");
    let regime_length = regime_length.max(1);

    (0..n_intervals)
        .map(|idx| {
            let rates = regimes.row((idx / regime_length) % regimes.nrows());
            let interval_start = start + interval * idx as i32;
            let interval_end = interval_start + interval;

            let mut samples = Vec::new();
            let mut timestamp = interval_start;
            while timestamp < interval_end {
                samples.push(Sample::new(timestamp, poisson_counts(&rates, rng)));
                timestamp += step;
            }

            IntervalRecord::new(interval_start, samples)
        })
        .collect()
}
