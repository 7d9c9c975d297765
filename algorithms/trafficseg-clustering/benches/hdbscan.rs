use std::time::Duration;

use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, BenchmarkId, Criterion,
    PlotConfiguration,
};
use ndarray::Array2;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;
use trafficseg::prelude::{ParamGuard, Transformer};
use trafficseg_clustering::Hdbscan;
use trafficseg_datasets::generate;

fn hdbscan_bench(c: &mut Criterion) {
    let mut rng = Xoshiro256Plus::seed_from_u64(40);
    let cluster_sizes = vec![10, 50, 100, 250];

    let mut benchmark = c.benchmark_group("hdbscan");
    benchmark
        .sample_size(10)
        .measurement_time(Duration::from_secs(10))
        .warm_up_time(Duration::from_secs(1))
        .noise_threshold(0.05)
        .plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for cluster_size in cluster_sizes {
        let rng = &mut rng;
        benchmark.bench_with_input(
            BenchmarkId::new("hdbscan", cluster_size),
            &cluster_size,
            move |bencher, &cluster_size| {
                let min_cluster_size = 4;
                let n_features = 6;
                let centroids = Array2::random_using(
                    (min_cluster_size, n_features),
                    Uniform::new(5., 30.),
                    rng,
                );
                let dataset = generate::blobs(cluster_size, &centroids, rng);

                bencher.iter(|| {
                    black_box(
                        Hdbscan::params(min_cluster_size)
                            .check_unwrap()
                            .transform(&dataset),
                    )
                });
            },
        );
    }
    benchmark.finish()
}

criterion_group!(benches, hdbscan_bench);
criterion_main!(benches);
