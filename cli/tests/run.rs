use std::fs;
use std::path::Path;

use chrono::{Duration, NaiveDate};
use ndarray::array;
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use serde_json::json;
use trafficseg::features::Representation;
use trafficseg::IntervalRecord;
use trafficseg_cli::config::{ClusteringConfig, Config, EmbeddingConfig, RunConfig};
use trafficseg_cli::{run, RunOutcome, RunSummary};
use trafficseg_datasets::generate;

/// Sixteen half hour intervals, the regime changes every two hours
fn two_regimes() -> Vec<IntervalRecord<f64>> {
    let start = NaiveDate::from_ymd_opt(2025, 5, 2)
        .unwrap()
        .and_hms_opt(6, 0, 0)
        .unwrap();
    let mut rng = Xoshiro256Plus::seed_from_u64(5);

    generate::traffic_intervals(
        start,
        &array![[20., 2., 2.], [2., 2., 20.]],
        16,
        4,
        Duration::minutes(30),
        Duration::minutes(1),
        &mut rng,
    )
}

fn k_means(n_clusters: usize) -> ClusteringConfig {
    ClusteringConfig::KMeans {
        n_clusters,
        seed: Some(7),
        n_runs: None,
        max_n_iterations: None,
        tolerance: None,
        init: None,
    }
}

fn lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn completed(outcome: &RunOutcome) -> &RunSummary {
    match outcome {
        RunOutcome::Completed(summary) => summary,
        RunOutcome::Failed { name, reason } => panic!("{} failed: {}", name, reason),
    }
}

#[test]
fn every_run_writes_its_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        runs: vec![RunConfig::new(k_means(2))],
        ..Config::default()
    };

    let outcomes = run(&config, &two_regimes(), dir.path()).unwrap();
    assert_eq!(outcomes.len(), 2);

    for (outcome, representation) in outcomes.iter().zip(Representation::ALL.iter()) {
        let summary = completed(outcome);
        let name = format!("KMeans_2clusters_{}", representation.name());
        assert_eq!(summary.name, name);
        assert_eq!(summary.n_intervals, 16);
        assert_eq!(summary.n_clusters, 2);
        assert_eq!(summary.n_noise, 0);
        assert_eq!(summary.n_segments, 4);
        assert!(summary.silhouette.unwrap() > 0.5);

        let labels = lines(&dir.path().join(format!("Clusters_{}.csv", name)));
        assert_eq!(labels.len(), 16);
        assert!(labels.iter().all(|label| label == "0" || label == "1"));
        // the first regime lasts four intervals
        assert!(labels[..4].iter().all(|label| *label == labels[0]));
        assert_ne!(labels[0], labels[4]);

        let scatter = lines(&dir.path().join(format!("Scatter_{}.csv", name)));
        assert_eq!(scatter[0], "timestamp,value,cluster");
        assert_eq!(scatter.len(), 16 * 30 + 1);
        assert!(scatter[1].starts_with("2025-05-02 06:00:00,"));

        let embedding = dir.path().join(format!("Embedding_{}.csv", name));
        assert!(summary.embedding);
        let embedding = lines(&embedding);
        assert_eq!(embedding[0], "x,y,cluster,timestamp");
        assert_eq!(embedding.len(), summary.n_segments + 1);
    }
}

#[test]
fn failed_runs_do_not_stop_the_others() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        runs: vec![
            RunConfig {
                clustering: ClusteringConfig::Hdbscan {
                    min_cluster_size: 20,
                    min_samples: None,
                },
                representations: vec![Representation::Mean],
            },
            RunConfig {
                clustering: k_means(3),
                representations: vec![Representation::Concatenated],
            },
        ],
        ..Config::default()
    };

    let outcomes = run(&config, &two_regimes(), dir.path()).unwrap();
    assert_eq!(outcomes.len(), 2);

    assert!(matches!(&outcomes[0], RunOutcome::Failed { .. }));
    assert_eq!(outcomes[0].name(), "HDBSCAN_AverageValues");
    assert!(!dir.path().join("Clusters_HDBSCAN_AverageValues.csv").exists());

    let summary = completed(&outcomes[1]);
    assert_eq!(summary.name, "KMeans_3clusters_ConcatenatedValues");
    assert!(dir
        .path()
        .join("Clusters_KMeans_3clusters_ConcatenatedValues.csv")
        .exists());
}

#[test]
fn embedding_files_of_earlier_invocations_are_removed() {
    let dir = tempfile::tempdir().unwrap();
    let stale = dir.path().join("Embedding_KMeans_2clusters_AverageValues.csv");
    fs::write(&stale, "x,y,cluster,timestamp\n0.0,0.0,0,2025-05-02 06:00:00\n").unwrap();

    // four segments are too few for thirty neighbours
    let config = Config {
        runs: vec![RunConfig {
            clustering: k_means(2),
            representations: vec![Representation::Mean],
        }],
        embedding: EmbeddingConfig {
            n_neighbors: 30,
            ..EmbeddingConfig::default()
        },
        ..Config::default()
    };

    let outcomes = run(&config, &two_regimes(), dir.path()).unwrap();
    let summary = completed(&outcomes[0]);
    assert_eq!(summary.n_segments, 4);
    assert!(!summary.embedding);
    assert!(!stale.exists());
    assert!(dir
        .path()
        .join("Clusters_KMeans_2clusters_AverageValues.csv")
        .exists());
}

#[test]
fn json_documents_and_configs_drive_a_run() {
    let dir = tempfile::tempdir().unwrap();

    let values = |hour: u32, minute: u32, vehicles: [[u32; 2]; 1]| {
        (0..3)
            .map(|i| {
                json!({
                    "timestamp": format!("2025-01-01 {:02}:{:02}:00", hour, minute + i * 10),
                    "vehicles": vehicles,
                })
            })
            .collect::<Vec<_>>()
    };
    let document = json!({
        "data": [
            { "starttime": "2025-01-01 00:00:00", "values": values(0, 0, [[10, 0]]) },
            { "starttime": "2025-01-01 00:30:00", "values": values(0, 30, [[0, 10]]) },
            { "starttime": "2025-01-01 01:00:00", "values": values(1, 0, [[10, 0]]) },
            { "starttime": "2025-01-01 01:30:00", "values": values(1, 30, [[0, 10]]) },
        ]
    });
    let input = dir.path().join("counts.json");
    fs::write(&input, document.to_string()).unwrap();

    let config = json!({
        "runs": [
            { "clustering": { "strategy": "k_means", "n_clusters": 2, "seed": 1 },
              "representations": ["Mean"] }
        ]
    });
    let config_path = dir.path().join("config.json");
    fs::write(&config_path, config.to_string()).unwrap();

    let dataset = trafficseg_datasets::from_path(&input).unwrap();
    let config = Config::from_path(&config_path).unwrap();
    let out = dir.path().join("out");
    let outcomes = run(&config, dataset.intervals(), &out).unwrap();

    let summary = completed(&outcomes[0]);
    assert_eq!(summary.n_clusters, 2);
    assert_eq!(summary.n_segments, 4);

    let labels = lines(&out.join("Clusters_KMeans_2clusters_AverageValues.csv"));
    assert_eq!(labels.len(), 4);
    assert_eq!(labels[0], labels[2]);
    assert_eq!(labels[1], labels[3]);
    assert_ne!(labels[0], labels[1]);

    let mut broken = fs::File::create(dir.path().join("broken.json")).unwrap();
    std::io::Write::write_all(&mut broken, b"{\"window\": 60}").unwrap();
    assert!(Config::from_path(dir.path().join("broken.json")).is_err());
}
