//! CSV files written per clustering run
//!
//! Noise and unassigned labels are written as `-1`, timestamps as `YYYY-MM-DD HH:MM:SS`.
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use trafficseg::chart::{EmbeddingPoint, ScatterPoint};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// External form of a cluster label
pub fn label_code(label: Option<usize>) -> i64 {
    label.map_or(-1, |label| label as i64)
}

fn timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Serialize)]
struct ScatterRow {
    timestamp: String,
    value: f64,
    cluster: i64,
}

#[derive(Debug, Serialize)]
struct EmbeddingRow {
    x: f64,
    y: f64,
    cluster: i64,
    timestamp: String,
}

/// One label per line, in interval order, without header
pub fn write_labels<W: Write>(writer: W, labels: &[Option<usize>]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    for label in labels {
        writer.write_record(&[label_code(*label).to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_scatter<W: Write>(writer: W, points: &[ScatterPoint<f64>]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for point in points {
        writer.serialize(ScatterRow {
            timestamp: timestamp(point.timestamp),
            value: point.value,
            cluster: label_code(point.label),
        })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_embedding<W: Write>(writer: W, points: &[EmbeddingPoint<f64>]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for point in points {
        writer.serialize(EmbeddingRow {
            x: point.x,
            y: point.y,
            cluster: label_code(point.label),
            timestamp: timestamp(point.timestamp),
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Paths of the files of the run `name` inside `dir`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFiles {
    pub clusters: PathBuf,
    pub scatter: PathBuf,
    pub embedding: PathBuf,
}

impl RunFiles {
    pub fn new(dir: &Path, name: &str) -> Self {
        RunFiles {
            clusters: dir.join(format!("Clusters_{}.csv", name)),
            scatter: dir.join(format!("Scatter_{}.csv", name)),
            embedding: dir.join(format!("Embedding_{}.csv", name)),
        }
    }
}

pub(crate) fn create(path: &Path) -> Result<std::fs::File> {
    std::fs::File::create(path).with_context(|| format!("cannot create {}", path.display()))
}

/// Delete `path` if it exists
pub(crate) fn remove_stale(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            log::debug!("removed stale {}", path.display());
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("cannot remove {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(7, 30, 0)
            .unwrap()
    }

    #[test]
    fn labels_one_per_line_noise_as_minus_one() {
        let mut buf = Vec::new();
        write_labels(&mut buf, &[Some(1), None, Some(0)]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "1\n-1\n0\n");
    }

    #[test]
    fn scatter_has_header_and_formatted_timestamps() {
        let mut buf = Vec::new();
        let points = vec![ScatterPoint {
            timestamp: t0(),
            value: 2.5,
            label: Some(3),
        }];
        write_scatter(&mut buf, &points).unwrap();

        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "timestamp,value,cluster\n2025-01-01 07:30:00,2.5,3\n"
        );
    }

    #[test]
    fn embedding_rows_follow_the_points() {
        let mut buf = Vec::new();
        let points = vec![EmbeddingPoint {
            x: 1.0,
            y: -0.5,
            label: None,
            timestamp: t0(),
        }];
        write_embedding(&mut buf, &points).unwrap();

        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "x,y,cluster,timestamp\n1.0,-0.5,-1,2025-01-01 07:30:00\n"
        );
    }

    #[test]
    fn stale_files_are_removed_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Embedding_HDBSCAN_AverageValues.csv");
        std::fs::write(&path, "x,y,cluster,timestamp\n").unwrap();

        remove_stale(&path).unwrap();
        assert!(!path.exists());
        // nothing left to remove
        remove_stale(&path).unwrap();
    }

    #[test]
    fn file_names_carry_the_run_name() {
        let files = RunFiles::new(Path::new("out"), "HDBSCAN_AverageValues");
        assert_eq!(files.clusters, Path::new("out/Clusters_HDBSCAN_AverageValues.csv"));
        assert_eq!(files.scatter, Path::new("out/Scatter_HDBSCAN_AverageValues.csv"));
        assert_eq!(
            files.embedding,
            Path::new("out/Embedding_HDBSCAN_AverageValues.csv")
        );
    }
}
