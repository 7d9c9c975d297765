use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::NaiveDateTime;
use ndarray::Array1;
use serde::Deserialize;
use trafficseg::{IntervalRecord, Sample};

use crate::error::{DatasetError, Result};

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDocument {
    data: Vec<RawInterval>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawInterval {
    starttime: String,
    #[serde(default)]
    endtime: Option<String>,
    values: Vec<RawValue>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawValue {
    timestamp: String,
    vehicles: Vehicles,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Vehicles {
    Flat(Vec<f64>),
    Matrix(Vec<Vec<f64>>),
}

impl Vehicles {
    fn into_flat(self) -> Vec<f64> {
        match self {
            Vehicles::Flat(counts) => counts,
            Vehicles::Matrix(rows) => rows.into_iter().flatten().collect(),
        }
    }
}

fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| DatasetError::Timestamp(value.to_string()))
}

impl RawDocument {
    fn validate(self) -> Result<TrafficDataset> {
        let mut width = None;
        let intervals = self
            .data
            .into_iter()
            .map(|interval| interval.validate(&mut width))
            .collect::<Result<Vec<_>>>()?;

        Ok(TrafficDataset { intervals })
    }
}

impl RawInterval {
    fn validate(self, width: &mut Option<usize>) -> Result<IntervalRecord<f64>> {
        let start = parse_timestamp(&self.starttime)?;
        if let Some(end) = self.endtime.as_deref().map(parse_timestamp).transpose()? {
            if end < start {
                return Err(DatasetError::EndBeforeStart { start, end });
            }
        }

        let samples = self
            .values
            .into_iter()
            .map(|value| value.validate(width))
            .collect::<Result<Vec<_>>>()?;

        Ok(IntervalRecord::new(start, samples))
    }
}

impl RawValue {
    fn validate(self, width: &mut Option<usize>) -> Result<Sample<f64>> {
        let timestamp = parse_timestamp(&self.timestamp)?;
        let counts = self.vehicles.into_flat();

        if counts.is_empty() {
            return Err(DatasetError::EmptyCounts { timestamp });
        }
        if let Some(&value) = counts.iter().find(|x| !x.is_finite() || **x < 0.0) {
            return Err(DatasetError::InvalidCount { timestamp, value });
        }

        let expected = *width.get_or_insert(counts.len());
        if expected != counts.len() {
            return Err(DatasetError::Shape {
                timestamp,
                expected,
                found: counts.len(),
            });
        }

        Ok(Sample::new(timestamp, Array1::from(counts)))
    }
}

/// A decoded and validated traffic document
///
/// Intervals and their samples keep the order of the document. Samples may be repeated across
/// overlapping intervals, deduplication is left to the
/// [`SampleStore`](trafficseg::SampleStore).
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficDataset {
    intervals: Vec<IntervalRecord<f64>>,
}

impl TrafficDataset {
    pub fn intervals(&self) -> &[IntervalRecord<f64>] {
        &self.intervals
    }

    pub fn into_intervals(self) -> Vec<IntervalRecord<f64>> {
        self.intervals
    }

    pub fn nintervals(&self) -> usize {
        self.intervals.len()
    }

    /// Number of samples over all intervals, repeated timestamps included
    pub fn nsamples(&self) -> usize {
        self.intervals.iter().map(|x| x.samples.len()).sum()
    }

    /// Number of counts per sample, `None` for a document without samples
    pub fn width(&self) -> Option<usize> {
        self.intervals
            .iter()
            .flat_map(|x| x.samples.first())
            .map(|sample| sample.vector.len())
            .next()
    }
}

/// Decode a document from any reader
pub fn from_reader<R: Read>(reader: R) -> Result<TrafficDataset> {
    let document: RawDocument = serde_json::from_reader(reader)?;
    let dataset = document.validate()?;

    log::debug!(
        "decoded {} intervals with {} samples",
        dataset.nintervals(),
        dataset.nsamples()
    );

    Ok(dataset)
}

/// Decode a document held in memory
pub fn from_str(input: &str) -> Result<TrafficDataset> {
    from_reader(input.as_bytes())
}

/// Open and decode the document at `path`
pub fn from_path<P: AsRef<Path>>(path: P) -> Result<TrafficDataset> {
    let file = File::open(path)?;
    from_reader(BufReader::new(file))
}
