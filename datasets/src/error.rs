use chrono::NaiveDateTime;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DatasetError>;

/// Reasons for rejecting an input document
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("could not read input: {0}")]
    Io(#[from] std::io::Error),
    /// The document is not valid JSON or does not have the expected shape
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid timestamp {0:?}, expected YYYY-MM-DD HH:MM:SS")]
    Timestamp(String),
    #[error("sample at {timestamp} has no vehicle counts")]
    EmptyCounts { timestamp: NaiveDateTime },
    /// A count is negative or not finite
    #[error("sample at {timestamp} has invalid vehicle count {value}")]
    InvalidCount {
        timestamp: NaiveDateTime,
        value: f64,
    },
    #[error("interval starting at {start} ends before it starts, at {end}")]
    EndBeforeStart {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    #[error("sample at {timestamp} has {found} vehicle counts, expected {expected}")]
    Shape {
        timestamp: NaiveDateTime,
        expected: usize,
        found: usize,
    },
}
