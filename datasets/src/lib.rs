//! `trafficseg-datasets` reads traffic count documents and generates synthetic ones.
//!
//! ## Input format
//!
//! The decoder accepts a single JSON document of the form
//!
//! ```json
//! {
//!   "data": [
//!     {
//!       "starttime": "2025-01-01 00:00:00",
//!       "endtime": "2025-01-01 00:30:00",
//!       "values": [
//!         { "timestamp": "2025-01-01 00:00:00", "vehicles": [[3, 0], [1, 2]] }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! `endtime` is optional. `vehicles` is either a flat list or a matrix of counts, a matrix is
//! flattened row by row. Unknown fields are rejected, and so are negative counts, empty count
//! lists and samples whose width differs from the first sample of the document.
//!
//! ```
//! let dataset = trafficseg_datasets::from_str(
//!     r#"{"data": [{"starttime": "2025-01-01 00:00:00",
//!                   "values": [{"timestamp": "2025-01-01 00:00:20", "vehicles": [[1, 2], [0, 4]]}]}]}"#,
//! )
//! .unwrap();
//!
//! assert_eq!(dataset.nintervals(), 1);
//! assert_eq!(dataset.width(), Some(4));
//! ```
//!
//! ## Synthetic data
//!
//! The [`generate`] module produces random blobs and random multi-lane traffic for tests and
//! benchmarks.

mod error;
pub mod generate;
mod json;

pub use error::{DatasetError, Result};
pub use json::{from_path, from_reader, from_str, TrafficDataset};
