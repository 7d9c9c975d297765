//! `trafficseg-umap` projects traffic segments into the plane for visual inspection.
//!
//! The projection keeps points which are close in the original space close in the plane, so
//! segments of the same traffic regime show up as a group. See [`Umap`] for the algorithm and
//! [`UmapParams`] for the available settings.
mod algorithm;
mod error;
mod graph;
mod hyperparams;
mod layout;

pub use algorithm::Umap;
pub use error::{Result, UmapError};
pub use hyperparams::{UmapParams, UmapValidParams};
