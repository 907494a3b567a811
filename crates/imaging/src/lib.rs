//! # Imaging
//!
//! Turns an assembled frame into displayable pixels.
//!
//! - `RangeEstimator`: fixed or per-frame auto scaling bounds
//! - `pixel_coordinate`: word index to `(row, column)`, segment interleaving included
//! - `render_frame`: pure sample -> colormap -> RGB transform
//! - `Renderer`: frame numbering and corrupt-frame streak logging

mod colormap;
mod coords;
mod error;
mod range;
mod render;

pub use colormap::{Colormap, COLORMAP_LEN};
pub use coords::pixel_coordinate;
pub use error::CorruptSample;
pub use range::{RangeEstimator, DEFAULT_RANGE_MAX, DEFAULT_RANGE_MIN};
pub use render::{normalize, render_frame, Renderer};
