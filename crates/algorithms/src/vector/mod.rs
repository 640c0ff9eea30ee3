//! Raster-to-vector conversion and polygon post-processing
//!
//! - Vectorize: contiguous mask pixels → polygons with a pixel count
//! - Simplify: Douglas-Peucker vertex reduction within a tolerance
//! - Dissolve: boolean union of a layer into one multipolygon feature

mod dissolve;
mod simplify;
mod vectorize;

pub use dissolve::dissolve;
pub use simplify::simplify_collection;
pub use vectorize::{vectorize_mask, VectorizeParams};
