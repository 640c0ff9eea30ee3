//! # urbdiff Algorithms
//!
//! The raster and vector analysis stages of the built-up change pipeline:
//!
//! - **imagery**: median compositing, normalized difference index, change
//!   detection with gain/loss thresholds
//! - **morphology**: dilation (local maximum filter) for mask smoothing
//! - **resample**: coarsening a mask to a target cell size
//! - **vector**: raster-to-polygon conversion, simplification, dissolve

pub mod imagery;
pub mod morphology;
pub mod resample;
pub mod vector;

mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::imagery::{
        clip_to_region, index_difference, median_composite, ndbi, normalized_difference,
        threshold_masks, ChangeThresholds,
    };
    pub use crate::morphology::{dilate_mask, StructuringElement};
    pub use crate::resample::max_resample;
    pub use crate::vector::{dissolve, simplify_collection, vectorize_mask, VectorizeParams};
    pub use urbdiff_core::prelude::*;
}
