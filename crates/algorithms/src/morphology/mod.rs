//! Mathematical morphology on masks
//!
//! Only dilation (local maximum) is needed by the pipeline: one pass with
//! a radius-1 element fills single-pixel gaps and thickens isolated
//! detections before resampling.

mod dilate;
mod element;

pub use dilate::dilate_mask;
pub use element::StructuringElement;
