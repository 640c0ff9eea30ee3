//! Imagery stages of the change pipeline
//!
//! - Median compositing of co-registered scenes and region clipping
//! - Normalized difference built-up index
//! - Index differencing and gain/loss threshold masks

mod change;
mod composite;
mod indices;

pub use change::{index_difference, threshold_masks, ChangeThresholds};
pub use composite::{clip_to_region, median_composite};
pub use indices::{ndbi, normalized_difference};
