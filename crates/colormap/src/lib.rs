//! # urbdiff Colormap
//!
//! Value-to-color mapping and raster-to-RGBA rendering for the optional
//! change visualization. The diverging blue-white-red scheme renders the
//! change raster (losses cold, gains hot); rendering is cosmetic and no
//! pipeline result depends on it.

mod render;
mod scheme;

pub use render::{auto_params, raster_to_rgba, ColormapParams};
pub use scheme::{evaluate, ColorScheme, ColorStop, Rgb};
