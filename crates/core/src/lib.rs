//! # urbdiff Core
//!
//! Core types and I/O for the urbdiff built-up change detection pipeline.
//!
//! This crate provides:
//! - `Raster<T>`: Generic georeferenced raster grid
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `CRS`: Coordinate reference system handling
//! - `Region`: The axis-aligned analysis area
//! - `Feature` / `FeatureCollection`: Vector layer model
//! - I/O for GeoTIFF rasters and GeoJSON / shapefile vector layers

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod region;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};
pub use region::Region;
pub use vector::{AttributeValue, Feature, FeatureCollection};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::region::Region;
    pub use crate::vector::{Feature, FeatureCollection};
}
