//! I/O for rasters and vector layers

mod export;
mod geotiff;

pub use export::{write_geojson, write_shapefile, ExportFormat};
pub use geotiff::{read_geotiff, write_geotiff};
