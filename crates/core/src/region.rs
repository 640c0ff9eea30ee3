//! Analysis region

use geo_types::{LineString, Polygon};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Axis-aligned bounding region in geographic coordinates.
///
/// The region is both the spatial filter for scene selection and the clip
/// boundary for every raster in the pipeline. It is fixed configuration,
/// never derived from data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Region {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self> {
        let region = Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        };
        region.validate()?;
        Ok(region)
    }

    /// Reject inverted or degenerate bounds
    pub fn validate(&self) -> Result<()> {
        if self.min_lon >= self.max_lon {
            return Err(Error::InvalidParameter {
                name: "region",
                value: format!("min_lon={}, max_lon={}", self.min_lon, self.max_lon),
                reason: "min_lon must be less than max_lon".to_string(),
            });
        }
        if self.min_lat >= self.max_lat {
            return Err(Error::InvalidParameter {
                name: "region",
                value: format!("min_lat={}, max_lat={}", self.min_lat, self.max_lat),
                reason: "min_lat must be less than max_lat".to_string(),
            });
        }
        Ok(())
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Check intersection with a (min_x, min_y, max_x, max_y) extent
    pub fn intersects_bounds(&self, bounds: (f64, f64, f64, f64)) -> bool {
        let (min_x, min_y, max_x, max_y) = bounds;
        self.min_lon < max_x && self.max_lon > min_x && self.min_lat < max_y && self.max_lat > min_y
    }

    /// Bounding box as `[west, south, east, north]`, the order catalog
    /// search APIs expect
    pub fn to_bbox(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }

    /// Closed rectangle polygon over the region bounds
    pub fn to_polygon(&self) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (self.min_lon, self.min_lat),
                (self.max_lon, self.min_lat),
                (self.max_lon, self.max_lat),
                (self.min_lon, self.max_lat),
                (self.min_lon, self.min_lat),
            ]),
            vec![],
        )
    }
}
