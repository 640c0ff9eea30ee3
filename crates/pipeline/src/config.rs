//! Pipeline configuration
//!
//! Every constant of the analysis lives here rather than inline in the
//! stages: region bounds, epoch date ranges, the cloud ceiling, change
//! thresholds, smoothing and resampling parameters, vectorization limits
//! and the export plan. Defaults reproduce the reference Barbados
//! 2015→2024 analysis.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use urbdiff_algorithms::imagery::ChangeThresholds;
use urbdiff_catalog::DateRange;
use urbdiff_core::io::ExportFormat;
use urbdiff_core::{Error, Region, Result};

/// Which change layer an export refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// Built-up gain (urban expansion)
    Gain,
    /// Built-up loss (urban reduction)
    Loss,
}

impl LayerKind {
    pub fn label(&self) -> &'static str {
        match self {
            LayerKind::Gain => "gain",
            LayerKind::Loss => "loss",
        }
    }
}

/// One analysis date: a collection queried over a date range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochConfig {
    /// Label used in diagnostics and composite errors, e.g. `"2015"`
    pub label: String,
    /// Archive collection identifier, e.g. `"sentinel-2-l2a"`
    pub collection: String,
    /// Acquisition window start, `YYYY-MM-DD`
    pub start_date: String,
    /// Acquisition window end, `YYYY-MM-DD`
    pub end_date: String,
}

impl EpochConfig {
    pub fn date_range(&self) -> Result<DateRange> {
        DateRange::parse(&self.start_date, &self.end_date).map_err(|e| Error::InvalidParameter {
            name: "epoch",
            value: format!("{}..{}", self.start_date, self.end_date),
            reason: e.to_string(),
        })
    }
}

/// One export call: a layer serialized to a destination in a format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSpec {
    pub layer: LayerKind,
    /// Destination directory
    pub folder: PathBuf,
    /// Base file name without extension
    pub file_name: String,
    pub format: ExportFormat,
}

impl ExportSpec {
    /// Full output path including the format extension
    pub fn path(&self) -> PathBuf {
        self.folder
            .join(format!("{}.{}", self.file_name, self.format.extension()))
    }
}

/// Optional change-raster visualization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationConfig {
    /// PNG destination for the rendered change raster
    pub change_png: PathBuf,
    /// Display range minimum (values clamp)
    pub display_min: f64,
    /// Display range maximum
    pub display_max: f64,
    /// Styling hint for the gain layer
    pub gain_color: String,
    /// Styling hint for the loss layer
    pub loss_color: String,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            change_png: PathBuf::from("exports/ndbi_change.png"),
            display_min: -0.5,
            display_max: 0.5,
            gain_color: "red".to_string(),
            loss_color: "blue".to_string(),
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeConfig {
    /// Analysis region (spatial filter and clip boundary)
    pub region: Region,

    /// Earlier analysis date
    pub baseline: EpochConfig,
    /// Later analysis date
    pub comparison: EpochConfig,

    /// Scenes at or above this cloud percentage are excluded
    pub max_cloud_cover: f64,

    /// Change classification threshold for gain (strictly above)
    pub gain_threshold: f64,
    /// Change classification threshold for loss (strictly below)
    pub loss_threshold: f64,

    /// Radius of the local-maximum smoothing filter, in pixels
    pub smoothing_radius: usize,
    /// Cell size of the coarse mask grid, in map units
    pub resample_cell_size: f64,

    /// Minimum pixels per polygon (inclusive)
    pub min_pixel_count: usize,
    /// Douglas-Peucker tolerance, in map units
    pub simplify_tolerance: f64,

    /// EPSG code of the working CRS
    pub crs_epsg: u32,

    /// Export plan; entries fail independently
    pub exports: Vec<ExportSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visualization: Option<VisualizationConfig>,
}

impl Default for ChangeConfig {
    fn default() -> Self {
        // 50 m expressed in degrees at the equator
        let fifty_meters_deg = 50.0 / 111_320.0;

        let export = |layer, file_name: &str, format| ExportSpec {
            layer,
            folder: PathBuf::from("exports"),
            file_name: file_name.to_string(),
            format,
        };

        Self {
            region: Region {
                min_lon: -59.9,
                min_lat: 13.0,
                max_lon: -59.4,
                max_lat: 13.5,
            },
            baseline: EpochConfig {
                label: "2015".to_string(),
                collection: "sentinel-2-l1c".to_string(),
                start_date: "2015-06-01".to_string(),
                end_date: "2015-12-31".to_string(),
            },
            comparison: EpochConfig {
                label: "2024".to_string(),
                collection: "sentinel-2-l2a".to_string(),
                start_date: "2024-01-01".to_string(),
                end_date: "2024-12-31".to_string(),
            },
            max_cloud_cover: 5.0,
            gain_threshold: 0.2,
            loss_threshold: -0.2,
            smoothing_radius: 1,
            resample_cell_size: fifty_meters_deg,
            min_pixel_count: 15,
            simplify_tolerance: fifty_meters_deg,
            crs_epsg: 4326,
            exports: vec![
                export(
                    LayerKind::Gain,
                    "urban_expansion_2015_2024",
                    ExportFormat::Shapefile,
                ),
                export(
                    LayerKind::Loss,
                    "urban_reduction_2015_2024",
                    ExportFormat::Shapefile,
                ),
                export(
                    LayerKind::Gain,
                    "urban_expansion_2015_2024",
                    ExportFormat::GeoJson,
                ),
                export(
                    LayerKind::Loss,
                    "urban_reduction_2015_2024",
                    ExportFormat::GeoJson,
                ),
            ],
            visualization: Some(VisualizationConfig::default()),
        }
    }
}

impl ChangeConfig {
    /// Load a configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self =
            serde_json::from_str(&text).map_err(|e| Error::Other(format!("config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn thresholds(&self) -> ChangeThresholds {
        ChangeThresholds {
            gain: self.gain_threshold,
            loss: self.loss_threshold,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.region.validate()?;
        self.thresholds().validate()?;
        self.baseline.date_range()?;
        self.comparison.date_range()?;

        if self.max_cloud_cover <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "max_cloud_cover",
                value: self.max_cloud_cover.to_string(),
                reason: "ceiling must be positive".to_string(),
            });
        }
        if self.min_pixel_count == 0 {
            return Err(Error::InvalidParameter {
                name: "min_pixel_count",
                value: "0".to_string(),
                reason: "minimum polygon size must be at least 1 pixel".to_string(),
            });
        }
        if self.resample_cell_size <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "resample_cell_size",
                value: self.resample_cell_size.to_string(),
                reason: "cell size must be positive".to_string(),
            });
        }
        if self.simplify_tolerance < 0.0 {
            return Err(Error::InvalidParameter {
                name: "simplify_tolerance",
                value: self.simplify_tolerance.to_string(),
                reason: "tolerance must not be negative".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ChangeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.exports.len(), 4);
    }

    #[test]
    fn test_export_paths() {
        let config = ChangeConfig::default();
        let paths: Vec<String> = config
            .exports
            .iter()
            .map(|e| e.path().display().to_string())
            .collect();

        assert!(paths.contains(&"exports/urban_expansion_2015_2024.shp".to_string()));
        assert!(paths.contains(&"exports/urban_expansion_2015_2024.geojson".to_string()));
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = ChangeConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let back: ChangeConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(back.region, config.region);
        assert_eq!(back.gain_threshold, config.gain_threshold);
        assert_eq!(back.exports.len(), config.exports.len());
    }

    #[test]
    fn test_overlapping_thresholds_rejected() {
        let config = ChangeConfig {
            gain_threshold: -0.3,
            loss_threshold: 0.3,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_dates_rejected() {
        let mut config = ChangeConfig::default();
        config.baseline.start_date = "2015-13-40".to_string();
        assert!(config.validate().is_err());
    }
}
