//! # urbdiff Pipeline
//!
//! The built-up change recipe as an eager, dependency-ordered sequence of
//! stages:
//!
//! 1. filter scenes per epoch and build median band composites
//! 2. compute the built-up index for each composite
//! 3. difference the indices and threshold into gain/loss masks
//! 4. smooth (focal max) and resample each mask to the coarse grid
//! 5. vectorize, simplify and dissolve each mask into one layer
//! 6. run every configured export, isolating failures per call
//!
//! The two epochs are independent until stage 3 and the exports are
//! independent of each other; stages are idempotent batch steps, safe to
//! rerun to completion.

pub mod config;

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, info_span, warn};

use urbdiff_algorithms::imagery::{
    clip_to_region, index_difference, median_composite, ndbi, threshold_masks,
};
use urbdiff_algorithms::morphology::{dilate_mask, StructuringElement};
use urbdiff_algorithms::resample::max_resample;
use urbdiff_algorithms::vector::{dissolve, simplify_collection, vectorize_mask, VectorizeParams};
use urbdiff_catalog::{CatalogError, SceneStore};
use urbdiff_core::io::{write_geojson, write_shapefile, ExportFormat};
use urbdiff_core::{FeatureCollection, Raster, CRS};

pub use config::{ChangeConfig, EpochConfig, ExportSpec, LayerKind, VisualizationConfig};

/// Errors raised while running the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] urbdiff_core::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Outcome of one export call
#[derive(Debug)]
pub struct ExportOutcome {
    pub layer: LayerKind,
    pub format: ExportFormat,
    pub path: PathBuf,
    /// None on success, the error message otherwise
    pub error: Option<String>,
}

impl ExportOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything a pipeline run produces
#[derive(Debug)]
pub struct RunReport {
    pub baseline_scenes: usize,
    pub comparison_scenes: usize,
    /// The change raster (comparison index minus baseline index)
    pub change: Raster<f64>,
    /// Set pixels in the coarse gain mask
    pub gain_pixels: usize,
    /// Set pixels in the coarse loss mask
    pub loss_pixels: usize,
    /// Polygons surviving the size filter, per layer, before dissolve
    pub gain_polygons: usize,
    pub loss_polygons: usize,
    /// Dissolved output layers
    pub gain_layer: FeatureCollection,
    pub loss_layer: FeatureCollection,
    pub exports: Vec<ExportOutcome>,
}

impl RunReport {
    pub fn failed_exports(&self) -> impl Iterator<Item = &ExportOutcome> {
        self.exports.iter().filter(|e| !e.succeeded())
    }
}

/// The change detection pipeline
pub struct ChangePipeline {
    config: ChangeConfig,
}

impl ChangePipeline {
    /// Create a pipeline from a validated configuration
    pub fn new(config: ChangeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChangeConfig {
        &self.config
    }

    /// Run the full recipe against a local scene store
    pub fn run(&self, store: &SceneStore) -> Result<RunReport> {
        let config = &self.config;

        // Per-epoch composites and indices; the epochs have no data
        // dependency on each other until the difference step
        let (baseline_index, baseline_scenes) = self.epoch_index(store, &config.baseline)?;
        let (comparison_index, comparison_scenes) = self.epoch_index(store, &config.comparison)?;

        let change = {
            let _span = info_span!("change_detection").entered();
            index_difference(&baseline_index, &comparison_index)?
        };

        let (gain_mask, loss_mask) = threshold_masks(&change, config.thresholds())?;

        let (gain_layer, gain_pixels, gain_polygons) =
            self.mask_to_layer(gain_mask, LayerKind::Gain)?;
        let (loss_layer, loss_pixels, loss_polygons) =
            self.mask_to_layer(loss_mask, LayerKind::Loss)?;

        let exports = self.run_exports(&gain_layer, &loss_layer);

        Ok(RunReport {
            baseline_scenes,
            comparison_scenes,
            change,
            gain_pixels,
            loss_pixels,
            gain_polygons,
            loss_polygons,
            gain_layer,
            loss_layer,
            exports,
        })
    }

    /// Stages 1-2 for one epoch: scene filter, band composites, clip,
    /// index. Returns the index raster and the number of scenes used.
    fn epoch_index(
        &self,
        store: &SceneStore,
        epoch: &EpochConfig,
    ) -> Result<(Raster<f64>, usize)> {
        let _span = info_span!("composite", epoch = %epoch.label).entered();
        let config = &self.config;

        let range = epoch.date_range()?;
        let scenes = store.filter(&config.region, &range, config.max_cloud_cover);
        info!(
            epoch = %epoch.label,
            scenes = scenes.len(),
            "selected scenes for composite"
        );

        if scenes.is_empty() {
            return Err(urbdiff_core::Error::EmptyComposite {
                label: epoch.label.clone(),
            }
            .into());
        }

        let mut swir_stack = Vec::with_capacity(scenes.len());
        let mut nir_stack = Vec::with_capacity(scenes.len());
        for scene in &scenes {
            let (swir, nir) = store.load_bands(scene)?;
            swir_stack.push(swir);
            nir_stack.push(nir);
        }

        let swir = clip_to_region(
            &median_composite(&swir_stack, &epoch.label)?,
            &config.region,
        )?;
        let nir = clip_to_region(&median_composite(&nir_stack, &epoch.label)?, &config.region)?;

        let mut index = ndbi(&swir, &nir)?;
        index.set_crs(Some(CRS::from_epsg(config.crs_epsg)));

        Ok((index, scenes.len()))
    }

    /// Stages 4-5 for one mask: smooth, resample, vectorize, simplify,
    /// dissolve
    fn mask_to_layer(
        &self,
        mask: Raster<f64>,
        kind: LayerKind,
    ) -> Result<(FeatureCollection, usize, usize)> {
        let _span = info_span!("vectorize", layer = kind.label()).entered();
        let config = &self.config;

        let smoothed = if config.smoothing_radius > 0 {
            dilate_mask(&mask, &StructuringElement::Square(config.smoothing_radius))?
        } else {
            mask
        };
        let coarse = max_resample(&smoothed, config.resample_cell_size)?;
        let coarse_pixels = coarse.valid_count();

        let polygons = vectorize_mask(
            &coarse,
            &VectorizeParams {
                min_pixel_count: config.min_pixel_count,
            },
        )?;
        let polygon_count = polygons.len();
        info!(
            layer = kind.label(),
            pixels = coarse_pixels,
            polygons = polygon_count,
            "vectorized mask"
        );

        let simplified = simplify_collection(&polygons, config.simplify_tolerance);
        let layer = dissolve(&simplified)?;

        Ok((layer, coarse_pixels, polygon_count))
    }

    /// Stage 6: run every configured export; a failure is recorded and
    /// never aborts the remaining calls
    fn run_exports(
        &self,
        gain_layer: &FeatureCollection,
        loss_layer: &FeatureCollection,
    ) -> Vec<ExportOutcome> {
        self.config
            .exports
            .iter()
            .map(|spec| {
                let layer = match spec.layer {
                    LayerKind::Gain => gain_layer,
                    LayerKind::Loss => loss_layer,
                };
                let path = spec.path();

                let result = std::fs::create_dir_all(&spec.folder)
                    .map_err(urbdiff_core::Error::from)
                    .and_then(|_| match spec.format {
                        ExportFormat::GeoJson => write_geojson(layer, &path),
                        ExportFormat::Shapefile => write_shapefile(layer, &path),
                    });

                let error = match result {
                    Ok(()) => {
                        info!(path = %path.display(), "export written");
                        None
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "export failed");
                        Some(e.to_string())
                    }
                };

                ExportOutcome {
                    layer: spec.layer,
                    format: spec.format,
                    path,
                    error,
                }
            })
            .collect()
    }
}
