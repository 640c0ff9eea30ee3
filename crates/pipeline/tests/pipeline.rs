//! End-to-end pipeline test on a synthetic scene store
//!
//! Builds two epochs of band rasters on disk where a block of pixels
//! turns built-up between the dates, runs the full recipe and checks the
//! exported layers.

use std::path::{Path, PathBuf};

use urbdiff_catalog::{SceneEntry, SceneStore};
use urbdiff_core::io::{write_geotiff, ExportFormat};
use urbdiff_core::{GeoTransform, Raster, Region};
use urbdiff_pipeline::{ChangeConfig, ChangePipeline, EpochConfig, ExportSpec, LayerKind};

const SIZE: usize = 20;
const CELL: f64 = 0.05;

/// Band raster over lon 0..1, lat 0..1 with a uniform background and an
/// optional block of different values
fn band(background: f64, block: Option<(std::ops::Range<usize>, f64)>) -> Raster<f64> {
    let mut r = Raster::filled(SIZE, SIZE, background);
    r.set_transform(GeoTransform::new(0.0, 1.0, CELL, -CELL));
    if let Some((range, value)) = block {
        for row in range.clone() {
            for col in range.clone() {
                r.set(row, col, value).unwrap();
            }
        }
    }
    r
}

fn write_scene(
    dir: &Path,
    id: &str,
    datetime: &str,
    swir: &Raster<f64>,
    nir: &Raster<f64>,
) -> SceneEntry {
    let swir_path = PathBuf::from(format!("{}_swir.tif", id));
    let nir_path = PathBuf::from(format!("{}_nir.tif", id));
    write_geotiff(swir, dir.join(&swir_path)).unwrap();
    write_geotiff(nir, dir.join(&nir_path)).unwrap();

    SceneEntry {
        id: id.to_string(),
        datetime: datetime.to_string(),
        cloud_cover: 2.0,
        bbox: [0.0, 0.0, 1.0, 1.0],
        swir: swir_path,
        nir: nir_path,
    }
}

/// Two baseline scenes (uniform low NDBI) and two comparison scenes with
/// a built-up block appearing at rows/cols 5..13
fn synthetic_store(dir: &Path) -> SceneStore {
    // Background: swir 0.1, nir 0.3 -> NDBI -0.5
    let quiet_swir = band(0.1, None);
    let quiet_nir = band(0.3, None);
    // Built-up block: swir 0.4, nir 0.1 -> NDBI +0.6
    let built_swir = band(0.1, Some((5..13, 0.4)));
    let built_nir = band(0.3, Some((5..13, 0.1)));

    let entries = vec![
        write_scene(dir, "base_a", "2015-07-01", &quiet_swir, &quiet_nir),
        write_scene(dir, "base_b", "2015-09-10", &quiet_swir, &quiet_nir),
        write_scene(dir, "comp_a", "2024-03-15", &built_swir, &built_nir),
        write_scene(dir, "comp_b", "2024-08-20", &built_swir, &built_nir),
    ];

    SceneStore::from_entries(dir, entries)
}

fn test_config(out_dir: &Path) -> ChangeConfig {
    let export = |layer, file_name: &str, format| ExportSpec {
        layer,
        folder: out_dir.to_path_buf(),
        file_name: file_name.to_string(),
        format,
    };

    ChangeConfig {
        region: Region::new(0.0, 0.0, 1.0, 1.0).unwrap(),
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
        resample_cell_size: CELL,
        min_pixel_count: 15,
        simplify_tolerance: 0.01,
        crs_epsg: 4326,
        exports: vec![
            export(LayerKind::Gain, "expansion", ExportFormat::GeoJson),
            export(LayerKind::Loss, "reduction", ExportFormat::GeoJson),
            export(LayerKind::Gain, "expansion", ExportFormat::Shapefile),
            export(LayerKind::Loss, "reduction", ExportFormat::Shapefile),
        ],
        visualization: None,
    }
}

fn read_feature_count(path: &Path) -> usize {
    let text = std::fs::read_to_string(path).unwrap();
    match text.parse::<geojson::GeoJson>().unwrap() {
        geojson::GeoJson::FeatureCollection(fc) => fc.features.len(),
        other => panic!("Expected FeatureCollection, got {:?}", other),
    }
}

#[test]
fn full_run_detects_gain_block() {
    let scene_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();

    let store = synthetic_store(scene_dir.path());
    let pipeline = ChangePipeline::new(test_config(out_dir.path())).unwrap();
    let report = pipeline.run(&store).unwrap();

    assert_eq!(report.baseline_scenes, 2);
    assert_eq!(report.comparison_scenes, 2);

    // Change raster: +1.1 inside the block, 0 elsewhere (band rasters
    // round-trip through 32-bit GeoTIFF samples)
    assert!((report.change.get(8, 8).unwrap() - 1.1).abs() < 1e-6);
    assert!(report.change.get(0, 0).unwrap().abs() < 1e-6);

    // 8x8 block dilated by one pixel -> 10x10 on the coarse grid
    assert_eq!(report.gain_pixels, 100);
    assert_eq!(report.gain_polygons, 1);
    assert_eq!(report.loss_pixels, 0);
    assert_eq!(report.loss_polygons, 0);

    // Dissolved layers: one multipolygon feature for gain, nothing for loss
    assert_eq!(report.gain_layer.len(), 1);
    assert_eq!(report.gain_layer.features[0].pixel_count(), Some(100));
    assert!(report.loss_layer.is_empty());

    // All four exports succeed
    assert_eq!(report.exports.len(), 4);
    assert!(report.failed_exports().next().is_none());

    assert_eq!(read_feature_count(&out_dir.path().join("expansion.geojson")), 1);
    assert_eq!(read_feature_count(&out_dir.path().join("reduction.geojson")), 0);
    assert!(out_dir.path().join("expansion.shp").exists());
    assert!(out_dir.path().join("expansion.dbf").exists());
}

#[test]
fn rerun_produces_identical_geojson() {
    let scene_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();

    let store = synthetic_store(scene_dir.path());
    let pipeline = ChangePipeline::new(test_config(out_dir.path())).unwrap();

    pipeline.run(&store).unwrap();
    let first = std::fs::read(out_dir.path().join("expansion.geojson")).unwrap();

    pipeline.run(&store).unwrap();
    let second = std::fs::read(out_dir.path().join("expansion.geojson")).unwrap();

    assert_eq!(first, second);
}

#[test]
fn empty_epoch_halts_before_vectorization() {
    let scene_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();

    let store = synthetic_store(scene_dir.path());
    let mut config = test_config(out_dir.path());
    // A window with no matching scenes
    config.baseline.start_date = "1999-01-01".to_string();
    config.baseline.end_date = "1999-12-31".to_string();

    let pipeline = ChangePipeline::new(config).unwrap();
    let err = pipeline.run(&store).unwrap_err();

    let message = err.to_string();
    assert!(
        message.contains("2015") && message.contains("Empty composite"),
        "Unexpected error: {}",
        message
    );

    // Nothing was exported
    assert!(!out_dir.path().join("expansion.geojson").exists());
}

#[test]
fn export_failure_does_not_block_siblings() {
    let scene_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();

    // A regular file where one export wants a directory
    let blocked = out_dir.path().join("blocked");
    std::fs::write(&blocked, b"occupied").unwrap();

    let store = synthetic_store(scene_dir.path());
    let mut config = test_config(out_dir.path());
    config.exports[0].folder = blocked.join("sub");

    let pipeline = ChangePipeline::new(config).unwrap();
    let report = pipeline.run(&store).unwrap();

    let failed: Vec<_> = report.failed_exports().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].layer, LayerKind::Gain);

    // The sibling exports still ran
    assert!(out_dir.path().join("reduction.geojson").exists());
    assert!(out_dir.path().join("expansion.shp").exists());
}

#[test]
fn small_detections_are_filtered_out() {
    let scene_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();

    // A 1-pixel detection: dilation grows it to 3x3 = 9 pixels, still
    // below the 15-pixel minimum
    let quiet_swir = band(0.1, None);
    let quiet_nir = band(0.3, None);
    let speck_swir = band(0.1, Some((9..10, 0.4)));
    let speck_nir = band(0.3, Some((9..10, 0.1)));

    let entries = vec![
        write_scene(scene_dir.path(), "base", "2015-07-01", &quiet_swir, &quiet_nir),
        write_scene(scene_dir.path(), "comp", "2024-03-15", &speck_swir, &speck_nir),
    ];
    let store = SceneStore::from_entries(scene_dir.path(), entries);

    let pipeline = ChangePipeline::new(test_config(out_dir.path())).unwrap();
    let report = pipeline.run(&store).unwrap();

    assert_eq!(report.gain_pixels, 9);
    assert_eq!(report.gain_polygons, 0);
    assert!(report.gain_layer.is_empty());
    assert_eq!(read_feature_count(&out_dir.path().join("expansion.geojson")), 0);
}
